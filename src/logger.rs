// 日志系统 - 同时输出到控制台和按天轮转的日志文件

use anyhow::{Context, Result};
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// 解析日志级别，无法识别时返回 None
pub fn parse_level(level: &str) -> Option<Level> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// 初始化日志系统
///
/// 返回的 guard 需要保持到程序结束，否则文件中的日志可能丢失
pub fn init(log_dir: &Path, level: &str) -> Result<WorkerGuard> {
    // 创建日志目录
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("创建日志目录失败: {:?}", log_dir))?;

    // 配置日志输出到文件（每天轮转）
    let file_appender = tracing_appender::rolling::daily(log_dir, "medscan.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // 同时输出到控制台和文件
    let writer = std::io::stdout.and(non_blocking);

    // 使用本地时区
    let timer = LocalTime::new(
        time::format_description::parse(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]",
        )
        .context("日志时间格式无效")?,
    );

    let max_level = parse_level(level).unwrap_or_else(|| {
        eprintln!("未知的日志级别 {:?}，使用 info", level);
        Level::INFO
    });

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(writer)
        .with_timer(timer)
        .with_ansi(cfg!(debug_assertions)) // release 版本不使用颜色代码
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("设置全局日志订阅者失败")?;

    eprintln!("日志文件位置: {:?}", log_dir);
    Ok(guard)
}
