//! 应用程序初始化和启动
//!
//! 负责命令行程序的完整启动流程，包括：
//! - 配置加载
//! - 日志系统初始化
//! - 分析客户端和工作流 Actor 的组装
//! - 订阅事件总线并在终端渲染工作流状态

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::actors::{WorkflowActor, WorkflowTiming};
use crate::analysis::{sanitizer_for, AnalysisClient, ReqwestTransport};
use crate::event_bus::{AppEvent, EventBus};
use crate::logger;
use crate::models::{
    AnalysisMode, AnalysisReport, AppConfig, PersistedAppConfig, SanitizerKind, Screen,
};
use crate::settings::SettingsManager;
use crate::utils::{get_config_path, get_log_dir, read_image_file, validate_base_url};

#[derive(Parser, Debug)]
#[command(name = "medscan")]
#[command(about = "Medical image analysis workflow controller", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the whole workflow for one image and print the analysis
    Scan {
        /// Image to analyze
        file: PathBuf,

        /// Analysis service base URL
        #[arg(long, env = "MEDSCAN_API_URL")]
        api_url: Option<String>,

        /// Analysis endpoint to use
        #[arg(long, value_enum)]
        mode: Option<AnalysisMode>,

        /// Escape the returned HTML instead of forwarding it raw
        #[arg(long)]
        escape_markup: bool,
    },

    /// Show or change the persisted configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the current configuration
    Show,

    /// Update one or more configuration values
    Set {
        #[arg(long)]
        api_url: Option<String>,

        /// Request timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        #[arg(long, value_enum)]
        mode: Option<AnalysisMode>,

        #[arg(long, value_enum)]
        sanitizer: Option<SanitizerKind>,

        #[arg(long)]
        log_level: Option<String>,
    },
}

/// scan 命令参数
struct ScanOptions {
    file: PathBuf,
    api_url: Option<String>,
    mode: Option<AnalysisMode>,
    escape_markup: bool,
}

/// 应用程序入口点
pub async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(get_config_path);
    let settings = SettingsManager::new(config_path).await?;
    let config = settings.get().await;

    // guard 需要存活到命令结束
    let _log_guard = logger::init(&get_log_dir(), &config.log_level)?;
    info!("medscan 启动，配置文件: {:?}", settings.path());

    match cli.command {
        Commands::Scan {
            file,
            api_url,
            mode,
            escape_markup,
        } => {
            let options = ScanOptions {
                file,
                api_url,
                mode,
                escape_markup,
            };
            run_scan(&config, options).await
        }
        Commands::Config { action } => run_config(&settings, action).await,
    }
}

async fn run_config(settings: &SettingsManager, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = settings.get().await;
            println!("# {}", settings.path().display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Set {
            api_url,
            timeout_ms,
            mode,
            sanitizer,
            log_level,
        } => {
            let update = AppConfig {
                api_base_url: api_url,
                request_timeout_ms: timeout_ms,
                analysis_mode: mode,
                sanitizer,
                log_level,
                ..Default::default()
            };
            let config = settings.update(update).await?;
            info!("配置已更新");
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

async fn run_scan(config: &PersistedAppConfig, options: ScanOptions) -> Result<()> {
    let base_url = match options.api_url {
        Some(url) => validate_base_url(&url).map_err(|e| anyhow!(e))?,
        None => config.api_base_url.clone(),
    };
    let mode = options.mode.unwrap_or(config.analysis_mode);
    let sanitizer_kind = if options.escape_markup {
        SanitizerKind::Escape
    } else {
        config.sanitizer
    };

    let image = read_image_file(&options.file).await?;

    // 创建共享的HTTP客户端，超时由每个请求单独设置
    let http_client = reqwest::Client::builder()
        .build()
        .context("创建HTTP客户端失败")?;
    let transport = Arc::new(ReqwestTransport::new(http_client));
    let client = AnalysisClient::new(transport, base_url)
        .with_mode(mode)
        .with_timeout(config.request_timeout());

    let event_bus = Arc::new(EventBus::new(256));
    let mut events = event_bus.subscribe();
    let (actor, handle) = WorkflowActor::new(
        client,
        sanitizer_for(sanitizer_kind),
        event_bus,
        WorkflowTiming::from_config(config),
    );
    let actor_task = tokio::spawn(actor.run());

    handle.start().await?;

    let result: Result<AnalysisReport> = loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!("事件处理落后，跳过 {} 条", skipped);
                continue;
            }
            Err(RecvError::Closed) => break Err(anyhow!("事件总线已关闭")),
        };

        render_event(&event);

        match event {
            AppEvent::ScreenChanged {
                to: Screen::Workspace,
                ..
            } => {
                handle.select_file(image.clone()).await?;
                handle.analyze().await?;
            }
            AppEvent::AnalysisCompleted { report } => break Ok(report),
            AppEvent::AnalysisFailed { error } => break Err(anyhow!("分析失败: {}", error)),
            AppEvent::WorkflowStopped => break Err(anyhow!("工作流意外停止")),
            _ => {}
        }
    };

    handle.shutdown().await;
    if let Err(e) = actor_task.await {
        warn!("Workflow Actor 任务异常结束: {}", e);
    }

    let report = result?;
    println!();
    println!("{}", report.markup);
    if let Some(details) = &report.details {
        println!();
        println!("{}", serde_json::to_string_pretty(details)?);
    }
    Ok(())
}

/// 终端渲染
fn render_event(event: &AppEvent) {
    match event {
        AppEvent::ScreenChanged { to, .. } => println!("== {} ==", to.display_name()),
        AppEvent::ProgressUpdated { value } => println!("  loading... {:>5.1}%", value),
        AppEvent::ImageSelected {
            file_name, size, ..
        } => println!("selected {} ({} bytes)", file_name, size),
        AppEvent::AnalysisStarted { file_name } => println!("analyzing {}...", file_name),
        AppEvent::AnalysisFailed { error } => eprintln!("{}", error),
        AppEvent::AnalysisCompleted { .. }
        | AppEvent::PreviewReady { .. }
        | AppEvent::WorkflowReset
        | AppEvent::WorkflowStopped => {}
    }
}
