// 数据模型模块 - 定义工作流中的所有数据结构

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::utils::guess_content_type;

/// 默认分析服务地址
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

// 面向用户的错误提示（与分析服务前端保持一致）
pub const MSG_NO_FILE_SELECTED: &str = "Please select an image first";
pub const MSG_TIMEOUT: &str = "Request timeout - server took too long to respond";
pub const MSG_ENDPOINT_NOT_FOUND: &str = "API endpoint not found - backend may not be running";
pub const MSG_SERVER_ERROR_FALLBACK: &str = "Internal server error";
pub const MSG_NETWORK_UNREACHABLE: &str = "Cannot connect to backend - check if server is running";
pub const MSG_UNKNOWN_FALLBACK: &str = "An error occurred during analysis";
pub const MSG_EMPTY_RESULT: &str = "No analysis result received from server";

/// 页面枚举，同一时刻只有一个处于激活状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// 首页（初始页面）
    #[default]
    Intake,
    /// 模拟初始化过渡页
    Initializing,
    /// 扫描工作区
    Workspace,
}

impl Screen {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Intake => "首页",
            Self::Initializing => "初始化",
            Self::Workspace => "工作区",
        }
    }
}

/// 用户选择的图片文件
///
/// 原始字节通过 `Arc` 共享，预览编码和上传都不会复制整份数据
#[derive(Clone)]
pub struct ImageFile {
    /// 文件名
    pub file_name: String,
    /// MIME 类型（根据扩展名推断）
    pub content_type: String,
    data: Arc<[u8]>,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name).to_string();
        Self {
            file_name,
            content_type,
            data: data.into(),
        }
    }

    /// 原始字节
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// 当前选中的图片
#[derive(Debug, Clone)]
pub struct SelectedImage {
    /// 选择序号，每次选择递增，用于丢弃过期的预览
    pub id: u64,
    /// 原始文件
    pub raw: ImageFile,
    /// 预览（data URI），异步编码完成前为 None
    pub preview: Option<String>,
}

impl SelectedImage {
    pub fn is_preview_ready(&self) -> bool {
        self.preview.is_some()
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoFileSelected,
    Timeout,
    EndpointNotFound,
    ServerError,
    NetworkUnreachable,
    Unknown,
}

/// 错误信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn no_file_selected() -> Self {
        Self::new(ErrorKind::NoFileSelected, MSG_NO_FILE_SELECTED)
    }

    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout, MSG_TIMEOUT)
    }

    pub fn endpoint_not_found() -> Self {
        Self::new(ErrorKind::EndpointNotFound, MSG_ENDPOINT_NOT_FOUND)
    }

    /// 服务端错误，优先使用服务端返回的消息
    pub fn server_error(server_message: Option<String>) -> Self {
        Self::new(
            ErrorKind::ServerError,
            server_message.unwrap_or_else(|| MSG_SERVER_ERROR_FALLBACK.to_string()),
        )
    }

    pub fn network_unreachable() -> Self {
        Self::new(ErrorKind::NetworkUnreachable, MSG_NETWORK_UNREACHABLE)
    }

    pub fn unknown(server_message: Option<String>) -> Self {
        Self::new(
            ErrorKind::Unknown,
            server_message.unwrap_or_else(|| MSG_UNKNOWN_FALLBACK.to_string()),
        )
    }

    /// 传输成功但响应中没有分析结果
    pub fn empty_result() -> Self {
        Self::new(ErrorKind::Unknown, MSG_EMPTY_RESULT)
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::ServerError => write!(f, "Server error: {}", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// 分析报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// 服务端返回的 HTML 片段（不可信内容，经过结果片段处理器后才交给展示层）
    pub markup: String,
    /// ML 接口附带的结构化结果
    pub details: Option<serde_json::Value>,
    /// 实际请求的接口地址
    pub endpoint: String,
    /// 完成时间
    pub completed_at: DateTime<Utc>,
}

/// 分析状态
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AnalysisOutcome {
    #[default]
    Idle,
    Pending,
    Success(AnalysisReport),
    Failure(ErrorInfo),
}

impl AnalysisOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            Self::Failure(error) => Some(error),
            _ => None,
        }
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            Self::Success(report) => Some(report),
            _ => None,
        }
    }
}

/// 分析模式（对应服务端的两个分析接口）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// 大模型分析
    #[default]
    Llm,
    /// 深度学习模型集成分析
    Ml,
}

impl AnalysisMode {
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            Self::Llm => "/api/analyze",
            Self::Ml => "/api/ml-analyze",
        }
    }
}

/// 结果片段处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SanitizerKind {
    /// 原样转发（信任分析服务）
    #[default]
    Passthrough,
    /// 转义所有 HTML
    Escape,
}

/// 应用配置（部分更新）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 分析服务地址
    pub api_base_url: Option<String>,
    /// 请求超时（毫秒）
    pub request_timeout_ms: Option<u64>,
    /// 初始化页面停留时长（毫秒）
    pub initialization_delay_ms: Option<u64>,
    /// 进度刷新间隔（毫秒）
    pub progress_tick_ms: Option<u64>,
    /// 单次进度最大增量
    pub progress_max_increment: Option<f64>,
    /// 分析模式
    pub analysis_mode: Option<AnalysisMode>,
    /// 结果片段处理方式
    pub sanitizer: Option<SanitizerKind>,
    /// 日志级别
    pub log_level: Option<String>,
}

/// 持久化的应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedAppConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub initialization_delay_ms: u64,
    pub progress_tick_ms: u64,
    pub progress_max_increment: f64,
    pub analysis_mode: AnalysisMode,
    pub sanitizer: SanitizerKind,
    pub log_level: String,
}

impl Default for PersistedAppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_ms: 30_000,
            initialization_delay_ms: 3_000,
            progress_tick_ms: 300,
            progress_max_increment: 30.0,
            analysis_mode: AnalysisMode::Llm,
            sanitizer: SanitizerKind::Passthrough,
            log_level: "info".to_string(),
        }
    }
}

impl PersistedAppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn initialization_delay(&self) -> Duration {
        Duration::from_millis(self.initialization_delay_ms)
    }

    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms)
    }
}

/// 工作流快照（供展示层读取）
#[derive(Debug, Clone)]
pub struct WorkflowSnapshot {
    pub screen: Screen,
    pub progress: f64,
    pub selected: Option<SelectedImage>,
    pub outcome: AnalysisOutcome,
    /// 是否有分析请求正在进行
    pub busy: bool,
}

/// 工作流操作错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("当前页面 {screen:?} 不支持操作 {action}")]
    InvalidTransition { screen: Screen, action: &'static str },

    #[error("该操作只能在工作区进行，当前页面: {0:?}")]
    NotInWorkspace(Screen),

    #[error("分析正在进行中")]
    AnalysisInProgress,

    #[error("文件为空: {0}")]
    EmptyFile(String),

    #[error("工作流 Actor 已停止")]
    ActorStopped,
}
