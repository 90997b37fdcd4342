// 医学影像分析工作流控制器 - 主库
//
// 首页 → 初始化 → 工作区 三个页面的状态机、模拟进度、图片选择和分析服务客户端
// 所有状态由 WorkflowActor 统一持有，展示层通过事件总线订阅变化

// 声明模块
pub mod actors;
pub mod analysis;
pub mod app;
pub mod domains;
pub mod event_bus;
pub mod logger;
pub mod models;
pub mod settings;
pub mod utils;

pub use actors::{WorkflowActor, WorkflowHandle, WorkflowTiming};
pub use analysis::{AnalysisClient, AnalysisTransport, ReqwestTransport};
pub use event_bus::{AppEvent, EventBus};
pub use models::{AnalysisOutcome, ErrorInfo, ErrorKind, Screen, WorkflowError};
