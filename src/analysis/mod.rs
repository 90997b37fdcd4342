// 分析模块 - 负责与远程分析服务交互
//
// transport: 传输层接口及 reqwest 实现
// client: 请求构建、超时与错误分类
// sanitizer: 不可信结果片段的处理边界

pub mod client;
pub mod sanitizer;
pub mod transport;

pub use client::{AnalysisClient, DEFAULT_REQUEST_TIMEOUT};
pub use sanitizer::{sanitizer_for, EscapingSanitizer, MarkupSanitizer, PassthroughSanitizer};
pub use transport::{AnalysisTransport, ReqwestTransport, TransportError, TransportResponse};
