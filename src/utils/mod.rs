//! 工具函数模块
//!
//! 提供各类通用工具函数，包括：
//! - 输入验证（服务地址、建议的文件扩展名）
//! - 文件系统操作（读取图片、日志与配置目录）

pub mod file_system;
pub mod validation;

// 重新导出常用函数
pub use file_system::*;
pub use validation::*;
