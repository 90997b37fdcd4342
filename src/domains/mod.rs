// 领域模块 - 工作流的三个核心组件
//
// 页面状态机、进度模拟器和图片选择都是纯状态对象，不持有定时器和任务
// 定时器由工作流 Actor 统一管理，组件之间通过 Actor 协作

pub mod intake;
pub mod page;
pub mod progress;

pub use intake::{encode_preview, to_data_uri, ImageIntake};
pub use page::{PageAction, PageEffect, PageStateMachine, Transition};
pub use progress::{ProgressSimulator, PROGRESS_MAX};
