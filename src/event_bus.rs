// 事件总线 - 用于工作流与展示层解耦通信
//
// 工作流 Actor 在每次状态变化后发布事件，展示层订阅后自行渲染
// 使用 tokio::sync::broadcast 实现高效的事件分发

use tokio::sync::broadcast;

use crate::models::{AnalysisReport, ErrorInfo, Screen};

/// 工作流事件枚举 - 定义所有可能的状态变化
#[derive(Debug, Clone)]
pub enum AppEvent {
    // --- 页面事件 ---

    /// 页面切换
    ScreenChanged {
        from: Screen,
        to: Screen,
    },

    /// 进度更新
    ProgressUpdated {
        value: f64,
    },

    // --- 图片事件 ---

    /// 选择了新图片
    ImageSelected {
        selection_id: u64,
        file_name: String,
        size: usize,
    },

    /// 预览已生成
    PreviewReady {
        selection_id: u64,
    },

    // --- 分析事件 ---

    /// 分析开始
    AnalysisStarted {
        file_name: String,
    },

    /// 分析完成
    AnalysisCompleted {
        report: AnalysisReport,
    },

    /// 分析失败
    AnalysisFailed {
        error: ErrorInfo,
    },

    // --- 系统事件 ---

    /// 图片与分析结果已清空
    WorkflowReset,

    /// 工作流已停止
    WorkflowStopped,
}

/// 事件总线
///
/// 使用 broadcast channel 实现发布/订阅模式
/// 支持多个订阅者同时接收事件
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    /// 创建新的事件总线
    ///
    /// # 参数
    /// - `capacity`: 事件缓冲区大小,建议 100-1000
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 发布事件
    ///
    /// 如果没有订阅者,事件会被丢弃(这是正常的)
    pub fn publish(&self, event: AppEvent) {
        match self.sender.send(event) {
            Ok(receiver_count) => {
                tracing::trace!("事件已发布，订阅者数量: {}", receiver_count);
            }
            Err(_) => {
                tracing::trace!("事件已发布但无订阅者");
            }
        }
    }

    /// 订阅事件
    ///
    /// 返回一个接收器,可以用 `.recv().await` 接收事件
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// 获取当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_basic() {
        let bus = EventBus::new(100);

        // 订阅事件
        let mut receiver = bus.subscribe();

        // 发布事件
        bus.publish(AppEvent::ScreenChanged {
            from: Screen::Intake,
            to: Screen::Initializing,
        });

        // 接收事件
        match receiver.recv().await {
            Ok(AppEvent::ScreenChanged { from, to }) => {
                assert_eq!(from, Screen::Intake);
                assert_eq!(to, Screen::Initializing);
            }
            _ => panic!("未收到预期事件"),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(100);

        // 创建多个订阅者
        let mut receiver1 = bus.subscribe();
        let mut receiver2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(AppEvent::WorkflowReset);

        // 两个订阅者都应该收到事件
        assert!(receiver1.try_recv().is_ok());
        assert!(receiver2.try_recv().is_ok());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(10);
        bus.publish(AppEvent::WorkflowStopped);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
