// Actor模块 - 使用Actor模式管理工作流状态
//
// 用Actor模式替代Arc<Mutex<T>>，通过消息传递实现并发控制
// 定时器和网络请求的结果也以消息形式回到Actor，状态只有一个写入者

pub mod workflow;

pub use workflow::{WorkflowActor, WorkflowCommand, WorkflowHandle, WorkflowTiming};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{sanitizer_for, AnalysisClient, ReqwestTransport};
    use crate::event_bus::EventBus;
    use crate::models::SanitizerKind;
    use std::sync::Arc;

    fn new_actor() -> (WorkflowActor, WorkflowHandle) {
        let transport = Arc::new(ReqwestTransport::new(reqwest::Client::new()));
        WorkflowActor::new(
            AnalysisClient::with_default_base(transport),
            sanitizer_for(SanitizerKind::Escape),
            Arc::new(EventBus::new(16)),
            WorkflowTiming::default(),
        )
    }

    #[tokio::test]
    async fn test_workflow_health_check() {
        // 创建WorkflowActor
        let (actor, handle) = new_actor();

        // 在后台运行Actor
        tokio::spawn(async move {
            actor.run().await;
        });

        // 执行健康检查
        let is_healthy = handle.health_check().await;
        assert!(is_healthy, "WorkflowActor应该是健康的");
    }

    #[tokio::test]
    async fn test_health_check_timeout() {
        // 创建Actor但不运行，模拟Actor无响应
        let (actor, handle) = new_actor();

        // 不运行Actor，直接drop
        drop(actor);

        // 执行健康检查应该失败
        let is_healthy = handle.health_check().await;
        assert!(!is_healthy, "停止的Actor应该健康检查失败");
    }

    #[tokio::test]
    async fn test_shutdown_then_health_check() {
        let (actor, handle) = new_actor();
        let task = tokio::spawn(actor.run());

        handle.shutdown().await;
        task.await.unwrap();

        assert!(!handle.health_check().await);
        assert!(!handle.is_busy().await);
    }
}
