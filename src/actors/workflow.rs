// Workflow Actor - 使用Actor模式管理整个工作流状态
//
// 页面、进度、选中图片和分析状态都由Actor独占，外部只能通过 WorkflowHandle 发送命令
// 定时器和网络请求在独立任务中运行，完成后以消息形式回送给Actor
// 定时器句柄与其影响的状态放在一起，切换或停止时统一取消

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::analysis::{AnalysisClient, MarkupSanitizer};
use crate::domains::{
    encode_preview, ImageIntake, PageAction, PageEffect, PageStateMachine, ProgressSimulator,
};
use crate::event_bus::{AppEvent, EventBus};
use crate::models::{
    AnalysisOutcome, ErrorInfo, ImageFile, PersistedAppConfig, Screen, WorkflowError,
    WorkflowSnapshot,
};

/// 工作流时间参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkflowTiming {
    /// 初始化页面停留时长
    pub initialization_delay: Duration,
    /// 进度刷新间隔
    pub progress_tick: Duration,
    /// 单次进度最大增量
    pub progress_max_increment: f64,
}

impl Default for WorkflowTiming {
    fn default() -> Self {
        Self {
            initialization_delay: Duration::from_millis(3_000),
            progress_tick: Duration::from_millis(300),
            progress_max_increment: 30.0,
        }
    }
}

impl WorkflowTiming {
    pub fn from_config(config: &PersistedAppConfig) -> Self {
        Self {
            initialization_delay: config.initialization_delay(),
            progress_tick: config.progress_tick(),
            progress_max_increment: config.progress_max_increment,
        }
    }
}

/// 工作流命令
pub enum WorkflowCommand {
    /// 用户点击"开始"
    Start {
        reply: oneshot::Sender<Result<Screen, WorkflowError>>,
    },

    /// 用户点击"返回"
    Back {
        reply: oneshot::Sender<Result<Screen, WorkflowError>>,
    },

    /// 选择图片
    SelectFile {
        file: ImageFile,
        reply: oneshot::Sender<Result<u64, WorkflowError>>,
    },

    /// 发起分析
    Analyze {
        reply: oneshot::Sender<Result<(), WorkflowError>>,
    },

    /// 清空图片和分析结果
    Reset {
        reply: oneshot::Sender<Result<(), WorkflowError>>,
    },

    /// 获取快照
    Snapshot {
        reply: oneshot::Sender<WorkflowSnapshot>,
    },

    /// 健康检查（Ping）
    HealthCheck { reply: oneshot::Sender<()> },

    /// 停止工作流并取消所有定时器
    Shutdown { reply: oneshot::Sender<()> },

    // --- 内部消息：定时器与后台任务回送 ---

    /// 初始化定时器到期
    InitializationElapsed { generation: u64 },

    /// 进度定时器触发
    ProgressTick { generation: u64 },

    /// 预览编码完成
    PreviewEncoded {
        selection_id: u64,
        preview: anyhow::Result<String>,
    },

    /// 分析请求结束
    AnalysisFinished { outcome: AnalysisOutcome },
}

/// 工作流Actor（无需外层Mutex）
pub struct WorkflowActor {
    receiver: mpsc::Receiver<WorkflowCommand>,
    /// 定时器和后台任务回送消息用的弱引用，不会阻止Actor在所有Handle释放后退出
    sender: mpsc::WeakSender<WorkflowCommand>,
    page: PageStateMachine,
    progress: ProgressSimulator,
    intake: ImageIntake,
    outcome: AnalysisOutcome,
    client: Arc<AnalysisClient>,
    sanitizer: Arc<dyn MarkupSanitizer>,
    event_bus: Arc<EventBus>,
    transition_timer: Option<JoinHandle<()>>,
    progress_timer: Option<JoinHandle<()>>,
    stopped: bool,
}

impl WorkflowActor {
    /// 创建新的Actor
    pub fn new(
        client: AnalysisClient,
        sanitizer: Arc<dyn MarkupSanitizer>,
        event_bus: Arc<EventBus>,
        timing: WorkflowTiming,
    ) -> (Self, WorkflowHandle) {
        let (sender, receiver) = mpsc::channel(64);
        let actor = Self {
            receiver,
            sender: sender.downgrade(),
            page: PageStateMachine::new(timing.initialization_delay),
            progress: ProgressSimulator::new(timing.progress_tick, timing.progress_max_increment),
            intake: ImageIntake::new(),
            outcome: AnalysisOutcome::Idle,
            client: Arc::new(client),
            sanitizer,
            event_bus,
            transition_timer: None,
            progress_timer: None,
            stopped: false,
        };
        let handle = WorkflowHandle { sender };
        (actor, handle)
    }

    /// 运行Actor（在单独的任务中运行）
    pub async fn run(mut self) {
        info!(
            "Workflow Actor 已启动 (接口: {}, 结果处理: {})",
            self.client.endpoint(),
            self.sanitizer.name()
        );

        while let Some(cmd) = self.receiver.recv().await {
            if !self.handle(cmd) {
                break;
            }
        }

        self.teardown();
        info!("Workflow Actor 已停止");
    }

    /// 处理一条命令，返回 false 表示停止
    fn handle(&mut self, cmd: WorkflowCommand) -> bool {
        match cmd {
            WorkflowCommand::Start { reply } => {
                let _ = reply.send(self.apply_page_action(PageAction::Start));
            }

            WorkflowCommand::Back { reply } => {
                let _ = reply.send(self.apply_page_action(PageAction::Back));
            }

            WorkflowCommand::SelectFile { file, reply } => {
                let _ = reply.send(self.select_file(file));
            }

            WorkflowCommand::Analyze { reply } => {
                let _ = reply.send(self.analyze());
            }

            WorkflowCommand::Reset { reply } => {
                let _ = reply.send(self.reset());
            }

            WorkflowCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }

            WorkflowCommand::HealthCheck { reply } => {
                // 立即响应，表明Actor正常运行
                let _ = reply.send(());
            }

            WorkflowCommand::Shutdown { reply } => {
                self.teardown();
                let _ = reply.send(());
                return false;
            }

            WorkflowCommand::InitializationElapsed { generation } => {
                self.on_initialization_elapsed(generation);
            }

            WorkflowCommand::ProgressTick { generation } => {
                self.on_progress_tick(generation);
            }

            WorkflowCommand::PreviewEncoded {
                selection_id,
                preview,
            } => {
                self.on_preview_encoded(selection_id, preview);
            }

            WorkflowCommand::AnalysisFinished { outcome } => {
                self.on_analysis_finished(outcome);
            }
        }
        true
    }

    // ==================== 页面 ====================

    fn apply_page_action(&mut self, action: PageAction) -> Result<Screen, WorkflowError> {
        let transition = self.page.apply(action).map_err(|e| {
            warn!("拒绝页面操作: {}", e);
            e
        })?;

        info!(
            "页面切换: {} -> {}",
            transition.from.display_name(),
            transition.to.display_name()
        );
        self.event_bus.publish(AppEvent::ScreenChanged {
            from: transition.from,
            to: transition.to,
        });

        for effect in transition.effects {
            self.apply_effect(effect);
        }

        Ok(transition.to)
    }

    fn apply_effect(&mut self, effect: PageEffect) {
        match effect {
            PageEffect::StartProgress => {
                self.cancel_progress_timer();
                self.progress.start();
                self.publish_progress();
                self.progress_timer = Some(spawn_progress_ticker(
                    self.sender.clone(),
                    self.page.generation(),
                    self.progress.tick_interval(),
                ));
            }

            PageEffect::StopProgress => {
                self.cancel_progress_timer();
                self.progress.stop();
                self.progress.reset();
                self.publish_progress();
            }

            PageEffect::ScheduleWorkspace { generation, delay } => {
                self.cancel_transition_timer();
                debug!("{}ms 后进入工作区", delay.as_millis());
                self.transition_timer = Some(spawn_delayed_transition(
                    self.sender.clone(),
                    generation,
                    delay,
                ));
            }
        }
    }

    fn on_initialization_elapsed(&mut self, generation: u64) {
        if generation != self.page.generation() || self.page.screen() != Screen::Initializing {
            debug!("忽略过期的初始化定时器 (generation={})", generation);
            return;
        }

        self.transition_timer = None;
        let _ = self.apply_page_action(PageAction::InitializationElapsed { generation });
    }

    fn on_progress_tick(&mut self, generation: u64) {
        if generation != self.page.generation() || self.page.screen() != Screen::Initializing {
            return;
        }

        if self.progress.tick().is_some() {
            self.publish_progress();
            if !self.progress.is_running() {
                debug!("进度已达到上限，停止刷新");
                self.cancel_progress_timer();
            }
        }
    }

    fn publish_progress(&self) {
        let value = self.progress.value();
        debug!("进度: {:.1}%", value);
        self.event_bus.publish(AppEvent::ProgressUpdated { value });
    }

    // ==================== 图片与分析 ====================

    fn require_workspace(&self) -> Result<(), WorkflowError> {
        match self.page.screen() {
            Screen::Workspace => Ok(()),
            screen => {
                warn!("当前页面 {} 不支持该操作", screen.display_name());
                Err(WorkflowError::NotInWorkspace(screen))
            }
        }
    }

    fn select_file(&mut self, file: ImageFile) -> Result<u64, WorkflowError> {
        self.require_workspace()?;
        if self.outcome.is_pending() {
            warn!("分析进行中，不能更换图片");
            return Err(WorkflowError::AnalysisInProgress);
        }

        let file_name = file.file_name.clone();
        let size = file.len();
        let selection_id = self.intake.select_file(file.clone())?;

        // 新的选择清除之前的错误
        if self.outcome.error().is_some() {
            self.outcome = AnalysisOutcome::Idle;
        }

        info!("已选择文件: {} ({} 字节)", file_name, size);
        self.event_bus.publish(AppEvent::ImageSelected {
            selection_id,
            file_name,
            size,
        });

        let sender = self.sender.clone();
        tokio::spawn(async move {
            let preview = encode_preview(file).await;
            if let Some(sender) = sender.upgrade() {
                let _ = sender
                    .send(WorkflowCommand::PreviewEncoded {
                        selection_id,
                        preview,
                    })
                    .await;
            }
        });

        Ok(selection_id)
    }

    fn on_preview_encoded(&mut self, selection_id: u64, preview: anyhow::Result<String>) {
        match preview {
            Ok(preview) => {
                if self.intake.attach_preview(selection_id, preview) {
                    debug!("预览已生成 (selection={})", selection_id);
                    self.event_bus
                        .publish(AppEvent::PreviewReady { selection_id });
                } else {
                    debug!("丢弃过期的预览 (selection={})", selection_id);
                }
            }
            Err(e) => warn!("预览生成失败 (selection={}): {}", selection_id, e),
        }
    }

    fn analyze(&mut self) -> Result<(), WorkflowError> {
        self.require_workspace()?;
        if self.outcome.is_pending() {
            warn!("分析正在进行中，忽略重复提交");
            return Err(WorkflowError::AnalysisInProgress);
        }

        let Some(image) = self.intake.selected().map(|selected| selected.raw.clone()) else {
            let error = ErrorInfo::no_file_selected();
            warn!("未选择图片，无法分析");
            self.outcome = AnalysisOutcome::Failure(error.clone());
            self.event_bus.publish(AppEvent::AnalysisFailed { error });
            return Ok(());
        };

        self.outcome = AnalysisOutcome::Pending;
        self.event_bus.publish(AppEvent::AnalysisStarted {
            file_name: image.file_name.clone(),
        });

        // 请求一旦发出就运行到完成、超时或出错，不支持中途取消
        let client = self.client.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let outcome = client.analyze(Some(&image)).await;
            match sender.upgrade() {
                Some(sender) => {
                    let _ = sender
                        .send(WorkflowCommand::AnalysisFinished { outcome })
                        .await;
                }
                None => debug!("工作流已停止，丢弃分析结果"),
            }
        });

        Ok(())
    }

    fn on_analysis_finished(&mut self, outcome: AnalysisOutcome) {
        if !self.outcome.is_pending() {
            debug!("没有进行中的分析，丢弃结果");
            return;
        }

        match outcome {
            AnalysisOutcome::Success(mut report) => {
                report.markup = self.sanitizer.sanitize(&report.markup);
                self.outcome = AnalysisOutcome::Success(report.clone());
                self.event_bus
                    .publish(AppEvent::AnalysisCompleted { report });
            }
            AnalysisOutcome::Failure(error) => {
                self.outcome = AnalysisOutcome::Failure(error.clone());
                self.event_bus.publish(AppEvent::AnalysisFailed { error });
            }
            AnalysisOutcome::Idle | AnalysisOutcome::Pending => {
                warn!("收到无效的分析结果，恢复为空闲状态");
                self.outcome = AnalysisOutcome::Idle;
            }
        }
    }

    /// 同时清空图片、分析结果和错误
    fn reset(&mut self) -> Result<(), WorkflowError> {
        if self.outcome.is_pending() {
            warn!("分析进行中，不能重置");
            return Err(WorkflowError::AnalysisInProgress);
        }

        self.intake.clear();
        self.outcome = AnalysisOutcome::Idle;
        info!("已清空图片和分析结果");
        self.event_bus.publish(AppEvent::WorkflowReset);
        Ok(())
    }

    fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            screen: self.page.screen(),
            progress: self.progress.value(),
            selected: self.intake.selected().cloned(),
            outcome: self.outcome.clone(),
            busy: self.outcome.is_pending(),
        }
    }

    // ==================== 定时器 ====================

    fn cancel_transition_timer(&mut self) {
        if let Some(timer) = self.transition_timer.take() {
            timer.abort();
        }
    }

    fn cancel_progress_timer(&mut self) {
        if let Some(timer) = self.progress_timer.take() {
            timer.abort();
        }
    }

    fn teardown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        self.cancel_transition_timer();
        self.cancel_progress_timer();
        self.progress.stop();
        self.event_bus.publish(AppEvent::WorkflowStopped);
    }
}

/// 延迟切换定时器
fn spawn_delayed_transition(
    sender: mpsc::WeakSender<WorkflowCommand>,
    generation: u64,
    delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Some(sender) = sender.upgrade() {
            let _ = sender
                .send(WorkflowCommand::InitializationElapsed { generation })
                .await;
        }
    })
}

/// 进度定时器，第一次触发在一个周期之后
fn spawn_progress_ticker(
    sender: mpsc::WeakSender<WorkflowCommand>,
    generation: u64,
    period: Duration,
) -> JoinHandle<()> {
    let period = period.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(sender) = sender.upgrade() else {
                break;
            };
            if sender
                .send(WorkflowCommand::ProgressTick { generation })
                .await
                .is_err()
            {
                break;
            }
        }
    })
}

/// Workflow Handle（用于与Actor通信，可克隆）
#[derive(Clone)]
pub struct WorkflowHandle {
    sender: mpsc::Sender<WorkflowCommand>,
}

impl WorkflowHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> WorkflowCommand,
    ) -> Result<T, WorkflowError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(command(reply))
            .await
            .map_err(|_| WorkflowError::ActorStopped)?;
        rx.await.map_err(|_| WorkflowError::ActorStopped)
    }

    /// 开始（首页 → 初始化）
    pub async fn start(&self) -> Result<Screen, WorkflowError> {
        self.request(|reply| WorkflowCommand::Start { reply }).await?
    }

    /// 返回（工作区 → 首页），保留图片和分析结果
    pub async fn back(&self) -> Result<Screen, WorkflowError> {
        self.request(|reply| WorkflowCommand::Back { reply }).await?
    }

    /// 选择图片，返回选择序号
    pub async fn select_file(&self, file: ImageFile) -> Result<u64, WorkflowError> {
        self.request(|reply| WorkflowCommand::SelectFile { file, reply })
            .await?
    }

    /// 发起分析，结果通过事件总线和快照获取
    pub async fn analyze(&self) -> Result<(), WorkflowError> {
        self.request(|reply| WorkflowCommand::Analyze { reply }).await?
    }

    /// 清空图片和分析结果
    pub async fn reset(&self) -> Result<(), WorkflowError> {
        self.request(|reply| WorkflowCommand::Reset { reply }).await?
    }

    /// 获取快照
    pub async fn snapshot(&self) -> Result<WorkflowSnapshot, WorkflowError> {
        self.request(|reply| WorkflowCommand::Snapshot { reply })
            .await
    }

    /// 是否有分析请求正在进行
    pub async fn is_busy(&self) -> bool {
        self.snapshot()
            .await
            .map(|snapshot| snapshot.busy)
            .unwrap_or(false)
    }

    /// 停止工作流
    pub async fn shutdown(&self) {
        if self
            .request(|reply| WorkflowCommand::Shutdown { reply })
            .await
            .is_err()
        {
            debug!("Workflow Actor 已经停止");
        }
    }

    /// 健康检查
    /// 返回true表示Actor正常运行，false表示Actor无响应或已停止
    /// 超时时间为5秒
    pub async fn health_check(&self) -> bool {
        let (reply, rx) = oneshot::channel();

        // 尝试发送健康检查命令
        if self
            .sender
            .send(WorkflowCommand::HealthCheck { reply })
            .await
            .is_err()
        {
            warn!("Workflow Actor 健康检查失败: 通道已关闭");
            return false;
        }

        // 等待响应，超时5秒
        match tokio::time::timeout(Duration::from_secs(5), rx).await {
            Ok(Ok(())) => {
                debug!("Workflow Actor 健康检查成功");
                true
            }
            Ok(Err(_)) => {
                warn!("Workflow Actor 健康检查失败: Actor已停止");
                false
            }
            Err(_) => {
                warn!("Workflow Actor 健康检查失败: 超时(5秒)");
                false
            }
        }
    }
}
