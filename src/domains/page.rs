// 页面状态机
//
// 负责当前激活页面及页面之间的切换
// 状态机本身不持有定时器，切换产生的副作用以 PageEffect 形式交给工作流容器执行

use std::time::Duration;

use crate::models::{Screen, WorkflowError};

/// 页面动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAction {
    /// 用户点击"开始"
    Start,
    /// 初始化定时器到期（携带进入初始化页时的代数）
    InitializationElapsed { generation: u64 },
    /// 用户点击"返回"
    Back,
}

impl PageAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::InitializationElapsed { .. } => "initialization_elapsed",
            Self::Back => "back",
        }
    }
}

/// 页面切换的副作用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEffect {
    /// 进度清零并启动进度模拟
    StartProgress,
    /// 停止进度模拟并清零
    StopProgress,
    /// 延迟后切换到工作区
    ScheduleWorkspace { generation: u64, delay: Duration },
}

/// 一次成功的页面切换
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: Screen,
    pub to: Screen,
    pub effects: Vec<PageEffect>,
}

/// 页面状态机
///
/// 首页 → 初始化 → 工作区 → 首页，循环往复，没有终止状态
#[derive(Debug)]
pub struct PageStateMachine {
    screen: Screen,
    /// 每次进入初始化页递增，用于识别过期的定时器消息
    generation: u64,
    initialization_delay: Duration,
}

impl PageStateMachine {
    pub fn new(initialization_delay: Duration) -> Self {
        Self {
            screen: Screen::Intake,
            generation: 0,
            initialization_delay,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn initialization_delay(&self) -> Duration {
        self.initialization_delay
    }

    /// 执行页面动作
    ///
    /// 当前页面不支持的动作返回 `InvalidTransition`，状态保持不变
    pub fn apply(&mut self, action: PageAction) -> Result<Transition, WorkflowError> {
        let from = self.screen;

        let (to, effects) = match (from, action) {
            (Screen::Intake, PageAction::Start) => {
                self.generation += 1;
                (
                    Screen::Initializing,
                    vec![
                        PageEffect::StartProgress,
                        PageEffect::ScheduleWorkspace {
                            generation: self.generation,
                            delay: self.initialization_delay,
                        },
                    ],
                )
            }
            (Screen::Initializing, PageAction::InitializationElapsed { generation })
                if generation == self.generation =>
            {
                (Screen::Workspace, vec![PageEffect::StopProgress])
            }
            (Screen::Workspace, PageAction::Back) => (Screen::Intake, Vec::new()),
            (screen, action) => {
                return Err(WorkflowError::InvalidTransition {
                    screen,
                    action: action.name(),
                })
            }
        };

        self.screen = to;
        Ok(Transition { from, to, effects })
    }
}
