use std::fmt;

use super::poller::Transition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    Idle,
    Submitting,
    Starting,
    Downloading,
    Finished,
    FinishedWithPackage,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Finished | TaskState::FinishedWithPackage | TaskState::Failed
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Idle => "空闲",
            TaskState::Submitting => "提交中",
            TaskState::Starting => "启动中",
            TaskState::Downloading => "下载中",
            TaskState::Finished => "已完成",
            TaskState::FinishedWithPackage => "已完成(已打包)",
            TaskState::Failed => "失败",
        };
        write!(f, "{}", name)
    }
}

/// 服务器端的一个下载任务，ID 由服务器分配
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub state: TaskState,
    pub current: u64,
    pub total: u64,
    pub zip_ready: bool,
    pub error_message: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: TaskState::Starting,
            current: 0,
            total: 0,
            zip_ready: false,
            error_message: None,
        }
    }

    /// 应用一次状态转移，返回任务是否发生变化。
    /// 终态之后不再接受任何转移。
    pub fn apply(&mut self, transition: &Transition) -> bool {
        if self.state.is_terminal() {
            return false;
        }

        match transition {
            Transition::Failed(err) => {
                self.state = TaskState::Failed;
                self.error_message = Some(err.to_string());
            }
            Transition::Finished => {
                self.state = TaskState::Finished;
            }
            Transition::FinishedWithPackage => {
                self.state = TaskState::FinishedWithPackage;
                self.zip_ready = true;
            }
            Transition::Starting => {
                self.state = TaskState::Starting;
            }
            Transition::Progress { current, total } => {
                self.state = TaskState::Downloading;
                self.current = *current;
                self.total = *total;
            }
            Transition::NoOp => return false,
        }
        true
    }
}
