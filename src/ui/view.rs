use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::Duration;

use crate::downloader::retrieval::RetrievalAction;
use crate::downloader::task::TaskState;

/// 当前界面上显示的内容
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DisplayState {
    #[default]
    Idle,
    Submitting,
    Starting,
    Downloading {
        current: u64,
        total: u64,
    },
    Finished,
    Package(RetrievalAction),
    Failed(String),
}

impl DisplayState {
    /// 忙碌状态：进度区域可见
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            DisplayState::Submitting | DisplayState::Starting | DisplayState::Downloading { .. }
        )
    }

    pub fn state(&self) -> TaskState {
        match self {
            DisplayState::Idle => TaskState::Idle,
            DisplayState::Submitting => TaskState::Submitting,
            DisplayState::Starting => TaskState::Starting,
            DisplayState::Downloading { .. } => TaskState::Downloading,
            DisplayState::Finished => TaskState::Finished,
            DisplayState::Package(_) => TaskState::FinishedWithPackage,
            DisplayState::Failed(_) => TaskState::Failed,
        }
    }

    /// 进度文字，例如 `3/10`
    pub fn progress_text(&self) -> Option<String> {
        match self {
            DisplayState::Downloading { current, total } => Some(format!("{}/{}", current, total)),
            _ => None,
        }
    }

    pub fn retrieval(&self) -> Option<&RetrievalAction> {
        match self {
            DisplayState::Package(action) => Some(action),
            _ => None,
        }
    }
}

/// 界面接缝，会话每次状态变化后调用
pub trait TaskView: Send {
    fn render(&mut self, display: &DisplayState);
}

// 基于 indicatif 的终端界面
#[derive(Default)]
pub struct TerminalView {
    spinner: Option<ProgressBar>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }

    fn spinner(&mut self) -> &ProgressBar {
        self.spinner.get_or_insert_with(|| {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        })
    }

    fn clear(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

impl TaskView for TerminalView {
    fn render(&mut self, display: &DisplayState) {
        match display {
            DisplayState::Idle => self.clear(),
            DisplayState::Submitting => self.spinner().set_message("正在提交任务..."),
            DisplayState::Starting => self.spinner().set_message("下载启动中..."),
            DisplayState::Downloading { current, total } => {
                self.spinner()
                    .set_message(format!("正在下载: {}/{}", current, total));
            }
            DisplayState::Finished => {
                self.clear();
                crate::log_success!("下载完成！");
            }
            DisplayState::Package(action) => {
                self.clear();
                crate::log_success!("下载完成，打包文件已就绪");
                crate::log_file!("打包文件", action.url.as_str());
            }
            DisplayState::Failed(message) => {
                self.clear();
                crate::log_error!("任务失败: {}", message);
            }
        }
    }
}
