use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::task::Task;

/// 一个轮询循环的句柄，由会话独占
#[derive(Debug)]
pub struct PollTimer {
    task_id: String,
    generation: u64,
    token: CancellationToken,
    handle: Option<JoinHandle<Option<Task>>>,
}

impl PollTimer {
    pub fn new(
        task_id: impl Into<String>,
        generation: u64,
        token: CancellationToken,
        handle: JoinHandle<Option<Task>>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            generation,
            token,
            handle: Some(handle),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// 循环还没有被等待完成
    pub fn is_pending(&self) -> bool {
        self.handle.is_some()
    }

    /// 取消轮询。只有第一次调用返回 `true`，之后都是无操作
    pub fn cancel(&self) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        debug!("取消任务 {} 的轮询 (generation {})", self.task_id, self.generation);
        self.token.cancel();
        true
    }

    /// 等待循环结束，返回到达终态的任务。
    /// 被取消或被替换的循环返回 `None`
    pub async fn join(&mut self) -> Option<Task> {
        let handle = self.handle.as_mut()?;
        let result = handle.await;
        self.handle = None;

        match result {
            Ok(task) => task,
            Err(e) => {
                debug!("轮询任务 {} 异常退出: {}", self.task_id, e);
                None
            }
        }
    }
}
