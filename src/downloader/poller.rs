use std::sync::Arc;

use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::common::api::backend::TaskBackend;
use crate::common::api::models::task::ProgressResponse;

use super::error::TaskError;

/// 两次进度查询之间的固定间隔
pub const POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// 一次进度响应对应的状态转移
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Failed(TaskError),
    Finished,
    FinishedWithPackage,
    Starting,
    Progress { current: u64, total: u64 },
    NoOp,
}

impl Transition {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Transition::Failed(_) | Transition::Finished | Transition::FinishedWithPackage
        )
    }
}

/// 轮询回调的返回值，决定是否继续轮询
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollFlow {
    Continue,
    Stop,
}

/// 按固定顺序解释一次进度响应：
/// error > finished > starting > current/total > 无操作
pub fn interpret(resp: &ProgressResponse) -> Transition {
    if let Some(error) = resp.error() {
        return Transition::Failed(TaskError::Polling(error.to_string()));
    }

    if resp.is_finished() {
        return if resp.is_zip_ready() {
            Transition::FinishedWithPackage
        } else {
            // 既没有 zip_ready 也没有 error，按普通完成处理
            Transition::Finished
        };
    }

    if resp.is_starting() {
        return Transition::Starting;
    }

    match resp.counters() {
        Some((current, total)) => Transition::Progress { current, total },
        None => Transition::NoOp,
    }
}

/// 绑定到单个任务 ID 的进度轮询器
pub struct ProgressPoller {
    task_id: String,
    backend: Arc<dyn TaskBackend>,
}

impl ProgressPoller {
    pub fn new(task_id: impl Into<String>, backend: Arc<dyn TaskBackend>) -> Self {
        Self {
            task_id: task_id.into(),
            backend,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// 查询一次进度并解释结果，网络失败视为终态
    pub async fn query(&self) -> Transition {
        debug!("查询任务进度: {}", self.task_id);
        match self.backend.progress(&self.task_id).await {
            Ok(resp) => {
                debug!("任务 {} 进度响应: {:?}", self.task_id, resp);
                interpret(&resp)
            }
            Err(e) => {
                warn!("任务 {} 获取进度失败: {}", self.task_id, e);
                Transition::Failed(TaskError::Transport(e.to_string()))
            }
        }
    }

    /// 轮询循环。首次查询在启动后一个间隔触发，
    /// 上一次响应处理完之前不会发出下一次查询。
    ///
    /// `apply` 返回 [`PollFlow::Stop`] 或取消令牌被触发时退出。
    /// 退出前令牌总会被取消，之后再取消是无操作。
    pub async fn run<F>(self, cancel: CancellationToken, mut apply: F)
    where
        F: FnMut(Transition) -> PollFlow + Send,
    {
        let mut ticker = interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("开始轮询任务: {}", self.task_id);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("任务 {} 的轮询已取消", self.task_id);
                    return;
                }
                _ = ticker.tick() => {}
            }

            let transition = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("任务 {} 的轮询在请求途中被取消", self.task_id);
                    return;
                }
                transition = self.query() => transition,
            };

            // 响应返回前可能已被取消，此时丢弃
            if cancel.is_cancelled() {
                debug!("丢弃任务 {} 的过期响应", self.task_id);
                return;
            }

            let terminal = transition.is_terminal();
            if apply(transition) == PollFlow::Stop || terminal {
                info!("任务 {} 停止轮询", self.task_id);
                cancel.cancel();
                return;
            }
        }
    }
}
