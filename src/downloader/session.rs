use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::CredentialStore;
use crate::common::api::backend::TaskBackend;
use crate::ui::{DisplayState, Notifier, TaskView};

use super::error::TaskError;
use super::poller::{PollFlow, ProgressPoller, Transition};
use super::retrieval::RetrievalAction;
use super::submitter::{self, TaskSubmitter};
use super::task::{Task, TaskState};
use super::timer::PollTimer;

struct SessionState {
    // 每次取消或替换任务都会递增，过期的轮询结果据此丢弃
    generation: u64,
    task: Option<Task>,
    display: DisplayState,
    view: Box<dyn TaskView>,
}

impl SessionState {
    fn render(&mut self, display: DisplayState) {
        self.display = display;
        self.view.render(&self.display);
    }
}

fn lock(shared: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    match shared.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// 协调同一时间最多一个进行中的任务。
/// 新任务总是先取消旧的轮询循环，再创建新的。
pub struct TaskSession {
    backend: Arc<dyn TaskBackend>,
    submitter: TaskSubmitter,
    store: Arc<dyn CredentialStore>,
    notifier: Notifier,
    shared: Arc<Mutex<SessionState>>,
    timer: Option<PollTimer>,
}

impl TaskSession {
    pub fn new(
        backend: Arc<dyn TaskBackend>,
        store: Arc<dyn CredentialStore>,
        notifier: Notifier,
        view: Box<dyn TaskView>,
    ) -> Self {
        Self {
            submitter: TaskSubmitter::new(backend.clone()),
            backend,
            store,
            notifier,
            shared: Arc::new(Mutex::new(SessionState {
                generation: 0,
                task: None,
                display: DisplayState::Idle,
                view,
            })),
            timer: None,
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn display(&self) -> DisplayState {
        lock(&self.shared).display.clone()
    }

    pub fn current_task(&self) -> Option<Task> {
        lock(&self.shared).task.clone()
    }

    pub fn state(&self) -> TaskState {
        let state = lock(&self.shared);
        match &state.task {
            Some(task) => task.state,
            None => state.display.state(),
        }
    }

    /// 是否有尚未等待完成的轮询循环
    pub fn is_polling(&self) -> bool {
        self.timer.as_ref().is_some_and(PollTimer::is_pending)
    }

    /// 提交新任务并开始轮询，返回服务器分配的任务 ID
    pub async fn start(&mut self, url: &str, credential: &str) -> Result<String, TaskError> {
        if !credential.is_empty() {
            if let Err(e) = self.store.save(credential) {
                warn!("保存凭据失败: {}", e);
            }
        }

        if let Err(e) = submitter::validate(url, credential) {
            self.notifier.notify(e.to_string());
            return Err(e);
        }

        if self.cancel_active() {
            info!("新的提交替换了正在进行的任务");
        }
        lock(&self.shared).render(DisplayState::Submitting);

        let task_id = match self.submitter.submit(url, credential).await {
            Ok(task_id) => task_id,
            Err(e) => {
                self.notifier.notify(e.to_string());
                lock(&self.shared).render(DisplayState::Idle);
                return Err(e);
            }
        };

        let generation = {
            let mut state = lock(&self.shared);
            state.task = Some(Task::new(task_id.clone()));
            state.render(DisplayState::Starting);
            state.generation
        };
        self.spawn_poller(task_id.clone(), generation);

        Ok(task_id)
    }

    /// 取消当前轮询并回到空闲界面，重复调用是无操作
    pub fn cancel(&mut self) {
        self.cancel_active();
        lock(&self.shared).render(DisplayState::Idle);
    }

    /// 等待当前轮询循环结束，返回到达终态的任务
    pub async fn wait(&mut self) -> Option<Task> {
        match self.timer.as_mut() {
            Some(timer) => timer.join().await,
            None => None,
        }
    }

    // 取消旧循环并丢弃旧任务，返回是否真的取消了一个活动循环
    fn cancel_active(&mut self) -> bool {
        let cancelled = match self.timer.take() {
            Some(timer) => {
                debug!(
                    "释放任务 {} 的轮询句柄 (generation {})",
                    timer.task_id(),
                    timer.generation()
                );
                timer.cancel()
            }
            None => false,
        };

        let mut state = lock(&self.shared);
        state.generation += 1;
        state.task = None;
        cancelled
    }

    fn spawn_poller(&mut self, task_id: String, generation: u64) {
        let token = CancellationToken::new();
        let poller = ProgressPoller::new(task_id.clone(), self.backend.clone());
        debug!("任务 {} 的轮询已启动 (generation {})", poller.task_id(), generation);

        let shared = self.shared.clone();
        let apply_shared = self.shared.clone();
        let notifier = self.notifier.clone();
        let backend = self.backend.clone();
        let loop_token = token.clone();

        let handle = tokio::spawn(async move {
            poller
                .run(loop_token, move |transition| {
                    apply_transition(&apply_shared, &notifier, backend.as_ref(), generation, transition)
                })
                .await;

            let state = lock(&shared);
            if state.generation != generation {
                return None;
            }
            state.task.clone().filter(|task| task.state.is_terminal())
        });

        self.timer = Some(PollTimer::new(task_id, generation, token, handle));
    }
}

fn apply_transition(
    shared: &Mutex<SessionState>,
    notifier: &Notifier,
    backend: &dyn TaskBackend,
    generation: u64,
    transition: Transition,
) -> PollFlow {
    let mut notice = None;

    let flow = {
        let mut guard = lock(shared);
        let state = &mut *guard;

        if state.generation != generation {
            debug!("丢弃过期的进度响应 (generation {})", generation);
            return PollFlow::Stop;
        }
        let Some(task) = state.task.as_mut() else {
            return PollFlow::Stop;
        };
        if !task.apply(&transition) {
            return PollFlow::Continue;
        }
        debug!("任务 {} 状态: {}", task.id, task.state);

        let display = match task.state {
            TaskState::Starting => DisplayState::Starting,
            TaskState::Downloading => DisplayState::Downloading {
                current: task.current,
                total: task.total,
            },
            TaskState::Finished => {
                info!("任务 {} 已完成", task.id);
                DisplayState::Finished
            }
            TaskState::FinishedWithPackage => match backend.zip_url(&task.id) {
                Ok(url) => {
                    info!("任务 {} 已完成，打包文件已就绪", task.id);
                    DisplayState::Package(RetrievalAction::new(task.id.clone(), url))
                }
                Err(e) => {
                    warn!("无法生成打包文件地址: {}", e);
                    DisplayState::Finished
                }
            },
            TaskState::Failed => {
                let message = task.error_message.clone().unwrap_or_default();
                warn!("任务 {} 失败: {}", task.id, message);
                notice = Some(message.clone());
                DisplayState::Failed(message)
            }
            TaskState::Idle | TaskState::Submitting => return PollFlow::Continue,
        };

        let terminal = task.state.is_terminal();
        state.render(display);
        if terminal {
            PollFlow::Stop
        } else {
            PollFlow::Continue
        }
    };

    if let Some(message) = notice {
        notifier.notify(message);
    }
    flow
}
