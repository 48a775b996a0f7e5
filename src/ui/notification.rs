use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::debug;

/// 通知显示多久后自动消失
pub const NOTIFICATION_TTL: Duration = Duration::from_millis(3000);

/// 通知的实际显示位置
pub trait NotificationSink: Send + Sync {
    fn show(&self, message: &str);
    fn dismiss(&self);
}

// 终端输出
#[derive(Debug, Default)]
pub struct TerminalSink;

impl NotificationSink for TerminalSink {
    fn show(&self, message: &str) {
        crate::log_warning!("{}", message);
    }

    fn dismiss(&self) {
        debug!("通知已消失");
    }
}

#[derive(Default)]
struct NotifierState {
    current: Option<String>,
    dismiss: Option<JoinHandle<()>>,
    seq: u64,
}

/// 短暂显示的通知，新通知替换旧通知并重置消失计时
#[derive(Clone)]
pub struct Notifier {
    state: Arc<Mutex<NotifierState>>,
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            state: Arc::new(Mutex::new(NotifierState::default())),
            sink,
        }
    }

    pub fn terminal() -> Self {
        Self::new(Arc::new(TerminalSink))
    }

    fn lock(&self) -> MutexGuard<'_, NotifierState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// 当前正在显示的通知
    pub fn current(&self) -> Option<String> {
        self.lock().current.clone()
    }

    pub fn notify(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        let mut state = self.lock();

        if let Some(handle) = state.dismiss.take() {
            handle.abort();
        }
        state.seq += 1;
        state.current = Some(message.to_string());
        self.sink.show(message);

        // 没有运行时就不安排自动消失
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("没有 tokio 运行时，通知不会自动消失");
            return;
        };

        let seq = state.seq;
        let notifier = self.clone();
        state.dismiss = Some(runtime.spawn(async move {
            tokio::time::sleep(NOTIFICATION_TTL).await;
            notifier.expire(seq);
        }));
    }

    fn expire(&self, seq: u64) {
        let mut state = self.lock();
        // 计时期间又来了新通知
        if state.seq != seq {
            return;
        }
        state.current = None;
        state.dismiss = None;
        self.sink.dismiss();
    }
}
