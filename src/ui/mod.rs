pub mod notification;
pub mod view;

pub use notification::{NOTIFICATION_TTL, NotificationSink, Notifier, TerminalSink};
pub use view::{DisplayState, TaskView, TerminalView};
