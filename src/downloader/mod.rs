pub mod error;
pub mod poller;
pub mod retrieval;
pub mod session;
pub mod submitter;
pub mod task;
pub mod timer;

pub use error::TaskError;
pub use poller::{POLL_INTERVAL, PollFlow, ProgressPoller, Transition, interpret};
pub use retrieval::RetrievalAction;
pub use session::TaskSession;
pub use submitter::TaskSubmitter;
pub use task::{Task, TaskState};
pub use timer::PollTimer;
