pub mod group;
pub mod progress;
pub mod results;
pub mod session;
pub mod status;

pub use group::{GroupEvent, GroupProgressPoller};
pub use progress::ProgressTracker;
pub use results::ResultsStreamer;
pub use session::{FirstTick, PollSession, SessionGuard, SessionId, Ticker};
pub use status::{StatusPoller, TaskEvent, TaskFailure};
