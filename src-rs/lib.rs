pub mod co2;
pub mod config;
pub mod error;
pub mod slot;
pub mod submitter;

#[path = "client/lib.rs"]
pub mod client;
#[path = "poll/lib.rs"]
pub mod poll;
#[path = "task/lib.rs"]
pub mod task;
#[path = "api/lib.rs"]
pub mod api;

pub use client::{
    ComputationKind, ComputationParams, GroupHandle, GroupProgress, GroupStatus, HttpTaskApi, ResultsSnapshot,
    SubmittedHandle, TaskApi, TaskHandle, TaskStatus,
};
pub use config::PollingConfig;
pub use error::{PollError, SubmissionError, TransportError};
pub use slot::{ComputationSlot, SlotState};
pub use submitter::TaskSubmitter;
