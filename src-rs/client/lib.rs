pub mod http;
pub mod types;

pub use http::HttpTaskApi;
pub use types::{
    ComputationKind, ComputationParams, GroupHandle, GroupProgress, GroupStatus, ResultsSnapshot,
    StartTaskResponse, SubmittedHandle, TaskApi, TaskHandle, TaskStatus, TaskStatusResponse,
};
