pub mod store;
pub mod types;
pub mod worker;

pub use store::TaskStore;
pub use types::{EmissionRow, GroupRecord, TaskRecord};
pub use worker::Simulation;
