pub use crate::task::{Simulation, TaskStore};

pub mod handlers;
pub mod server;

pub use handlers::AppState;
pub use server::{router, DevServer};
