pub mod config;
pub mod context;
pub mod effector;
pub mod error;
pub mod file_manager;
pub mod gaming;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod performance;
pub mod persistence;
pub mod profiles;
pub mod task_monitor;
pub mod utils;

#[cfg(test)]
mod testing;

pub use context::{TunerContext, TunerParts};
pub use error::{ErrorKind, Result, TunerError};
