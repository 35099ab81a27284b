// Profile pipeline orchestration
pub mod pipeline;
pub mod restart;
pub mod snapshot;

pub use pipeline::{OrchestratorConfig, ProfileOrchestrator};
pub use restart::RestartScheduler;
pub use snapshot::{ClosedApp, RestoreList, SessionSnapshot, SnapshotStore};
