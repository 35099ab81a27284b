pub mod categorizer;
pub mod closer;

pub use categorizer::{is_protected, protected_category, ProtectedCategory};
pub use closer::{AppCloser, AppController, AppProcess, CloseOutcome, CloseReport, SysinfoAppController};
