// Data models (structs)
pub mod gaming;
pub mod performance;
pub mod pipeline;
pub mod profile;
pub mod settings;

pub use gaming::*;
pub use performance::*;
pub use pipeline::*;
pub use profile::*;
pub use settings::*;
