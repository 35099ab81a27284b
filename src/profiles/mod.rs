// Workload profiles and tuning weights
pub mod catalog;
pub mod weights;

pub use catalog::{balanced_profile, ProfileCatalog, BALANCED_PROFILE};
pub use weights::WeightCalculator;
