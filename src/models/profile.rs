// Tuning profile data structures
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadCategory {
    CompetitiveShooter,
    Moba,
    BattleRoyale,
    OpenWorld,
    Creative,
    Balanced,
}

/// Static catalog entry describing how to tune for a workload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkloadProfile {
    pub name: String,
    pub category: WorkloadCategory,
    pub cpu_latency_base: f64,
    pub input_lag_base: f64,
    pub gpu_boost_base: f64,
    pub ram_allocation_base: f64,
    pub network_base: f64,
    /// Tweak ids handed to the effector, in order
    pub tweaks: Vec<String>,
    /// Non-essential apps closed before tweaks are applied
    pub close_apps: Vec<String>,
}

/// Tuning intensity per subsystem, each in [0, 1]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct TuningWeights {
    pub cpu_latency: f64,
    pub input_lag: f64,
    pub gpu_boost: f64,
    pub ram_allocation: f64,
    pub thermal_management: f64,
    pub disk_io: f64,
    pub power_management: f64,
    pub network_optimization: f64,
}

impl TuningWeights {
    pub fn as_array(&self) -> [f64; 8] {
        [
            self.cpu_latency,
            self.input_lag,
            self.gpu_boost,
            self.ram_allocation,
            self.thermal_management,
            self.disk_io,
            self.power_management,
            self.network_optimization,
        ]
    }
}
