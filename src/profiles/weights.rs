// Tuning weight calculation
// Pure functions of (profile, hardware context) - no hidden state

use super::catalog::ProfileCatalog;
use crate::models::{HardwareContext, StorageType, TuningWeights, WorkloadProfile};

/// GPU boost scaling by temperature. Unknown temperature is neutral.
pub fn thermal_multiplier(gpu_temp_c: Option<f32>) -> f64 {
    match gpu_temp_c {
        Some(t) if t > 85.0 => 0.65,
        Some(t) if t > 75.0 => 0.80,
        Some(t) if t < 60.0 => 1.10,
        _ => 1.0,
    }
}

/// RAM allocation scaling by installed memory
pub fn ram_multiplier(total_ram_gb: f64) -> f64 {
    if total_ram_gb < 16.0 {
        0.85
    } else if total_ram_gb < 32.0 {
        0.95
    } else if total_ram_gb > 64.0 {
        1.05
    } else {
        1.0
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Applies the hardware adjustments to a profile's base weights
pub fn compute(profile: &WorkloadProfile, hw: &HardwareContext) -> TuningWeights {
    let gpu_hot = hw.gpu_temp_c.map_or(false, |t| t > 75.0);

    TuningWeights {
        cpu_latency: clamp_unit(profile.cpu_latency_base),
        input_lag: clamp_unit(profile.input_lag_base),
        gpu_boost: clamp_unit(profile.gpu_boost_base * thermal_multiplier(hw.gpu_temp_c)),
        ram_allocation: clamp_unit(profile.ram_allocation_base * ram_multiplier(hw.total_ram_gb)),
        thermal_management: if gpu_hot { 0.85 } else { 0.45 },
        disk_io: match hw.storage_type {
            StorageType::Hdd => 0.85,
            StorageType::Ssd => 0.30,
        },
        power_management: if hw.on_battery { 0.70 } else { 0.40 },
        network_optimization: clamp_unit(profile.network_base),
    }
}

/// Resolves profile names against a catalog before computing
#[derive(Debug, Clone)]
pub struct WeightCalculator {
    catalog: ProfileCatalog,
}

impl WeightCalculator {
    pub fn new(catalog: ProfileCatalog) -> Self {
        Self { catalog }
    }

    /// Unknown profile names fall back to the balanced default
    pub fn compute(&self, profile_name: &str, hw: &HardwareContext) -> TuningWeights {
        compute(self.catalog.resolve(profile_name), hw)
    }

    pub fn catalog(&self) -> &ProfileCatalog {
        &self.catalog
    }
}

impl Default for WeightCalculator {
    fn default() -> Self {
        Self::new(ProfileCatalog::with_builtin())
    }
}
