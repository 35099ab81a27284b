// Performance monitoring data structures
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::TunerError;

/// Immutable system metrics snapshot produced by the telemetry sampler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Metrics {
    pub timestamp: i64, // Unix timestamp in milliseconds
    /// Overall CPU usage percentage (0-100)
    pub cpu_percent: f32,
    /// GPU utilization percentage (0-100), 0 when no GPU sensor is available
    pub gpu_percent: f32,
    pub ram_used_gb: f64,
    pub ram_total_gb: f64,
    /// Memory usage percentage (0-100)
    pub ram_percent: f32,
    /// CPU package temperature in Celsius (if available)
    pub cpu_temp_c: Option<f32>,
    /// GPU temperature in Celsius (if available)
    pub gpu_temp_c: Option<f32>,
}

/// Sampling fidelity. Governs the minimum resample interval and which sensors are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MonitoringMode {
    /// Counters plus hardware sensors, resampled at most once per second
    #[default]
    Active,
    /// Counters only, hardware values carried forward, resampled at most every 5 seconds
    Background,
    /// No sensor I/O at all
    Paused,
}

impl MonitoringMode {
    /// Minimum resample interval, `None` meaning never resample
    pub fn min_interval(self) -> Option<Duration> {
        match self {
            MonitoringMode::Active => Some(Duration::from_secs(1)),
            MonitoringMode::Background => Some(Duration::from_secs(5)),
            MonitoringMode::Paused => None,
        }
    }

    pub fn reads_hardware(self) -> bool {
        self == MonitoringMode::Active
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MonitoringMode::Active => "active",
            MonitoringMode::Background => "background",
            MonitoringMode::Paused => "paused",
        }
    }
}

impl fmt::Display for MonitoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitoringMode {
    type Err = TunerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(MonitoringMode::Active),
            "background" => Ok(MonitoringMode::Background),
            "paused" => Ok(MonitoringMode::Paused),
            other => Err(TunerError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    #[default]
    Ssd,
    Hdd,
}

/// Static facts about the machine that do not change between samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MachineFacts {
    pub storage_type: StorageType,
    pub on_battery: bool,
}

/// Live hardware context fed into the weight calculator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HardwareContext {
    pub total_ram_gb: f64,
    pub gpu_temp_c: Option<f32>,
    pub cpu_temp_c: Option<f32>,
    pub storage_type: StorageType,
    pub on_battery: bool,
}

impl HardwareContext {
    pub fn from_metrics(metrics: &Metrics, facts: &MachineFacts) -> Self {
        Self {
            total_ram_gb: metrics.ram_total_gb,
            gpu_temp_c: metrics.gpu_temp_c,
            cpu_temp_c: metrics.cpu_temp_c,
            storage_type: facts.storage_type,
            on_battery: facts.on_battery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_intervals() {
        assert_eq!(MonitoringMode::Active.min_interval(), Some(Duration::from_secs(1)));
        assert_eq!(MonitoringMode::Background.min_interval(), Some(Duration::from_secs(5)));
        assert_eq!(MonitoringMode::Paused.min_interval(), None);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Active".parse::<MonitoringMode>().unwrap(), MonitoringMode::Active);
        assert_eq!(" paused ".parse::<MonitoringMode>().unwrap(), MonitoringMode::Paused);

        let err = "turbo".parse::<MonitoringMode>().unwrap_err();
        assert!(matches!(err, TunerError::UnknownMode(ref m) if m == "turbo"));
    }

    #[test]
    fn test_hardware_context_from_metrics() {
        let metrics = Metrics {
            ram_total_gb: 32.0,
            gpu_temp_c: Some(71.0),
            ..Default::default()
        };
        let facts = MachineFacts {
            storage_type: StorageType::Hdd,
            on_battery: true,
        };

        let hw = HardwareContext::from_metrics(&metrics, &facts);
        assert_eq!(hw.total_ram_gb, 32.0);
        assert_eq!(hw.gpu_temp_c, Some(71.0));
        assert_eq!(hw.cpu_temp_c, None);
        assert_eq!(hw.storage_type, StorageType::Hdd);
        assert!(hw.on_battery);
    }
}
