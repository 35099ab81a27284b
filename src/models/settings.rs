// Settings data models
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::gaming::{BottleneckThresholds, KnownWorkload};
use super::performance::{MonitoringMode, StorageType};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub auto_switch_enabled: bool,
    pub auto_switch_interval_secs: u64,
    pub restart_grace_secs: u64,
    /// Per-app wait after a graceful close request before force-terminating
    pub close_timeout_ms: u64,
    pub close_poll_ms: u64,
    /// Apps never closed by a profile, matched case-insensitively
    pub essential_apps: Vec<String>,
    pub history_capacity: usize,
    pub initial_mode: MonitoringMode,
    pub restart_tweak_id: String,
    /// Log tweaks instead of executing them
    pub dry_run: bool,
    /// Tweak id -> program and arguments
    pub tweak_commands: HashMap<String, Vec<String>>,
    pub extra_workloads: Vec<KnownWorkload>,
    pub storage_override: Option<StorageType>,
    pub on_battery_override: Option<bool>,
    pub bottleneck_thresholds: BottleneckThresholds,
    pub status_log_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_switch_enabled: true,
            auto_switch_interval_secs: 5,
            restart_grace_secs: 30,
            close_timeout_ms: 5000,
            close_poll_ms: 100,
            essential_apps: vec!["discord.exe".to_string(), "obs64.exe".to_string()],
            history_capacity: 300,
            initial_mode: MonitoringMode::Active,
            restart_tweak_id: String::from("system_restart"),
            dry_run: true,
            tweak_commands: HashMap::new(),
            extra_workloads: Vec::new(),
            storage_override: None,
            on_battery_override: None,
            bottleneck_thresholds: BottleneckThresholds::default(),
            status_log_interval_secs: 30,
        }
    }
}

impl Settings {
    pub fn auto_switch_interval(&self) -> Duration {
        Duration::from_secs(self.auto_switch_interval_secs.max(1))
    }

    pub fn restart_grace(&self) -> Duration {
        Duration::from_secs(self.restart_grace_secs)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    pub fn close_poll(&self) -> Duration {
        Duration::from_millis(self.close_poll_ms.max(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "restart_grace_secs": 10, "dry_run": false }"#).unwrap();

        assert_eq!(settings.restart_grace(), Duration::from_secs(10));
        assert!(!settings.dry_run);
        assert_eq!(settings.auto_switch_interval_secs, 5);
        assert_eq!(settings.restart_tweak_id, "system_restart");
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let result = serde_json::from_str::<Settings>(r#"{ "initial_mode": "turbo" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_interval_never_zero() {
        let settings = Settings {
            auto_switch_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(settings.auto_switch_interval(), Duration::from_secs(1));
    }
}
