// Workload profile registry with a named default entry
use std::collections::HashMap;

use crate::models::{WorkloadCategory, WorkloadProfile};

pub const BALANCED_PROFILE: &str = "Balanced";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[allow(clippy::too_many_arguments)]
fn profile(
    name: &str,
    category: WorkloadCategory,
    cpu_latency: f64,
    input_lag: f64,
    gpu_boost: f64,
    ram_allocation: f64,
    network: f64,
    tweaks: &[&str],
    close_apps: &[&str],
) -> WorkloadProfile {
    WorkloadProfile {
        name: name.to_string(),
        category,
        cpu_latency_base: cpu_latency,
        input_lag_base: input_lag,
        gpu_boost_base: gpu_boost,
        ram_allocation_base: ram_allocation,
        network_base: network,
        tweaks: strings(tweaks),
        close_apps: strings(close_apps),
    }
}

const LIGHT_CLEANUP: &[&str] = &["searchindexer.exe", "widgets.exe", "compattelrunner.exe"];

const COMPETITIVE_CLEANUP: &[&str] = &[
    "msedge.exe",
    "searchindexer.exe",
    "searchapp.exe",
    "widgets.exe",
    "widgetservice.exe",
    "onedrive.exe",
    "yourphone.exe",
    "msteams.exe",
    "compattelrunner.exe",
];

const HEAVY_CLEANUP: &[&str] = &[
    "msedge.exe",
    "chrome.exe",
    "firefox.exe",
    "searchindexer.exe",
    "searchapp.exe",
    "widgets.exe",
    "widgetservice.exe",
    "onedrive.exe",
    "yourphone.exe",
    "msteams.exe",
    "slack.exe",
    "spotify.exe",
    "compattelrunner.exe",
    "gamebar.exe",
];

const LATENCY_TWEAKS: &[&str] = &[
    "timer_resolution_0_5ms",
    "cpu_priority_high",
    "disable_core_parking",
    "disable_nagle",
    "network_throttling_off",
    "mouse_acceleration_off",
    "disable_fullscreen_optimizations",
    "disable_game_dvr",
];

const THROUGHPUT_TWEAKS: &[&str] = &[
    "power_plan_high_performance",
    "gpu_max_performance",
    "standby_list_clean",
    "disable_game_dvr",
    "hardware_gpu_scheduling_on",
];

fn builtin_profiles() -> Vec<WorkloadProfile> {
    use WorkloadCategory::*;

    vec![
        profile("Valorant", CompetitiveShooter, 0.95, 0.98, 0.55, 0.15, 0.90, LATENCY_TWEAKS, COMPETITIVE_CLEANUP),
        profile("Counter-Strike 2", CompetitiveShooter, 0.95, 0.97, 0.65, 0.25, 0.90, LATENCY_TWEAKS, COMPETITIVE_CLEANUP),
        profile("Overwatch 2", CompetitiveShooter, 0.90, 0.95, 0.75, 0.35, 0.85, LATENCY_TWEAKS, COMPETITIVE_CLEANUP),
        profile("League of Legends", Moba, 0.80, 0.85, 0.45, 0.30, 0.90, LATENCY_TWEAKS, LIGHT_CLEANUP),
        profile("Dota 2", Moba, 0.80, 0.85, 0.55, 0.35, 0.90, LATENCY_TWEAKS, LIGHT_CLEANUP),
        profile("Apex Legends", BattleRoyale, 0.90, 0.92, 0.85, 0.55, 0.85, LATENCY_TWEAKS, HEAVY_CLEANUP),
        profile("Fortnite", BattleRoyale, 0.88, 0.90, 0.80, 0.55, 0.85, LATENCY_TWEAKS, HEAVY_CLEANUP),
        profile("PUBG", BattleRoyale, 0.85, 0.88, 0.85, 0.65, 0.85, LATENCY_TWEAKS, HEAVY_CLEANUP),
        profile("Genshin Impact", OpenWorld, 0.65, 0.60, 0.85, 0.60, 0.55, THROUGHPUT_TWEAKS, LIGHT_CLEANUP),
        profile("Cyberpunk 2077", OpenWorld, 0.70, 0.65, 0.95, 0.75, 0.30, THROUGHPUT_TWEAKS, HEAVY_CLEANUP),
        profile("Streaming", Creative, 0.60, 0.50, 0.70, 0.70, 0.95, &["power_plan_high_performance", "network_throttling_off"], LIGHT_CLEANUP),
        profile("Video Editing", Creative, 0.50, 0.30, 0.90, 0.95, 0.20, THROUGHPUT_TWEAKS, LIGHT_CLEANUP),
    ]
}

/// The fixed fallback for any name the catalog does not know
pub fn balanced_profile() -> WorkloadProfile {
    profile(
        BALANCED_PROFILE,
        WorkloadCategory::Balanced,
        0.60,
        0.55,
        0.70,
        0.50,
        0.50,
        &["power_plan_balanced", "disable_game_dvr"],
        &[],
    )
}

/// Profiles keyed by lowercased name, resolved once per lookup
#[derive(Debug, Clone)]
pub struct ProfileCatalog {
    profiles: HashMap<String, WorkloadProfile>,
    default: WorkloadProfile,
}

impl ProfileCatalog {
    pub fn empty() -> Self {
        Self {
            profiles: HashMap::new(),
            default: balanced_profile(),
        }
    }

    pub fn with_builtin() -> Self {
        let mut catalog = Self::empty();
        for p in builtin_profiles() {
            catalog.insert(p);
        }
        catalog
    }

    pub fn insert(&mut self, profile: WorkloadProfile) {
        self.profiles.insert(profile.name.to_lowercase(), profile);
    }

    pub fn get(&self, name: &str) -> Option<&WorkloadProfile> {
        self.profiles.get(&name.to_lowercase())
    }

    /// Known profile, or the balanced default
    pub fn resolve(&self, name: &str) -> &WorkloadProfile {
        self.get(name).unwrap_or(&self.default)
    }

    pub fn default_profile(&self) -> &WorkloadProfile {
        &self.default
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.profiles.values().map(|p| p.name.clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_known_workloads;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = ProfileCatalog::with_builtin();
        let valorant = catalog.get("VALORANT").unwrap();
        assert_eq!(valorant.name, "Valorant");
        assert_eq!(valorant.cpu_latency_base, 0.95);
        assert_eq!(valorant.input_lag_base, 0.98);
    }

    #[test]
    fn test_unknown_resolves_to_balanced() {
        let catalog = ProfileCatalog::with_builtin();
        let resolved = catalog.resolve("NoSuchGame");
        assert_eq!(resolved.name, BALANCED_PROFILE);
        assert_eq!(resolved.category, WorkloadCategory::Balanced);
        assert!(resolved.close_apps.is_empty());
    }

    #[test]
    fn test_every_known_workload_has_a_profile() {
        let catalog = ProfileCatalog::with_builtin();
        for workload in default_known_workloads() {
            assert!(
                catalog.get(&workload.profile_name).is_some(),
                "missing profile for {}",
                workload.profile_name
            );
        }
    }

    #[test]
    fn test_base_weights_in_range() {
        let catalog = ProfileCatalog::with_builtin();
        for name in catalog.names() {
            let p = catalog.get(&name).unwrap();
            for base in [
                p.cpu_latency_base,
                p.input_lag_base,
                p.gpu_boost_base,
                p.ram_allocation_base,
                p.network_base,
            ] {
                assert!((0.0..=1.0).contains(&base), "{} out of range", name);
            }
        }
    }

    #[test]
    fn test_insert_overrides() {
        let mut catalog = ProfileCatalog::empty();
        assert!(catalog.is_empty());
        let mut custom = balanced_profile();
        custom.name = "Custom".to_string();
        custom.gpu_boost_base = 0.2;
        catalog.insert(custom);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.resolve("custom").gpu_boost_base, 0.2);
    }
}
