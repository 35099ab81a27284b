// Workload detection and bottleneck data structures
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the current workload was chosen
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    Auto,
    Manual,
}

/// The workload the user is currently running
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadContext {
    pub name: String,
    pub profile_name: String,
    pub detected_at: DateTime<Utc>,
    pub source: ContextSource,
}

impl WorkloadContext {
    pub fn new(name: &str, profile_name: &str, source: ContextSource) -> Self {
        Self {
            name: name.to_string(),
            profile_name: profile_name.to_string(),
            detected_at: Utc::now(),
            source,
        }
    }

    /// Same workload regardless of when it was observed
    pub fn same_workload(&self, other: &WorkloadContext) -> bool {
        self.name == other.name
            && self.profile_name == other.profile_name
            && self.source == other.source
    }
}

/// Executable name mapped to a workload and its profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnownWorkload {
    pub process_name: String,   // Executable file name (e.g., "VALORANT-Win64-Shipping.exe")
    pub name: String,           // Display name for the workload
    pub profile_name: String,   // Catalog profile applied when detected
}

impl KnownWorkload {
    pub fn new(process_name: &str, name: &str, profile_name: &str) -> Self {
        Self {
            process_name: process_name.to_string(),
            name: name.to_string(),
            profile_name: profile_name.to_string(),
        }
    }
}

pub fn default_known_workloads() -> Vec<KnownWorkload> {
    vec![
        KnownWorkload::new("VALORANT-Win64-Shipping.exe", "Valorant", "Valorant"),
        KnownWorkload::new("cs2.exe", "Counter-Strike 2", "Counter-Strike 2"),
        KnownWorkload::new("League of Legends.exe", "League of Legends", "League of Legends"),
        KnownWorkload::new("r5apex.exe", "Apex Legends", "Apex Legends"),
        KnownWorkload::new("Overwatch.exe", "Overwatch 2", "Overwatch 2"),
        KnownWorkload::new("FortniteClient-Win64-Shipping.exe", "Fortnite", "Fortnite"),
        KnownWorkload::new("GenshinImpact.exe", "Genshin Impact", "Genshin Impact"),
        KnownWorkload::new("TslGame.exe", "PUBG", "PUBG"),
        KnownWorkload::new("dota2.exe", "Dota 2", "Dota 2"),
        KnownWorkload::new("Cyberpunk2077.exe", "Cyberpunk 2077", "Cyberpunk 2077"),
        KnownWorkload::new("obs64.exe", "OBS Studio", "Streaming"),
        KnownWorkload::new("Resolve.exe", "DaVinci Resolve", "Video Editing"),
    ]
}

/// Bottleneck type classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BottleneckType {
    CpuBound,       // CPU at high usage, GPU underutilized
    GpuBound,       // GPU at high usage, CPU underutilized
    RamLimited,     // High RAM usage
    CpuThermal,     // CPU thermal throttling
    GpuThermal,     // GPU thermal throttling
    Balanced,       // No bottleneck - system is balanced
}

/// Current bottleneck status for a single metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BottleneckStatus {
    pub bottleneck_type: BottleneckType,
    pub severity: u8,                   // Severity level (0-3, where 3 is most severe)
    pub timestamp: i64,
}

/// Bottleneck detection thresholds (configurable)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BottleneckThresholds {
    pub cpu_high: f32,              // CPU considered bottleneck when above (default: 90)
    pub gpu_high: f32,              // GPU considered bottleneck when above (default: 90)
    pub cpu_low: f32,               // CPU considered underutilized below (default: 70)
    pub gpu_low: f32,               // GPU considered underutilized below (default: 70)
    pub ram_high: f32,              // RAM considered limiting above (default: 90)
    pub cpu_thermal_limit: f32,     // CPU throttling temperature (default: 90)
    pub gpu_thermal_limit: f32,     // GPU throttling temperature (default: 85)
}

impl Default for BottleneckThresholds {
    fn default() -> Self {
        Self {
            cpu_high: 90.0,
            gpu_high: 90.0,
            cpu_low: 70.0,
            gpu_low: 70.0,
            ram_high: 90.0,
            cpu_thermal_limit: 90.0,
            gpu_thermal_limit: 85.0,
        }
    }
}
