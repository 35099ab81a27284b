// Cheap system counters (CPU usage, memory) via sysinfo
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

const BYTES_PER_GB: f64 = 1_073_741_824.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CounterReading {
    pub cpu_percent: f32,
    pub ram_used_gb: f64,
    pub ram_total_gb: f64,
    pub ram_percent: f32,
}

impl CounterReading {
    pub fn from_bytes(cpu_percent: f32, used_bytes: u64, total_bytes: u64) -> Self {
        let ram_percent = if total_bytes > 0 {
            (used_bytes as f64 / total_bytes as f64 * 100.0) as f32
        } else {
            0.0
        };

        Self {
            cpu_percent,
            ram_used_gb: used_bytes as f64 / BYTES_PER_GB,
            ram_total_gb: total_bytes as f64 / BYTES_PER_GB,
            ram_percent,
        }
    }
}

/// Process-independent counters that are cheap enough to read in any non-paused mode
pub trait CounterSource: Send {
    fn refresh(&mut self) -> CounterReading;
}

pub struct SysinfoCounters {
    system: System,
}

impl SysinfoCounters {
    pub fn new() -> Self {
        // Only request cpu_usage - frequency polling adds overhead for data we don't need
        let mut system = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::new().with_cpu_usage())
                .with_memory(MemoryRefreshKind::everything()),
        );
        // Prime the CPU counters so the first real refresh has a baseline
        system.refresh_cpu();
        Self { system }
    }
}

impl Default for SysinfoCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSource for SysinfoCounters {
    fn refresh(&mut self) -> CounterReading {
        self.system.refresh_cpu();
        self.system.refresh_memory();

        let cpus = self.system.cpus();
        let cpu_percent = if cpus.is_empty() {
            0.0
        } else {
            cpus.iter().map(|cpu| cpu.cpu_usage()).sum::<f32>() / cpus.len() as f32
        };

        CounterReading::from_bytes(
            cpu_percent,
            self.system.used_memory(),
            self.system.total_memory(),
        )
    }
}
