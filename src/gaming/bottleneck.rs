// Bottleneck detection and analysis module
// Classifies each metrics snapshot and logs when the classification changes

use log::{info, warn};
use parking_lot::Mutex;

use crate::models::{BottleneckStatus, BottleneckThresholds, BottleneckType, Metrics};
use crate::performance::MetricsObserver;

/// Bottleneck analyzer with configurable thresholds
pub struct BottleneckAnalyzer {
    thresholds: BottleneckThresholds,
    last: Mutex<Option<BottleneckStatus>>,
}

impl BottleneckAnalyzer {
    pub fn with_thresholds(thresholds: BottleneckThresholds) -> Self {
        Self {
            thresholds,
            last: Mutex::new(None),
        }
    }

    pub fn thresholds(&self) -> &BottleneckThresholds {
        &self.thresholds
    }

    /// Most recent classification, if any snapshot was observed
    pub fn last_status(&self) -> Option<BottleneckStatus> {
        self.last.lock().clone()
    }

    pub fn analyze(&self, metrics: &Metrics) -> BottleneckStatus {
        let (bottleneck_type, severity) = self.detect_bottleneck(metrics);

        BottleneckStatus {
            bottleneck_type,
            severity,
            timestamp: metrics.timestamp,
        }
    }

    /// Priority order: CPU Thermal > GPU Thermal > RAM > CPU-Bound > GPU-Bound > Balanced
    fn detect_bottleneck(&self, metrics: &Metrics) -> (BottleneckType, u8) {
        if let Some(temp) = metrics.cpu_temp_c {
            if temp >= self.thresholds.cpu_thermal_limit {
                let over = temp - self.thresholds.cpu_thermal_limit;
                return (BottleneckType::CpuThermal, calculate_thermal_severity(over));
            }
        }

        if let Some(temp) = metrics.gpu_temp_c {
            if temp >= self.thresholds.gpu_thermal_limit {
                let over = temp - self.thresholds.gpu_thermal_limit;
                return (BottleneckType::GpuThermal, calculate_thermal_severity(over));
            }
        }

        if metrics.ram_percent >= self.thresholds.ram_high {
            let over = metrics.ram_percent - self.thresholds.ram_high;
            return (BottleneckType::RamLimited, calculate_usage_severity(over));
        }

        // gpu_percent reads 0 without a GPU sensor, so only trust it alongside a GPU temperature
        if metrics.gpu_temp_c.is_some() {
            let gpu = metrics.gpu_percent;

            if metrics.cpu_percent >= self.thresholds.cpu_high && gpu < self.thresholds.gpu_low {
                let delta = metrics.cpu_percent - gpu;
                return (BottleneckType::CpuBound, calculate_bound_severity(delta));
            }

            if gpu >= self.thresholds.gpu_high && metrics.cpu_percent < self.thresholds.cpu_low {
                let delta = gpu - metrics.cpu_percent;
                return (BottleneckType::GpuBound, calculate_bound_severity(delta));
            }
        }

        (BottleneckType::Balanced, 0)
    }

    pub fn description(bottleneck_type: BottleneckType) -> &'static str {
        match bottleneck_type {
            BottleneckType::CpuBound => "CPU is limiting performance - GPU is underutilized",
            BottleneckType::GpuBound => "GPU is limiting performance - CPU is underutilized",
            BottleneckType::RamLimited => "System memory is nearly full",
            BottleneckType::CpuThermal => "CPU is thermal throttling",
            BottleneckType::GpuThermal => "GPU is thermal throttling",
            BottleneckType::Balanced => "System is balanced - no bottlenecks detected",
        }
    }
}

impl Default for BottleneckAnalyzer {
    fn default() -> Self {
        Self::with_thresholds(BottleneckThresholds::default())
    }
}

impl MetricsObserver for BottleneckAnalyzer {
    fn observe(&self, metrics: &Metrics) -> Result<(), String> {
        let status = self.analyze(metrics);
        let mut last = self.last.lock();

        let changed = last
            .as_ref()
            .map_or(true, |prev| prev.bottleneck_type != status.bottleneck_type);

        if changed {
            match status.bottleneck_type {
                BottleneckType::Balanced => info!("{}", Self::description(status.bottleneck_type)),
                kind => warn!("{} (severity {})", Self::description(kind), status.severity),
            }
        }

        *last = Some(status);
        Ok(())
    }
}

/// Severity by degrees over the limit: <5 -> 1, <10 -> 2, else 3
fn calculate_thermal_severity(degrees_over: f32) -> u8 {
    if degrees_over >= 10.0 {
        3
    } else if degrees_over >= 5.0 {
        2
    } else {
        1
    }
}

/// Severity by percentage points over the threshold: <4 -> 1, <8 -> 2, else 3
fn calculate_usage_severity(percent_over: f32) -> u8 {
    if percent_over >= 8.0 {
        3
    } else if percent_over >= 4.0 {
        2
    } else {
        1
    }
}

/// Severity by the CPU/GPU utilization gap: <25 -> 1, <40 -> 2, else 3
fn calculate_bound_severity(delta: f32) -> u8 {
    if delta >= 40.0 {
        3
    } else if delta >= 25.0 {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_metrics(cpu: f32, gpu: f32, ram: f32, gpu_temp: Option<f32>) -> Metrics {
        Metrics {
            timestamp: chrono::Utc::now().timestamp_millis(),
            cpu_percent: cpu,
            gpu_percent: gpu,
            ram_percent: ram,
            gpu_temp_c: gpu_temp,
            ..Default::default()
        }
    }

    #[test]
    fn test_balanced_system() {
        let analyzer = BottleneckAnalyzer::default();
        let status = analyzer.analyze(&create_test_metrics(50.0, 50.0, 50.0, Some(60.0)));
        assert_eq!(status.bottleneck_type, BottleneckType::Balanced);
        assert_eq!(status.severity, 0);
    }

    #[test]
    fn test_cpu_bound() {
        let analyzer = BottleneckAnalyzer::default();
        let status = analyzer.analyze(&create_test_metrics(95.0, 40.0, 50.0, Some(60.0)));
        assert_eq!(status.bottleneck_type, BottleneckType::CpuBound);
        assert_eq!(status.severity, 3);
    }

    #[test]
    fn test_gpu_bound() {
        let analyzer = BottleneckAnalyzer::default();
        let status = analyzer.analyze(&create_test_metrics(40.0, 95.0, 50.0, Some(60.0)));
        assert_eq!(status.bottleneck_type, BottleneckType::GpuBound);
    }

    #[test]
    fn test_no_gpu_sensor_is_not_cpu_bound() {
        let analyzer = BottleneckAnalyzer::default();
        let status = analyzer.analyze(&create_test_metrics(95.0, 0.0, 50.0, None));
        assert_eq!(status.bottleneck_type, BottleneckType::Balanced);
    }

    #[test]
    fn test_ram_limited() {
        let analyzer = BottleneckAnalyzer::default();
        let status = analyzer.analyze(&create_test_metrics(50.0, 50.0, 95.0, None));
        assert_eq!(status.bottleneck_type, BottleneckType::RamLimited);
        assert_eq!(status.severity, 2);
    }

    #[test]
    fn test_thermal_takes_priority() {
        let analyzer = BottleneckAnalyzer::default();
        let status = analyzer.analyze(&create_test_metrics(95.0, 40.0, 95.0, Some(97.0)));
        assert_eq!(status.bottleneck_type, BottleneckType::GpuThermal);
        assert_eq!(status.severity, 3);
    }

    #[test]
    fn test_observer_records_last_status() {
        let analyzer = BottleneckAnalyzer::default();
        assert!(analyzer.last_status().is_none());

        analyzer.observe(&create_test_metrics(50.0, 50.0, 95.0, None)).unwrap();
        assert_eq!(
            analyzer.last_status().unwrap().bottleneck_type,
            BottleneckType::RamLimited
        );
    }
}
