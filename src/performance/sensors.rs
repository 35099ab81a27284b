// Hardware sensor abstraction
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HardwareKind {
    Cpu,
    Gpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorKind {
    Load,
    Temperature,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub hardware: HardwareKind,
    pub sensor: SensorKind,
    pub value: f32,
}

impl SensorReading {
    pub fn new(hardware: HardwareKind, sensor: SensorKind, value: f32) -> Self {
        Self {
            hardware,
            sensor,
            value,
        }
    }
}

/// Source of expensive hardware readings. Opening returns a handle whose
/// drop releases the underlying driver resources.
pub trait SensorProvider: Send {
    fn open(&mut self) -> Result<Box<dyn SensorHandle>>;
}

pub trait SensorHandle: Send {
    /// Polls the hardware for fresh values
    fn update(&mut self) -> Result<()>;

    /// Values captured by the last successful update
    fn read(&self) -> Result<Vec<SensorReading>>;
}

/// Hardware fields of a metrics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HardwareValues {
    pub gpu_percent: Option<f32>,
    pub gpu_temp_c: Option<f32>,
    pub cpu_temp_c: Option<f32>,
}

impl HardwareValues {
    /// Folds raw readings into snapshot fields. Multiple CPU temperatures keep the hottest.
    pub fn from_readings(readings: &[SensorReading]) -> Self {
        let mut values = HardwareValues::default();
        for reading in readings {
            if !reading.value.is_finite() {
                continue;
            }
            match (reading.hardware, reading.sensor) {
                (HardwareKind::Gpu, SensorKind::Load) => values.gpu_percent = Some(reading.value),
                (HardwareKind::Gpu, SensorKind::Temperature) => {
                    values.gpu_temp_c = Some(reading.value)
                }
                (HardwareKind::Cpu, SensorKind::Temperature) => {
                    values.cpu_temp_c = Some(
                        values
                            .cpu_temp_c
                            .map_or(reading.value, |t| t.max(reading.value)),
                    )
                }
                (HardwareKind::Cpu, SensorKind::Load) => {}
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_readings() {
        let readings = vec![
            SensorReading::new(HardwareKind::Gpu, SensorKind::Load, 64.0),
            SensorReading::new(HardwareKind::Gpu, SensorKind::Temperature, 71.0),
            SensorReading::new(HardwareKind::Cpu, SensorKind::Temperature, 55.0),
            SensorReading::new(HardwareKind::Cpu, SensorKind::Temperature, 68.0),
            SensorReading::new(HardwareKind::Cpu, SensorKind::Temperature, f32::NAN),
        ];

        let values = HardwareValues::from_readings(&readings);
        assert_eq!(values.gpu_percent, Some(64.0));
        assert_eq!(values.gpu_temp_c, Some(71.0));
        assert_eq!(values.cpu_temp_c, Some(68.0));
    }

    #[test]
    fn test_fold_empty() {
        assert_eq!(HardwareValues::from_readings(&[]), HardwareValues::default());
    }
}
