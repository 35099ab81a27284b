// Performance monitoring module
pub mod counters;
pub mod gpu;
pub mod history;
pub mod machine;
pub mod sampler;
pub mod sensors;

pub use counters::{CounterReading, CounterSource, SysinfoCounters};
pub use gpu::{is_nvidia_available, HardwareSensorProvider, NvidiaGpu};
pub use history::MetricsHistory;
pub use machine::detect_machine_facts;
pub use sampler::{MetricsObserver, SamplerConfig, TelemetrySampler};
pub use sensors::{HardwareKind, SensorHandle, SensorKind, SensorProvider, SensorReading};
