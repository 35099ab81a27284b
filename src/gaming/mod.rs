// Workload detection, auto-switching and bottleneck analysis
pub mod auto_switch;
pub mod bottleneck;
pub mod detector;

pub use auto_switch::{AutoSwitchLoop, TickOutcome};
pub use bottleneck::BottleneckAnalyzer;
pub use detector::{ContextDetector, ProcessEntry, ProcessLister, SysinfoProcessLister};
