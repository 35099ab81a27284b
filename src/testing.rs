// Mock collaborators shared by unit tests
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::effector::Effector;
use crate::error::{Result, TunerError};
use crate::gaming::{ProcessEntry, ProcessLister};
use crate::models::MonitoringMode;
use crate::orchestrator::{OrchestratorConfig, ProfileOrchestrator};
use crate::performance::{
    CounterReading, CounterSource, SamplerConfig, SensorHandle, SensorProvider, TelemetrySampler,
};
use crate::task_monitor::{AppCloser, AppController, AppProcess};

const GB: u64 = 1_073_741_824;

/// 35% CPU, 4 of 8 GB RAM
pub struct FixedCounters;

impl CounterSource for FixedCounters {
    fn refresh(&mut self) -> CounterReading {
        CounterReading::from_bytes(35.0, 4 * GB, 8 * GB)
    }
}

pub struct NoSensors;

impl SensorProvider for NoSensors {
    fn open(&mut self) -> Result<Box<dyn SensorHandle>> {
        Err(TunerError::SensorUnavailable("no sensors in tests".to_string()))
    }
}

pub fn sampler() -> Arc<TelemetrySampler> {
    let config = SamplerConfig {
        initial_mode: MonitoringMode::Active,
        ..Default::default()
    };
    Arc::new(TelemetrySampler::new(config, Box::new(FixedCounters), Box::new(NoSensors)))
}

/// Nothing is running, so every close is a no-op
pub struct EmptyDesktop;

impl AppController for EmptyDesktop {
    fn find(&mut self, _name: &str) -> Vec<AppProcess> {
        Vec::new()
    }
    fn request_close(&mut self, _pid: u32) -> Result<()> {
        Ok(())
    }
    fn is_running(&mut self, _pid: u32) -> bool {
        false
    }
    fn force_terminate(&mut self, _pid: u32) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingEffector {
    pub applied: Mutex<Vec<String>>,
    pub failing: HashSet<String>,
    pub panicking: Option<String>,
}

impl RecordingEffector {
    pub fn calls_to(&self, tweak_id: &str) -> usize {
        self.applied.lock().iter().filter(|t| *t == tweak_id).count()
    }

    pub fn total_calls(&self) -> usize {
        self.applied.lock().len()
    }
}

impl Effector for RecordingEffector {
    fn apply(&self, tweak_id: &str) -> Result<String> {
        self.applied.lock().push(tweak_id.to_string());
        if self.panicking.as_deref() == Some(tweak_id) {
            panic!("effector blew up on {}", tweak_id);
        }
        if self.failing.contains(tweak_id) {
            return Err(TunerError::EffectorFailure {
                tweak_id: tweak_id.to_string(),
                message: "registry locked".to_string(),
            });
        }
        Ok(format!("applied {}", tweak_id))
    }
}

/// Blocks inside every tweak until released. Dropping the release sender
/// lets all remaining tweaks through.
pub struct GateEffector {
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl GateEffector {
    /// Returns the effector, a receiver signalled on entry and the release sender
    pub fn new() -> (Self, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let effector = Self {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        };
        (effector, entered_rx, release_tx)
    }
}

impl Effector for GateEffector {
    fn apply(&self, _tweak_id: &str) -> Result<String> {
        let _ = self.entered.lock().send(());
        let _ = self.release.lock().recv();
        Ok("ok".to_string())
    }
}

/// Process table the test edits between scans
#[derive(Clone, Default)]
pub struct SharedLister {
    table: Arc<Mutex<Vec<&'static str>>>,
}

impl SharedLister {
    pub fn set(&self, exes: &[&'static str]) {
        *self.table.lock() = exes.to_vec();
    }
}

impl ProcessLister for SharedLister {
    fn list(&mut self) -> Vec<Result<ProcessEntry>> {
        self.table
            .lock()
            .iter()
            .enumerate()
            .map(|(i, exe)| {
                Ok(ProcessEntry {
                    pid: i as u32 + 100,
                    exe_path: PathBuf::from(exe),
                })
            })
            .collect()
    }
}

pub fn orchestrator(effector: Arc<dyn Effector>, grace: Duration) -> ProfileOrchestrator {
    let closer = AppCloser::new(
        Box::new(EmptyDesktop),
        &[],
        Duration::from_millis(50),
        Duration::from_millis(10),
    );
    let config = OrchestratorConfig {
        restart_grace: grace,
        restart_tweak_id: "system_restart".to_string(),
    };
    ProfileOrchestrator::new(sampler(), effector, closer, config)
}
