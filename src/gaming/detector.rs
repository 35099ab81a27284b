use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info};
use parking_lot::Mutex;
use sysinfo::{ProcessRefreshKind, System, UpdateKind};

use crate::error::{Result, TunerError};
use crate::models::{default_known_workloads, ContextSource, KnownWorkload, WorkloadContext};

/// A live process as seen by a lister
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub exe_path: PathBuf,
}

/// Enumerates live processes. Entries the caller may not inspect come back as
/// `ProcessAccessDenied` and are skipped by the detector.
pub trait ProcessLister: Send {
    fn list(&mut self) -> Vec<Result<ProcessEntry>>;
}

/// Process lister backed by sysinfo
pub struct SysinfoProcessLister {
    system: System,
}

impl SysinfoProcessLister {
    pub fn new() -> Self {
        Self { system: System::new() }
    }
}

impl Default for SysinfoProcessLister {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLister for SysinfoProcessLister {
    fn list(&mut self) -> Vec<Result<ProcessEntry>> {
        self.system.refresh_processes_specifics(
            ProcessRefreshKind::new().with_exe(UpdateKind::OnlyIfNotSet),
        );

        self.system
            .processes()
            .iter()
            .map(|(pid, process)| {
                let pid = pid.as_u32();
                // The exe path needs more rights than the name; the name is the file name
                match process.exe() {
                    Some(path) => Ok(ProcessEntry {
                        pid,
                        exe_path: path.to_path_buf(),
                    }),
                    None if !process.name().is_empty() => Ok(ProcessEntry {
                        pid,
                        exe_path: PathBuf::from(process.name()),
                    }),
                    None => Err(TunerError::ProcessAccessDenied { pid }),
                }
            })
            .collect()
    }
}

/// Lowercased executable file name used as the known-workload key.
/// Both separators are accepted so Windows paths resolve on any host.
pub fn executable_key(path: &Path) -> Option<String> {
    let raw = path.to_string_lossy();
    let name = raw
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() {
        None
    } else {
        Some(name.to_lowercase())
    }
}

struct DetectorState {
    known: HashMap<String, KnownWorkload>,
    /// When each running known workload was first seen in its current streak
    first_seen: HashMap<String, DateTime<Utc>>,
    manual: Option<WorkloadContext>,
}

/// Identifies the active workload from the live process list
pub struct ContextDetector {
    lister: Mutex<Box<dyn ProcessLister>>,
    state: Mutex<DetectorState>,
}

impl ContextDetector {
    pub fn new(lister: Box<dyn ProcessLister>) -> Self {
        let detector = Self {
            lister: Mutex::new(lister),
            state: Mutex::new(DetectorState {
                known: HashMap::new(),
                first_seen: HashMap::new(),
                manual: None,
            }),
        };
        for workload in default_known_workloads() {
            detector.insert_known(workload);
        }
        detector
    }

    fn insert_known(&self, workload: KnownWorkload) -> bool {
        let Some(key) = executable_key(Path::new(&workload.process_name)) else {
            return false;
        };
        self.state.lock().known.insert(key, workload);
        true
    }

    /// Adds or replaces an executable -> workload mapping at runtime
    pub fn register_workload(&self, exe: &str, name: &str, profile_name: &str) -> Result<()> {
        let workload = KnownWorkload::new(exe, name, profile_name);
        if !self.insert_known(workload) {
            return Err(TunerError::Config(format!("invalid executable name '{}'", exe)));
        }
        info!("Registered workload {} ({}) -> profile {}", name, exe, profile_name);
        Ok(())
    }

    pub fn known_workloads(&self) -> Vec<KnownWorkload> {
        let mut workloads: Vec<KnownWorkload> = self.state.lock().known.values().cloned().collect();
        workloads.sort_by(|a, b| a.name.cmp(&b.name));
        workloads
    }

    /// Pins a manual context and suspends scanning until auto-detect is re-enabled
    pub fn select_manually(&self, name: &str) -> WorkloadContext {
        let mut state = self.state.lock();
        let profile_name = state
            .known
            .values()
            .find(|w| w.name.eq_ignore_ascii_case(name))
            .map(|w| w.profile_name.clone())
            .unwrap_or_else(|| name.to_string());

        let context = WorkloadContext::new(name, &profile_name, ContextSource::Manual);
        info!("Manual workload selected: {} (profile {})", name, profile_name);
        state.manual = Some(context.clone());
        context
    }

    pub fn enable_auto_detect(&self) {
        let mut state = self.state.lock();
        if state.manual.take().is_some() {
            info!("Auto-detect re-enabled");
        }
    }

    pub fn is_manual(&self) -> bool {
        self.state.lock().manual.is_some()
    }

    pub fn detect_current(&self) -> Option<WorkloadContext> {
        self.scan_at(Utc::now())
    }

    fn scan_at(&self, now: DateTime<Utc>) -> Option<WorkloadContext> {
        if let Some(manual) = self.state.lock().manual.clone() {
            return Some(manual);
        }

        let entries = self.lister.lock().list();

        let mut state = self.state.lock();
        // Known workloads in scan order, first occurrence only
        let mut running: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut denied = 0usize;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(_) => {
                    denied += 1;
                    continue;
                }
            };
            let Some(key) = executable_key(&entry.exe_path) else {
                continue;
            };
            if state.known.contains_key(&key) && seen.insert(key.clone()) {
                running.push(key);
            }
        }

        if denied > 0 {
            debug!("Skipped {} inaccessible processes", denied);
        }

        state.first_seen.retain(|key, _| seen.contains(key));
        for key in &running {
            state.first_seen.entry(key.clone()).or_insert(now);
        }

        let mut best: Option<(&String, DateTime<Utc>)> = None;
        for key in &running {
            let first_seen = state.first_seen.get(key).copied().unwrap_or(now);
            match best {
                Some((_, current)) if first_seen < current => {}
                _ => best = Some((key, first_seen)),
            }
        }

        let (key, detected_at) = best?;
        let workload = state.known.get(key)?;
        Some(WorkloadContext {
            name: workload.name.clone(),
            profile_name: workload.profile_name.clone(),
            detected_at,
            source: ContextSource::Auto,
        })
    }
}
