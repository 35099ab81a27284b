// Graceful app shutdown with a bounded wait before force-termination
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessRefreshKind, System, UpdateKind};

use super::categorizer::protected_category;
use crate::error::{Result, TunerError};

#[cfg(windows)]
use std::os::windows::process::CommandExt;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// A running instance of an app
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppProcess {
    pub pid: u32,
    pub name: String,
    pub exe_path: Option<PathBuf>,
}

pub trait AppController: Send {
    /// Running processes whose executable name matches, case-insensitively
    fn find(&mut self, name: &str) -> Vec<AppProcess>;
    /// Asks the process to exit on its own
    fn request_close(&mut self, pid: u32) -> Result<()>;
    fn is_running(&mut self, pid: u32) -> bool;
    fn force_terminate(&mut self, pid: u32) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CloseOutcome {
    NotRunning,
    /// Essential or protected; never touched
    Skipped(String),
    Graceful,
    Forced,
    Failed(String),
}

impl CloseOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, CloseOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseReport {
    pub app: String,
    pub outcome: CloseOutcome,
    pub processes: Vec<AppProcess>,
}

pub struct AppCloser {
    controller: Box<dyn AppController>,
    essential: Vec<String>,
    timeout: Duration,
    poll: Duration,
}

impl AppCloser {
    pub fn new(
        controller: Box<dyn AppController>,
        essential_apps: &[String],
        timeout: Duration,
        poll: Duration,
    ) -> Self {
        Self {
            controller,
            essential: essential_apps.iter().map(|a| a.to_lowercase()).collect(),
            timeout,
            poll: poll.max(Duration::from_millis(1)),
        }
    }

    pub fn is_essential(&self, app: &str) -> bool {
        let app = app.to_lowercase();
        self.essential.iter().any(|e| *e == app)
    }

    /// Closes every instance of `app`: graceful request first, force only after the timeout
    pub fn close(&mut self, app: &str) -> CloseReport {
        let report = |outcome, processes| CloseReport {
            app: app.to_string(),
            outcome,
            processes,
        };

        if self.is_essential(app) {
            return report(CloseOutcome::Skipped("essential app".to_string()), Vec::new());
        }
        if let Some(category) = protected_category(app, None) {
            return report(
                CloseOutcome::Skipped(format!("protected ({})", category.display_name())),
                Vec::new(),
            );
        }

        let processes: Vec<AppProcess> = self
            .controller
            .find(app)
            .into_iter()
            .filter(|p| {
                let path = p.exe_path.as_ref().map(|e| e.to_string_lossy().to_string());
                protected_category(&p.name, path.as_deref()).is_none()
            })
            .collect();

        if processes.is_empty() {
            return report(CloseOutcome::NotRunning, processes);
        }

        for process in &processes {
            if let Err(e) = self.controller.request_close(process.pid) {
                debug!("Graceful close of {} ({}) failed: {}", app, process.pid, e);
            }
        }

        let deadline = Instant::now() + self.timeout;
        let mut remaining: Vec<u32> = processes.iter().map(|p| p.pid).collect();
        loop {
            remaining.retain(|pid| self.controller.is_running(*pid));
            if remaining.is_empty() {
                info!("Closed {} gracefully", app);
                return report(CloseOutcome::Graceful, processes);
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(self.poll.min(deadline - now));
        }

        warn!(
            "{} still running after {:?}, force-terminating {} process(es)",
            app,
            self.timeout,
            remaining.len()
        );

        let mut errors = Vec::new();
        for pid in remaining {
            if let Err(e) = self.controller.force_terminate(pid) {
                errors.push(e.to_string());
            }
        }

        if errors.is_empty() {
            report(CloseOutcome::Forced, processes)
        } else {
            report(CloseOutcome::Failed(errors.join("; ")), processes)
        }
    }
}

/// App controller backed by sysinfo
pub struct SysinfoAppController {
    system: System,
}

impl SysinfoAppController {
    pub fn new() -> Self {
        Self { system: System::new() }
    }

    fn refresh_all(&mut self) {
        self.system
            .refresh_processes_specifics(ProcessRefreshKind::new().with_exe(UpdateKind::OnlyIfNotSet));
    }
}

impl Default for SysinfoAppController {
    fn default() -> Self {
        Self::new()
    }
}

impl AppController for SysinfoAppController {
    fn find(&mut self, name: &str) -> Vec<AppProcess> {
        self.refresh_all();
        let target = name.to_lowercase();

        self.system
            .processes()
            .iter()
            .filter(|(_, p)| p.name().to_lowercase() == target)
            .map(|(pid, p)| AppProcess {
                pid: pid.as_u32(),
                name: p.name().to_string(),
                exe_path: p.exe().map(|e| e.to_path_buf()),
            })
            .collect()
    }

    #[cfg(windows)]
    fn request_close(&mut self, pid: u32) -> Result<()> {
        // taskkill without /F posts WM_CLOSE to the app's windows
        let status = std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string()])
            .creation_flags(CREATE_NO_WINDOW)
            .output()
            .map_err(|_| TunerError::ProcessAccessDenied { pid })?;

        if status.status.success() {
            Ok(())
        } else {
            Err(TunerError::ProcessAccessDenied { pid })
        }
    }

    #[cfg(not(windows))]
    fn request_close(&mut self, pid: u32) -> Result<()> {
        let process = self
            .system
            .process(Pid::from_u32(pid))
            .ok_or(TunerError::ProcessAccessDenied { pid })?;

        match process.kill_with(sysinfo::Signal::Term) {
            Some(true) => Ok(()),
            _ => Err(TunerError::ProcessAccessDenied { pid }),
        }
    }

    fn is_running(&mut self, pid: u32) -> bool {
        self.system.refresh_process(Pid::from_u32(pid))
    }

    #[cfg(windows)]
    fn force_terminate(&mut self, pid: u32) -> Result<()> {
        use windows_sys::Win32::Foundation::CloseHandle;
        use windows_sys::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

        unsafe {
            let handle = OpenProcess(PROCESS_TERMINATE, 0, pid);
            if handle.is_null() {
                return Err(TunerError::ProcessAccessDenied { pid });
            }

            let result = TerminateProcess(handle, 1);
            CloseHandle(handle);

            if result == 0 {
                return Err(TunerError::ProcessAccessDenied { pid });
            }
        }

        Ok(())
    }

    #[cfg(not(windows))]
    fn force_terminate(&mut self, pid: u32) -> Result<()> {
        match self.system.process(Pid::from_u32(pid)) {
            Some(process) if process.kill() => Ok(()),
            Some(_) => Err(TunerError::ProcessAccessDenied { pid }),
            // Exited between the check and the kill
            None => Ok(()),
        }
    }
}
