use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;

use super::detector::ContextDetector;
use crate::error::{Result, TunerError};
use crate::models::WorkloadContext;
use crate::orchestrator::ProfileOrchestrator;
use crate::persistence::PersistenceSink;

/// What a single detection tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing detected and nothing was active
    Idle,
    Unchanged,
    Applied,
    /// Another apply was in flight; retried on the next tick
    Busy,
    /// Workload exited; the applied profile stays in place
    Cleared,
}

struct SwitchState {
    detector: Arc<ContextDetector>,
    orchestrator: Arc<ProfileOrchestrator>,
    sink: Arc<dyn PersistenceSink>,
    last: Mutex<Option<WorkloadContext>>,
}

impl SwitchState {
    fn tick(&self) -> TickOutcome {
        let current = self.detector.detect_current();
        let last = self.last.lock().clone();

        let Some(context) = current else {
            if last.is_none() {
                return TickOutcome::Idle;
            }
            info!("Workload exited, keeping the current profile");
            self.sink.record_context(None);
            *self.last.lock() = None;
            return TickOutcome::Cleared;
        };

        if last.as_ref().is_some_and(|l| l.same_workload(&context)) {
            return TickOutcome::Unchanged;
        }

        info!("Workload changed to {} (profile {})", context.name, context.profile_name);
        match self.orchestrator.apply(&context, false) {
            Ok(result) => {
                if result.success {
                    info!("Auto-switch applied {}: {}", result.profile_name, result.message);
                } else {
                    warn!("Auto-switch applied {} with errors: {}", result.profile_name, result.message);
                }
            }
            Err(TunerError::PipelineAlreadyRunning) => {
                debug!("Pipeline busy, retrying on the next tick");
                return TickOutcome::Busy;
            }
            Err(e) => warn!("Auto-switch apply failed: {}", e),
        }

        self.sink.record_context(Some(&context));
        *self.last.lock() = Some(context);
        TickOutcome::Applied
    }
}

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Background poller that re-runs detection and applies profiles on change
pub struct AutoSwitchLoop {
    state: Arc<SwitchState>,
    worker: Mutex<Option<Worker>>,
}

impl AutoSwitchLoop {
    pub fn new(
        detector: Arc<ContextDetector>,
        orchestrator: Arc<ProfileOrchestrator>,
        sink: Arc<dyn PersistenceSink>,
    ) -> Self {
        Self {
            state: Arc::new(SwitchState {
                detector,
                orchestrator,
                sink,
                last: Mutex::new(None),
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    pub fn last_context(&self) -> Option<WorkloadContext> {
        self.state.last.lock().clone()
    }

    /// Runs one detection pass on the caller's thread
    pub fn tick(&self) -> TickOutcome {
        self.state.tick()
    }

    /// Starts polling every `interval`; a no-op if already running
    pub fn start(&self, interval: Duration) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let state = self.state.clone();

        let handle = thread::Builder::new()
            .name("tuner-auto-switch".to_string())
            .spawn(move || {
                lower_thread_priority();

                loop {
                    state.tick();
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        // Stop requested or the loop was dropped
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("Auto-switch worker exiting");
            })
            .map_err(|e| TunerError::Config(format!("failed to start auto-switch worker: {}", e)))?;

        info!("Auto-switch started (interval {:?})", interval);
        *worker = Some(Worker {
            stop: stop_tx,
            handle,
        });
        Ok(())
    }

    /// Stops polling and waits for the worker to exit. An apply already in
    /// progress finishes first; a no-op if not running.
    pub fn stop(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };

        let _ = worker.stop.send(());
        if worker.handle.join().is_err() {
            warn!("Auto-switch worker panicked");
        }
        info!("Auto-switch stopped");
    }
}

impl Drop for AutoSwitchLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Keeps polling from competing with the foreground workload
fn lower_thread_priority() {
    #[cfg(windows)]
    {
        use windows_sys::Win32::System::Threading::{
            GetCurrentThread, SetThreadPriority, THREAD_PRIORITY_BELOW_NORMAL,
        };
        unsafe {
            SetThreadPriority(GetCurrentThread(), THREAD_PRIORITY_BELOW_NORMAL);
        }
    }
}
