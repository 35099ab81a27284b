// Profile pipeline: save state, close apps, apply tweaks, optionally schedule a restart
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{error, info, warn};
use parking_lot::Mutex;
use uuid::Uuid;

use super::restart::RestartScheduler;
use super::snapshot::{ClosedApp, SessionSnapshot, SnapshotStore};
use crate::effector::Effector;
use crate::error::{ErrorKind, Result, TunerError};
use crate::models::{
    CancelOutcome, HardwareContext, MachineFacts, Metrics, PipelineResult, PipelineState,
    ScheduledRestart, StepKind, StepOutcome, WorkloadContext, WorkloadProfile,
};
use crate::performance::TelemetrySampler;
use crate::persistence::{LogSink, PersistenceSink};
use crate::profiles::{weights, ProfileCatalog};
use crate::task_monitor::{AppCloser, CloseOutcome};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub restart_grace: Duration,
    pub restart_tweak_id: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            restart_grace: Duration::from_secs(30),
            restart_tweak_id: "system_restart".to_string(),
        }
    }
}

/// Clears the in-flight flag on every exit path
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ProfileOrchestrator {
    sampler: Arc<TelemetrySampler>,
    catalog: ProfileCatalog,
    facts: MachineFacts,
    effector: Arc<dyn Effector>,
    closer: Mutex<AppCloser>,
    restart: RestartScheduler,
    snapshots: Option<SnapshotStore>,
    sink: Arc<dyn PersistenceSink>,
    restart_grace: Duration,
    running: AtomicBool,
    state: Mutex<PipelineState>,
    last_result: Mutex<Option<PipelineResult>>,
}

impl ProfileOrchestrator {
    pub fn new(
        sampler: Arc<TelemetrySampler>,
        effector: Arc<dyn Effector>,
        closer: AppCloser,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            sampler,
            catalog: ProfileCatalog::with_builtin(),
            facts: MachineFacts::default(),
            restart: RestartScheduler::new(effector.clone(), &config.restart_tweak_id),
            effector,
            closer: Mutex::new(closer),
            snapshots: None,
            sink: Arc::new(LogSink),
            restart_grace: config.restart_grace,
            running: AtomicBool::new(false),
            state: Mutex::new(PipelineState::Idle),
            last_result: Mutex::new(None),
        }
    }

    pub fn with_catalog(mut self, catalog: ProfileCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_machine_facts(mut self, facts: MachineFacts) -> Self {
        self.facts = facts;
        self
    }

    pub fn with_snapshots(mut self, store: SnapshotStore) -> Self {
        self.snapshots = Some(store);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn catalog(&self) -> &ProfileCatalog {
        &self.catalog
    }

    pub fn machine_facts(&self) -> MachineFacts {
        self.facts
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Current phase. Between runs this is Scheduled while a restart is pending and
    /// Completed once that restart has fired or been cancelled; otherwise Idle.
    pub fn state(&self) -> PipelineState {
        let state = *self.state.lock();
        if state != PipelineState::Idle {
            return state;
        }
        if self.restart.pending().is_some() {
            return PipelineState::Scheduled;
        }

        let restart_settled = self
            .last_result
            .lock()
            .as_ref()
            .is_some_and(|r| r.state == PipelineState::Scheduled);
        if restart_settled {
            PipelineState::Completed
        } else {
            PipelineState::Idle
        }
    }

    pub fn last_result(&self) -> Option<PipelineResult> {
        self.last_result.lock().clone()
    }

    pub fn pending_restart(&self) -> Option<ScheduledRestart> {
        self.restart.pending()
    }

    pub fn cancel_scheduled_restart(&self) -> CancelOutcome {
        self.restart.cancel()
    }

    fn set_state(&self, state: PipelineState) {
        *self.state.lock() = state;
    }

    /// Runs the full pipeline for `workload`. Only a concurrent run is an error;
    /// a pipeline that fails part way comes back as a result with `success == false`.
    pub fn apply(&self, workload: &WorkloadContext, auto_restart: bool) -> Result<PipelineResult> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TunerError::PipelineAlreadyRunning);
        }
        let _in_flight = InFlight(&self.running);

        let id = Uuid::new_v4().to_string();
        let profile = self.catalog.resolve(&workload.profile_name).clone();
        info!(
            "Applying profile '{}' for {} (auto_restart={})",
            profile.name, workload.name, auto_restart
        );

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.run(&id, workload, &profile, auto_restart)
        }));

        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Pipeline {} aborted: {}", id, message);
                PipelineResult {
                    id,
                    success: false,
                    message: format!("Pipeline aborted: {}", message),
                    workload: workload.name.clone(),
                    profile_name: profile.name.clone(),
                    category: profile.category,
                    state: PipelineState::Failed,
                    steps: Vec::new(),
                    weights: None,
                    restart_deadline: None,
                    error: Some(ErrorKind::Fault),
                    applied_at: Utc::now(),
                }
            }
        };

        self.set_state(PipelineState::Idle);
        self.sink.record_pipeline(&result);
        *self.last_result.lock() = Some(result.clone());
        Ok(result)
    }

    fn run(
        &self,
        id: &str,
        workload: &WorkloadContext,
        profile: &WorkloadProfile,
        auto_restart: bool,
    ) -> PipelineResult {
        let mut steps = Vec::new();

        self.set_state(PipelineState::ClosingApps);
        let metrics = self.sampler.get_metrics();
        let hw = HardwareContext::from_metrics(&metrics, &self.facts);
        let tuning = weights::compute(profile, &hw);

        steps.push(self.save_state(id, workload, profile, &metrics));
        self.close_apps(id, profile, &mut steps);

        self.set_state(PipelineState::Applying);
        let mut failed_tweaks = Vec::new();
        for tweak in &profile.tweaks {
            match self.effector.apply(tweak) {
                Ok(message) => steps.push(StepOutcome::ok(StepKind::Tweak, tweak, message)),
                Err(e) => {
                    warn!("Tweak {} failed: {}", tweak, e);
                    failed_tweaks.push(tweak.clone());
                    steps.push(StepOutcome::failed(StepKind::Tweak, tweak, e.to_string()));
                }
            }
        }

        let applied = profile.tweaks.len() - failed_tweaks.len();
        let mut message = format!(
            "Applied {}/{} tweaks for {}",
            applied,
            profile.tweaks.len(),
            workload.name
        );
        if !failed_tweaks.is_empty() {
            message.push_str(&format!("; failed: {}", failed_tweaks.join(", ")));
        }

        let mut error = if failed_tweaks.is_empty() {
            None
        } else {
            Some(ErrorKind::EffectorFailure)
        };
        let mut state = PipelineState::Completed;
        let mut restart_deadline = None;

        if auto_restart {
            match self.restart.schedule(self.restart_grace) {
                Ok(scheduled) => {
                    state = PipelineState::Scheduled;
                    restart_deadline = Some(scheduled.deadline);
                    steps.push(StepOutcome::ok(
                        StepKind::ScheduleRestart,
                        "restart",
                        format!("restart at {}", scheduled.deadline),
                    ));
                    message.push_str(&format!(
                        ". Restarting in {}s unless cancelled",
                        self.restart_grace.as_secs()
                    ));
                }
                Err(e) => {
                    error!("Could not schedule restart: {}", e);
                    state = PipelineState::Failed;
                    error = Some(e.kind());
                    steps.push(StepOutcome::failed(StepKind::ScheduleRestart, "restart", e.to_string()));
                    message.push_str(&format!(". {}", e));
                }
            }
        } else {
            message.push_str(". A manual restart may be required for some changes");
        }

        self.set_state(state);

        PipelineResult {
            id: id.to_string(),
            success: error.is_none(),
            message,
            workload: workload.name.clone(),
            profile_name: profile.name.clone(),
            category: profile.category,
            state,
            steps,
            weights: Some(tuning),
            restart_deadline,
            error,
            applied_at: Utc::now(),
        }
    }

    fn save_state(
        &self,
        id: &str,
        workload: &WorkloadContext,
        profile: &WorkloadProfile,
        metrics: &Metrics,
    ) -> StepOutcome {
        let Some(store) = &self.snapshots else {
            return StepOutcome::ok(StepKind::SaveState, "snapshot", "snapshots disabled");
        };

        let snapshot = SessionSnapshot {
            id: id.to_string(),
            workload: workload.name.clone(),
            profile_name: profile.name.clone(),
            taken_at: Utc::now(),
            metrics: metrics.clone(),
            planned_closures: profile.close_apps.clone(),
        };

        match store.save(&snapshot) {
            Ok(path) => StepOutcome::ok(StepKind::SaveState, "snapshot", path.to_string_lossy()),
            Err(e) => {
                warn!("Failed to save session snapshot: {}", e);
                StepOutcome::failed(StepKind::SaveState, "snapshot", e.to_string())
            }
        }
    }

    fn close_apps(&self, id: &str, profile: &WorkloadProfile, steps: &mut Vec<StepOutcome>) {
        let mut closed = Vec::new();
        let now = Utc::now().timestamp();
        let mut closer = self.closer.lock();

        for app in &profile.close_apps {
            let report = closer.close(app);
            let step = match &report.outcome {
                CloseOutcome::NotRunning => StepOutcome::ok(StepKind::CloseApp, app, "not running"),
                CloseOutcome::Skipped(reason) => StepOutcome::ok(StepKind::CloseApp, app, format!("skipped: {}", reason)),
                CloseOutcome::Graceful => StepOutcome::ok(StepKind::CloseApp, app, "closed"),
                CloseOutcome::Forced => StepOutcome::ok(StepKind::CloseApp, app, "force-terminated after timeout"),
                CloseOutcome::Failed(reason) => StepOutcome::failed(StepKind::CloseApp, app, reason.clone()),
            };
            if matches!(report.outcome, CloseOutcome::Graceful | CloseOutcome::Forced) {
                closed.extend(report.processes.iter().map(|p| ClosedApp::from_process(p, now)));
            }
            steps.push(step);
        }

        if let Some(store) = &self.snapshots {
            if !closed.is_empty() {
                if let Err(e) = store.record_closed(id, closed) {
                    warn!("Failed to update restore list: {}", e);
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
