// Explicit application context: owns every component and exposes the control surface
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::config::initialize_app_data;
use crate::effector::{CommandEffector, DryRunEffector, Effector};
use crate::error::Result;
use crate::gaming::{AutoSwitchLoop, BottleneckAnalyzer, ContextDetector, ProcessLister, SysinfoProcessLister};
use crate::models::{
    BottleneckStatus, CancelOutcome, HardwareContext, KnownWorkload, MachineFacts, Metrics,
    MonitoringMode, PipelineResult, PipelineState, Settings, TuningWeights, WorkloadContext,
};
use crate::orchestrator::{OrchestratorConfig, ProfileOrchestrator, SnapshotStore};
use crate::performance::{
    detect_machine_facts, is_nvidia_available, CounterSource, HardwareSensorProvider, SamplerConfig,
    SensorProvider, SysinfoCounters, TelemetrySampler,
};
use crate::persistence::{JsonFileSink, LogSink, PersistenceSink, SinkObserver, SinkSet};
use crate::profiles::WeightCalculator;
use crate::task_monitor::{AppCloser, AppController, SysinfoAppController};
use crate::utils::AppPaths;

/// Minimum spacing between metrics written to the JSON log
const METRICS_PERSIST_SPACING_MS: i64 = 60_000;

/// External collaborators, swappable for tests
pub struct TunerParts {
    pub counters: Box<dyn CounterSource>,
    pub sensors: Box<dyn SensorProvider>,
    pub lister: Box<dyn ProcessLister>,
    pub controller: Box<dyn AppController>,
    pub effector: Arc<dyn Effector>,
    pub sink: Arc<dyn PersistenceSink>,
    pub facts: MachineFacts,
}

impl TunerParts {
    /// sysinfo, NVML and the configured effector; log plus JSON file persistence
    pub fn system(settings: &Settings, paths: &AppPaths) -> Self {
        let effector: Arc<dyn Effector> = if settings.dry_run {
            info!("Dry run enabled, tweaks will only be logged");
            Arc::new(DryRunEffector)
        } else {
            Arc::new(CommandEffector::new(settings.tweak_commands.clone()))
        };

        let sinks: Vec<Arc<dyn PersistenceSink>> = vec![
            Arc::new(LogSink),
            Arc::new(JsonFileSink::new(
                paths,
                settings.history_capacity,
                METRICS_PERSIST_SPACING_MS,
            )),
        ];
        let sink = SinkSet::new(sinks);

        Self {
            counters: Box::new(SysinfoCounters::new()),
            sensors: Box::new(HardwareSensorProvider),
            lister: Box::new(SysinfoProcessLister::new()),
            controller: Box::new(SysinfoAppController::new()),
            effector,
            sink: Arc::new(sink),
            facts: detect_machine_facts(settings),
        }
    }
}

pub struct TunerContext {
    paths: AppPaths,
    settings: Settings,
    sampler: Arc<TelemetrySampler>,
    detector: Arc<ContextDetector>,
    calculator: WeightCalculator,
    orchestrator: Arc<ProfileOrchestrator>,
    auto_switch: AutoSwitchLoop,
    bottleneck: Arc<BottleneckAnalyzer>,
}

impl TunerContext {
    pub fn new(settings: Settings, paths: AppPaths, parts: TunerParts) -> Self {
        let sampler_config = SamplerConfig {
            history_capacity: settings.history_capacity,
            initial_mode: settings.initial_mode,
            ..Default::default()
        };
        let sampler = Arc::new(TelemetrySampler::new(sampler_config, parts.counters, parts.sensors));

        let bottleneck = Arc::new(BottleneckAnalyzer::with_thresholds(
            settings.bottleneck_thresholds.clone(),
        ));
        sampler.attach_observer(bottleneck.clone());
        sampler.attach_observer(Arc::new(SinkObserver(parts.sink.clone())));

        let detector = Arc::new(ContextDetector::new(parts.lister));
        for workload in &settings.extra_workloads {
            let KnownWorkload {
                process_name,
                name,
                profile_name,
            } = workload;
            if let Err(e) = detector.register_workload(process_name, name, profile_name) {
                warn!("Ignoring configured workload {}: {}", name, e);
            }
        }

        let calculator = WeightCalculator::default();

        let closer = AppCloser::new(
            parts.controller,
            &settings.essential_apps,
            settings.close_timeout(),
            settings.close_poll(),
        );
        let orchestrator_config = OrchestratorConfig {
            restart_grace: settings.restart_grace(),
            restart_tweak_id: settings.restart_tweak_id.clone(),
        };
        let orchestrator = Arc::new(
            ProfileOrchestrator::new(sampler.clone(), parts.effector, closer, orchestrator_config)
                .with_catalog(calculator.catalog().clone())
                .with_machine_facts(parts.facts)
                .with_snapshots(SnapshotStore::new(&paths))
                .with_sink(parts.sink.clone()),
        );

        let auto_switch = AutoSwitchLoop::new(detector.clone(), orchestrator.clone(), parts.sink);

        Self {
            paths,
            settings,
            sampler,
            detector,
            calculator,
            orchestrator,
            auto_switch,
            bottleneck,
        }
    }

    /// Initializes the data directory, loads settings and wires the real collaborators
    pub fn from_system(paths: AppPaths) -> Result<Self> {
        let settings = initialize_app_data(&paths)?;
        let parts = TunerParts::system(&settings, &paths);
        Ok(Self::new(settings, paths, parts))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn get_metrics(&self) -> Arc<Metrics> {
        self.sampler.get_metrics()
    }

    pub fn metrics_history(&self) -> Vec<Metrics> {
        self.sampler.history()
    }

    pub fn monitoring_mode(&self) -> MonitoringMode {
        self.sampler.mode()
    }

    /// Parses and applies a mode name; unknown names are rejected
    pub fn set_mode(&self, mode: &str) -> Result<MonitoringMode> {
        let mode = MonitoringMode::from_str(mode)?;
        self.sampler.set_mode(mode);
        Ok(mode)
    }

    pub fn set_monitoring_mode(&self, mode: MonitoringMode) {
        self.sampler.set_mode(mode);
    }

    pub fn has_hardware_sensors(&self) -> bool {
        self.sampler.has_hardware_sensors()
    }

    pub fn has_nvidia_gpu(&self) -> bool {
        is_nvidia_available()
    }

    pub fn bottleneck_status(&self) -> Option<BottleneckStatus> {
        self.bottleneck.last_status()
    }

    pub fn detect_current(&self) -> Option<WorkloadContext> {
        self.detector.detect_current()
    }

    pub fn select_manually(&self, name: &str) -> WorkloadContext {
        self.detector.select_manually(name)
    }

    pub fn enable_auto_detect(&self) {
        self.detector.enable_auto_detect();
    }

    pub fn register_workload(&self, exe: &str, name: &str, profile_name: &str) -> Result<()> {
        self.detector.register_workload(exe, name, profile_name)
    }

    pub fn known_workloads(&self) -> Vec<KnownWorkload> {
        self.detector.known_workloads()
    }

    pub fn apply(&self, workload: &WorkloadContext, auto_restart: bool) -> Result<PipelineResult> {
        self.orchestrator.apply(workload, auto_restart)
    }

    pub fn cancel_scheduled_restart(&self) -> CancelOutcome {
        self.orchestrator.cancel_scheduled_restart()
    }

    pub fn pipeline_state(&self) -> PipelineState {
        self.orchestrator.state()
    }

    pub fn last_pipeline_result(&self) -> Option<PipelineResult> {
        self.orchestrator.last_result()
    }

    /// Starts auto-switching at `interval`, or the configured interval when `None`
    pub fn start_auto_switch(&self, interval: Option<Duration>) -> Result<()> {
        let interval = interval.unwrap_or_else(|| self.settings.auto_switch_interval());
        self.auto_switch.start(interval)
    }

    pub fn stop_auto_switch(&self) {
        self.auto_switch.stop();
    }

    pub fn is_auto_switch_running(&self) -> bool {
        self.auto_switch.is_running()
    }

    pub fn current_workload(&self) -> Option<WorkloadContext> {
        self.auto_switch.last_context()
    }

    /// Weights for `profile_name` against the latest metrics and machine facts
    pub fn compute_weights(&self, profile_name: &str) -> TuningWeights {
        let metrics = self.sampler.get_metrics();
        let hw = HardwareContext::from_metrics(&metrics, &self.orchestrator.machine_facts());
        self.calculator.compute(profile_name, &hw)
    }
}
