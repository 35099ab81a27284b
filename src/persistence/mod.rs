// Persistence sinks receive telemetry, context changes and pipeline results.
// Calls never block on storage and never report failures back to the caller.
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::file_manager::append_json_record;
use crate::models::{Metrics, PipelineResult, WorkloadContext};
use crate::performance::MetricsObserver;
use crate::utils::AppPaths;

pub trait PersistenceSink: Send + Sync {
    fn record_metrics(&self, metrics: &Metrics);
    fn record_context(&self, context: Option<&WorkloadContext>);
    fn record_pipeline(&self, result: &PipelineResult);
}

/// Writes every record to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl PersistenceSink for LogSink {
    fn record_metrics(&self, metrics: &Metrics) {
        debug!(
            "metrics cpu={:.1}% gpu={:.1}% ram={:.1}/{:.1}GB",
            metrics.cpu_percent, metrics.gpu_percent, metrics.ram_used_gb, metrics.ram_total_gb
        );
    }

    fn record_context(&self, context: Option<&WorkloadContext>) {
        match context {
            Some(c) => info!("context -> {} (profile {}, {:?})", c.name, c.profile_name, c.source),
            None => info!("context -> none"),
        }
    }

    fn record_pipeline(&self, result: &PipelineResult) {
        info!(
            "pipeline {} for {}: {:?} success={} - {}",
            result.id, result.workload, result.state, result.success, result.message
        );
    }
}

enum SinkRecord {
    Metrics(Metrics),
    Context(Option<WorkloadContext>),
    Pipeline(Box<PipelineResult>),
}

struct SinkTargets {
    metrics: PathBuf,
    contexts: PathBuf,
    pipelines: PathBuf,
    max_entries: usize,
}

impl SinkTargets {
    fn write(&self, record: SinkRecord) {
        let result = match record {
            SinkRecord::Metrics(m) => append_json_record(&self.metrics, m, self.max_entries),
            SinkRecord::Context(c) => append_json_record(&self.contexts, c, self.max_entries),
            SinkRecord::Pipeline(p) => append_json_record(&self.pipelines, *p, self.max_entries),
        };
        if let Err(e) = result {
            warn!("Failed to persist record: {}", e);
        }
    }
}

/// Appends records to capped JSON array files on a dedicated writer thread
pub struct JsonFileSink {
    sender: Mutex<Option<Sender<SinkRecord>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    /// Minimum spacing between persisted metrics, in ms
    metrics_spacing_ms: i64,
    last_metrics_ts: Mutex<Option<i64>>,
}

impl JsonFileSink {
    pub fn new(paths: &AppPaths, max_entries: usize, metrics_spacing_ms: i64) -> Self {
        let targets = SinkTargets {
            metrics: paths.metrics_log_json_path(),
            contexts: paths.context_changes_json_path(),
            pipelines: paths.pipeline_results_json_path(),
            max_entries: max_entries.max(1),
        };

        let (sender, receiver) = mpsc::channel::<SinkRecord>();
        let worker = thread::Builder::new()
            .name("tuner-persistence".to_string())
            .spawn(move || {
                for record in receiver {
                    targets.write(record);
                }
            });

        let (sender, worker) = match worker {
            Ok(handle) => (Some(sender), Some(handle)),
            Err(e) => {
                warn!("Persistence writer unavailable, records will be dropped: {}", e);
                (None, None)
            }
        };

        Self {
            sender: Mutex::new(sender),
            worker: Mutex::new(worker),
            metrics_spacing_ms,
            last_metrics_ts: Mutex::new(None),
        }
    }

    fn send(&self, record: SinkRecord) {
        if let Some(sender) = self.sender.lock().as_ref() {
            if sender.send(record).is_err() {
                debug!("Persistence writer stopped, record dropped");
            }
        }
    }

    /// Drains queued records and stops the writer
    pub fn flush_and_close(&self) {
        self.sender.lock().take();
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                warn!("Persistence writer panicked");
            }
        }
    }
}

impl PersistenceSink for JsonFileSink {
    fn record_metrics(&self, metrics: &Metrics) {
        {
            let mut last = self.last_metrics_ts.lock();
            if let Some(prev) = *last {
                if metrics.timestamp - prev < self.metrics_spacing_ms {
                    return;
                }
            }
            *last = Some(metrics.timestamp);
        }
        self.send(SinkRecord::Metrics(metrics.clone()));
    }

    fn record_context(&self, context: Option<&WorkloadContext>) {
        self.send(SinkRecord::Context(context.cloned()));
    }

    fn record_pipeline(&self, result: &PipelineResult) {
        self.send(SinkRecord::Pipeline(Box::new(result.clone())));
    }
}

impl Drop for JsonFileSink {
    fn drop(&mut self) {
        self.flush_and_close();
    }
}

/// Fans records out to several sinks
#[derive(Default, Clone)]
pub struct SinkSet {
    sinks: Vec<Arc<dyn PersistenceSink>>,
}

impl SinkSet {
    pub fn new(sinks: Vec<Arc<dyn PersistenceSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn PersistenceSink>) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl PersistenceSink for SinkSet {
    fn record_metrics(&self, metrics: &Metrics) {
        self.sinks.iter().for_each(|s| s.record_metrics(metrics));
    }

    fn record_context(&self, context: Option<&WorkloadContext>) {
        self.sinks.iter().for_each(|s| s.record_context(context));
    }

    fn record_pipeline(&self, result: &PipelineResult) {
        self.sinks.iter().for_each(|s| s.record_pipeline(result));
    }
}

/// Lets a sink receive every sampled snapshot
pub struct SinkObserver(pub Arc<dyn PersistenceSink>);

impl MetricsObserver for SinkObserver {
    fn observe(&self, metrics: &Metrics) -> Result<(), String> {
        self.0.record_metrics(metrics);
        Ok(())
    }
}
