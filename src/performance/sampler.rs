// Adaptive-rate telemetry sampler
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::counters::CounterSource;
use super::history::MetricsHistory;
use super::sensors::{HardwareValues, SensorHandle, SensorProvider};
use crate::models::{Metrics, MonitoringMode};

/// Consumer notified of every freshly produced snapshot
pub trait MetricsObserver: Send + Sync {
    fn observe(&self, metrics: &Metrics) -> Result<(), String>;
}

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub active_interval: Duration,
    pub background_interval: Duration,
    pub history_capacity: usize,
    pub initial_mode: MonitoringMode,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            active_interval: MonitoringMode::Active.min_interval().unwrap_or_default(),
            background_interval: MonitoringMode::Background.min_interval().unwrap_or_default(),
            history_capacity: 300,
            initial_mode: MonitoringMode::Active,
        }
    }
}

impl SamplerConfig {
    fn interval_for(&self, mode: MonitoringMode) -> Option<Duration> {
        match mode {
            MonitoringMode::Active => Some(self.active_interval),
            MonitoringMode::Background => Some(self.background_interval),
            MonitoringMode::Paused => None,
        }
    }
}

/// Sensor state only touched under the sampler lock
struct SamplerInner {
    mode: MonitoringMode,
    counters: Box<dyn CounterSource>,
    provider: Box<dyn SensorProvider>,
    handle: Option<Box<dyn SensorHandle>>,
    /// Last known good hardware values
    hardware: HardwareValues,
    last_sample: Option<Instant>,
    history: MetricsHistory,
}

impl SamplerInner {
    fn open_handle(&mut self) {
        match self.provider.open() {
            Ok(handle) => {
                debug!("Hardware sensors opened");
                self.handle = Some(handle);
            }
            Err(e) => {
                // Not retried until the next mode transition
                warn!("Hardware sensors unavailable, continuing without them: {}", e);
                self.handle = None;
                self.hardware = HardwareValues::default();
            }
        }
    }

    fn refresh_hardware(&mut self) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };

        let result = handle.update().and_then(|_| handle.read());
        match result {
            Ok(readings) => self.hardware = HardwareValues::from_readings(&readings),
            Err(e) => debug!("Hardware sensor read failed, keeping last values: {}", e),
        }
    }

    fn sample(&mut self) -> Metrics {
        let counters = self.counters.refresh();

        // Background carries the last Active values forward
        if self.mode.reads_hardware() {
            self.refresh_hardware();
        }

        Metrics {
            timestamp: chrono::Utc::now().timestamp_millis(),
            cpu_percent: counters.cpu_percent,
            gpu_percent: self.hardware.gpu_percent.unwrap_or(0.0),
            ram_used_gb: counters.ram_used_gb,
            ram_total_gb: counters.ram_total_gb,
            ram_percent: counters.ram_percent,
            cpu_temp_c: self.hardware.cpu_temp_c,
            gpu_temp_c: self.hardware.gpu_temp_c,
        }
    }
}

/// Produces metrics on the caller's thread, gated by the current mode's interval.
/// The cached snapshot is swapped atomically so readers never see a partial update.
pub struct TelemetrySampler {
    config: SamplerConfig,
    inner: Mutex<SamplerInner>,
    latest: RwLock<Arc<Metrics>>,
    observers: RwLock<Vec<Arc<dyn MetricsObserver>>>,
}

impl TelemetrySampler {
    pub fn new(
        config: SamplerConfig,
        counters: Box<dyn CounterSource>,
        provider: Box<dyn SensorProvider>,
    ) -> Self {
        let mut inner = SamplerInner {
            mode: config.initial_mode,
            counters,
            provider,
            handle: None,
            hardware: HardwareValues::default(),
            last_sample: None,
            history: MetricsHistory::new(config.history_capacity),
        };

        // Starting Paused still needs real RAM totals in the cache; counters only
        let seed = if config.initial_mode == MonitoringMode::Paused {
            inner.sample()
        } else {
            inner.open_handle();
            Metrics::default()
        };

        Self {
            config,
            inner: Mutex::new(inner),
            latest: RwLock::new(Arc::new(seed)),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Returns the cached snapshot unless the mode's minimum interval has elapsed
    pub fn get_metrics(&self) -> Arc<Metrics> {
        let fresh = {
            let mut inner = self.inner.lock();

            let Some(interval) = self.config.interval_for(inner.mode) else {
                return self.latest();
            };

            if let Some(last) = inner.last_sample {
                if last.elapsed() < interval {
                    return self.latest();
                }
            }

            let metrics = Arc::new(inner.sample());
            inner.last_sample = Some(Instant::now());
            inner.history.push(Metrics::clone(&metrics));
            *self.latest.write() = metrics.clone();
            metrics
        };

        self.notify(&fresh);
        fresh
    }

    /// Last produced snapshot without triggering a sample
    pub fn latest(&self) -> Arc<Metrics> {
        self.latest.read().clone()
    }

    pub fn mode(&self) -> MonitoringMode {
        self.inner.lock().mode
    }

    /// Switches sampling fidelity. Pausing releases the sensor handle, resuming reopens it.
    pub fn set_mode(&self, mode: MonitoringMode) {
        let mut inner = self.inner.lock();
        let previous = inner.mode;
        if previous == mode {
            return;
        }

        inner.mode = mode;
        info!("Monitoring mode changed: {} -> {}", previous, mode);

        match (previous, mode) {
            (_, MonitoringMode::Paused) => {
                if inner.handle.take().is_some() {
                    debug!("Hardware sensors released");
                }
            }
            (MonitoringMode::Paused, _) => inner.open_handle(),
            _ => {}
        }
    }

    pub fn history(&self) -> Vec<Metrics> {
        self.inner.lock().history.to_vec()
    }

    pub fn has_hardware_sensors(&self) -> bool {
        self.inner.lock().handle.is_some()
    }

    pub fn attach_observer(&self, observer: Arc<dyn MetricsObserver>) {
        self.observers.write().push(observer);
    }

    /// Observer errors and panics are logged and swallowed so sampling never stops
    fn notify(&self, metrics: &Metrics) {
        let observers = self.observers.read().clone();
        for observer in observers {
            match panic::catch_unwind(AssertUnwindSafe(|| observer.observe(metrics))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("Metrics observer failed: {}", e),
                Err(_) => warn!("Metrics observer panicked; ignoring"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, TunerError};
    use crate::performance::counters::CounterReading;
    use crate::performance::sensors::{HardwareKind, SensorKind, SensorReading};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counts {
        refreshes: AtomicUsize,
        opens: AtomicUsize,
        updates: AtomicUsize,
        drops: AtomicUsize,
    }

    struct MockCounters(Arc<Counts>);

    impl CounterSource for MockCounters {
        fn refresh(&mut self) -> CounterReading {
            let n = self.0.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
            CounterReading::from_bytes(n as f32, 4 * 1_073_741_824, 16 * 1_073_741_824)
        }
    }

    struct MockProvider {
        counts: Arc<Counts>,
        /// Opens numbered above this fail
        max_opens: usize,
        /// Updates numbered above this fail
        max_updates: usize,
    }

    impl SensorProvider for MockProvider {
        fn open(&mut self) -> Result<Box<dyn SensorHandle>> {
            let n = self.counts.opens.fetch_add(1, Ordering::SeqCst) + 1;
            if n > self.max_opens {
                return Err(TunerError::SensorUnavailable("driver gone".to_string()));
            }
            Ok(Box::new(MockHandle {
                counts: self.counts.clone(),
                max_updates: self.max_updates,
                last: 0,
            }))
        }
    }

    struct MockHandle {
        counts: Arc<Counts>,
        max_updates: usize,
        last: usize,
    }

    impl SensorHandle for MockHandle {
        fn update(&mut self) -> Result<()> {
            let n = self.counts.updates.fetch_add(1, Ordering::SeqCst) + 1;
            if n > self.max_updates {
                return Err(TunerError::SensorUnavailable("read timeout".to_string()));
            }
            self.last = n;
            Ok(())
        }

        fn read(&self) -> Result<Vec<SensorReading>> {
            Ok(vec![
                SensorReading::new(HardwareKind::Gpu, SensorKind::Load, 10.0 * self.last as f32),
                SensorReading::new(HardwareKind::Gpu, SensorKind::Temperature, 60.0 + self.last as f32),
                SensorReading::new(HardwareKind::Cpu, SensorKind::Temperature, 50.0),
            ])
        }
    }

    impl Drop for MockHandle {
        fn drop(&mut self) {
            self.counts.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sampler_with(
        interval: Duration,
        mode: MonitoringMode,
        max_opens: usize,
        max_updates: usize,
    ) -> (TelemetrySampler, Arc<Counts>) {
        let counts = Arc::new(Counts::default());
        let config = SamplerConfig {
            active_interval: interval,
            background_interval: interval,
            history_capacity: 4,
            initial_mode: mode,
        };
        let sampler = TelemetrySampler::new(
            config,
            Box::new(MockCounters(counts.clone())),
            Box::new(MockProvider {
                counts: counts.clone(),
                max_opens,
                max_updates,
            }),
        );
        (sampler, counts)
    }

    #[test]
    fn test_cached_within_interval() {
        let (sampler, counts) =
            sampler_with(Duration::from_secs(3600), MonitoringMode::Active, 10, 100);

        let first = sampler.get_metrics();
        let second = sampler.get_metrics();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(counts.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(counts.updates.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resamples_after_interval() {
        let (sampler, counts) = sampler_with(Duration::ZERO, MonitoringMode::Active, 10, 100);

        let first = sampler.get_metrics();
        let second = sampler.get_metrics();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(counts.refreshes.load(Ordering::SeqCst), 2);
        assert_eq!(second.gpu_percent, 20.0);
        assert_eq!(second.gpu_temp_c, Some(62.0));
        assert_eq!(second.cpu_temp_c, Some(50.0));
    }

    #[test]
    fn test_paused_never_touches_sensors() {
        let (sampler, counts) = sampler_with(Duration::ZERO, MonitoringMode::Paused, 10, 100);

        // One counters-only reading at construction, nothing after
        assert_eq!(counts.refreshes.load(Ordering::SeqCst), 1);

        let first = sampler.get_metrics();
        std::thread::sleep(Duration::from_millis(5));
        let second = sampler.get_metrics();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(counts.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(counts.opens.load(Ordering::SeqCst), 0);
        assert_eq!(counts.updates.load(Ordering::SeqCst), 0);
        assert!(!sampler.has_hardware_sensors());
        assert!(sampler.history().is_empty());
    }

    #[test]
    fn test_starting_paused_reports_real_memory() {
        let (sampler, _counts) = sampler_with(Duration::ZERO, MonitoringMode::Paused, 10, 100);

        let metrics = sampler.get_metrics();
        assert_eq!(metrics.ram_total_gb, 16.0);
        assert_eq!(metrics.ram_used_gb, 4.0);
        assert!(metrics.timestamp > 0);
        assert_eq!(metrics.gpu_temp_c, None);
    }

    #[test]
    fn test_pause_releases_handle_and_freezes_snapshot() {
        let (sampler, counts) = sampler_with(Duration::ZERO, MonitoringMode::Active, 10, 100);
        let before = sampler.get_metrics();

        sampler.set_mode(MonitoringMode::Paused);
        assert_eq!(counts.drops.load(Ordering::SeqCst), 1);
        assert!(!sampler.has_hardware_sensors());

        let during = sampler.get_metrics();
        assert!(Arc::ptr_eq(&before, &during));
        assert_eq!(counts.refreshes.load(Ordering::SeqCst), 1);

        sampler.set_mode(MonitoringMode::Active);
        assert_eq!(counts.opens.load(Ordering::SeqCst), 2);
        assert!(sampler.has_hardware_sensors());
    }

    #[test]
    fn test_background_carries_hardware_forward() {
        let (sampler, counts) = sampler_with(Duration::ZERO, MonitoringMode::Active, 10, 100);
        let active = sampler.get_metrics();
        assert_eq!(active.gpu_percent, 10.0);

        sampler.set_mode(MonitoringMode::Background);
        let background = sampler.get_metrics();

        assert_eq!(counts.refreshes.load(Ordering::SeqCst), 2);
        assert_eq!(counts.updates.load(Ordering::SeqCst), 1);
        assert_eq!(background.gpu_percent, active.gpu_percent);
        assert_eq!(background.gpu_temp_c, active.gpu_temp_c);
        assert_ne!(background.cpu_percent, active.cpu_percent);
    }

    #[test]
    fn test_failed_read_keeps_last_good_values() {
        let (sampler, _counts) = sampler_with(Duration::ZERO, MonitoringMode::Active, 10, 1);

        let good = sampler.get_metrics();
        let degraded = sampler.get_metrics();

        assert_eq!(good.gpu_percent, 10.0);
        assert_eq!(degraded.gpu_percent, 10.0);
        assert_eq!(degraded.gpu_temp_c, good.gpu_temp_c);
    }

    #[test]
    fn test_failed_reinit_leaves_hardware_absent() {
        let (sampler, counts) = sampler_with(Duration::ZERO, MonitoringMode::Active, 1, 100);
        assert!(sampler.get_metrics().gpu_temp_c.is_some());

        sampler.set_mode(MonitoringMode::Paused);
        sampler.set_mode(MonitoringMode::Active);

        let metrics = sampler.get_metrics();
        assert_eq!(metrics.gpu_temp_c, None);
        assert_eq!(metrics.cpu_temp_c, None);
        assert_eq!(metrics.gpu_percent, 0.0);

        // No automatic retry while the mode stays the same
        sampler.get_metrics();
        sampler.set_mode(MonitoringMode::Background);
        sampler.get_metrics();
        assert_eq!(counts.opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_history_is_bounded() {
        let (sampler, _counts) = sampler_with(Duration::ZERO, MonitoringMode::Active, 10, 100);
        for _ in 0..10 {
            sampler.get_metrics();
        }

        let history = sampler.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history.last().map(|m| m.cpu_percent), Some(10.0));
    }

    struct PanickingObserver;

    impl MetricsObserver for PanickingObserver {
        fn observe(&self, _metrics: &Metrics) -> std::result::Result<(), String> {
            panic!("observer bug");
        }
    }

    struct CountingObserver(AtomicUsize);

    impl MetricsObserver for CountingObserver {
        fn observe(&self, _metrics: &Metrics) -> std::result::Result<(), String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err("store offline".to_string())
        }
    }

    #[test]
    fn test_observer_faults_do_not_interrupt_sampling() {
        let (sampler, counts) = sampler_with(Duration::ZERO, MonitoringMode::Active, 10, 100);
        let counting = Arc::new(CountingObserver(AtomicUsize::new(0)));
        sampler.attach_observer(Arc::new(PanickingObserver));
        sampler.attach_observer(counting.clone());

        sampler.get_metrics();
        sampler.get_metrics();

        assert_eq!(counts.refreshes.load(Ordering::SeqCst), 2);
        assert_eq!(counting.0.load(Ordering::SeqCst), 2);
        assert_eq!(sampler.history().len(), 2);
    }

    #[test]
    fn test_set_same_mode_is_noop() {
        let (sampler, counts) = sampler_with(Duration::ZERO, MonitoringMode::Active, 10, 100);
        sampler.set_mode(MonitoringMode::Active);
        assert_eq!(counts.opens.load(Ordering::SeqCst), 1);
        assert_eq!(counts.drops.load(Ordering::SeqCst), 0);
    }
}
