use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn, LevelFilter};

use atlas_tuner_lib::logging::init_logging;
use atlas_tuner_lib::utils::AppPaths;
use atlas_tuner_lib::TunerContext;

#[tokio::main]
async fn main() {
    let paths = AppPaths::from_system();
    if let Err(e) = init_logging(&paths.logs_dir(), LevelFilter::Info) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let context = match TunerContext::from_system(paths) {
        Ok(context) => Arc::new(context),
        Err(e) => {
            error!("Failed to start: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Atlas Tuner started (mode {}, NVIDIA GPU: {})",
        context.monitoring_mode(),
        context.has_nvidia_gpu()
    );

    if context.settings().auto_switch_enabled {
        if let Err(e) = context.start_auto_switch(None) {
            error!("Auto-switch unavailable: {}", e);
        }
    }

    let status_every = Duration::from_secs(context.settings().status_log_interval_secs.max(1));
    run_until(context.clone(), status_every, tokio::signal::ctrl_c()).await;
    info!("Shutdown requested");

    let stopping = context.clone();
    if tokio::task::spawn_blocking(move || stopping.stop_auto_switch()).await.is_err() {
        warn!("Auto-switch did not stop cleanly");
    }
    info!("Atlas Tuner stopped");
}

/// Logs a status line every `every` until `shutdown` resolves. The shutdown future
/// lives across iterations so a signal that lands mid-tick is not lost.
async fn run_until<F: Future>(context: Arc<TunerContext>, every: Duration, shutdown: F) {
    let mut status = tokio::time::interval(every);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = status.tick() => log_status(&context).await,
            _ = &mut shutdown => break,
        }
    }
}

async fn log_status(context: &Arc<TunerContext>) {
    let sampler = context.clone();
    match tokio::task::spawn_blocking(move || sampler.get_metrics()).await {
        Ok(metrics) => {
            let workload = context
                .current_workload()
                .map(|w| w.name)
                .unwrap_or_else(|| "none".to_string());
            info!(
                "CPU {:.1}% | GPU {:.1}% | RAM {:.1}/{:.1} GB | workload: {}",
                metrics.cpu_percent,
                metrics.gpu_percent,
                metrics.ram_used_gb,
                metrics.ram_total_gb,
                workload
            );
        }
        Err(e) => warn!("Metrics task failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_status_loop_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let context = Arc::new(TunerContext::from_system(AppPaths::new(dir.path())).unwrap());

        // Shutdown lands while status ticks keep arriving
        let shutdown = tokio::time::sleep(Duration::from_millis(100));
        let finished = tokio::time::timeout(
            Duration::from_secs(10),
            run_until(context.clone(), Duration::from_millis(5), shutdown),
        )
        .await;

        assert!(finished.is_ok());
        assert!(!context.metrics_history().is_empty());
    }
}
