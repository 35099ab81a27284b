//! Logging setup for Atlas Tuner
//! Terminal + file logging, and log file cleanup for 7-day retention

use log::{info, LevelFilter};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::error::{Result, TunerError};

const LOG_RETENTION_DAYS: u64 = 7;

/// Installs the global logger. Terminal output at `level`, file output at debug.
pub fn init_logging(logs_dir: &Path, level: LevelFilter) -> Result<()> {
    fs::create_dir_all(logs_dir).map_err(|e| TunerError::io(logs_dir, e))?;

    let config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .set_location_level(LevelFilter::Off)
        .build();

    let file_name = format!("tuner-{}.log", chrono::Local::now().format("%Y-%m-%d"));
    let log_path = logs_dir.join(file_name);
    let log_file = File::options()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| TunerError::io(&log_path, e))?;

    let loggers: Vec<Box<dyn SharedLogger>> = vec![
        TermLogger::new(level, config.clone(), TerminalMode::Stderr, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Debug, config, log_file),
    ];

    CombinedLogger::init(loggers)
        .map_err(|e| TunerError::Config(format!("logger already installed: {}", e)))?;

    cleanup_old_logs(logs_dir);
    Ok(())
}

pub fn cleanup_old_logs(logs_dir: &Path) {
    if !logs_dir.exists() {
        return;
    }

    let retention = Duration::from_secs(LOG_RETENTION_DAYS * 24 * 60 * 60);
    let now = SystemTime::now();

    if let Ok(entries) = fs::read_dir(logs_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "log") {
                let expired = fs::metadata(&path)
                    .and_then(|meta| meta.modified())
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .map_or(false, |age| age > retention);

                if expired && fs::remove_file(&path).is_ok() {
                    info!("Cleaned up old log: {:?}", path.file_name());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_keeps_fresh_logs() {
        let dir = tempfile::tempdir().unwrap();
        let fresh = dir.path().join("tuner-today.log");
        let other = dir.path().join("notes.txt");
        fs::write(&fresh, "line").unwrap();
        fs::write(&other, "text").unwrap();

        cleanup_old_logs(dir.path());

        assert!(fresh.exists());
        assert!(other.exists());
    }

    #[test]
    fn test_cleanup_missing_dir_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        cleanup_old_logs(&dir.path().join("absent"));
    }
}
