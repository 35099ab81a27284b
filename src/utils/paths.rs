use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TunerError};

const APP_DIR_NAME: &str = "AtlasTuner";

/// Filesystem layout rooted at one application directory
#[derive(Debug, Clone)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Per-user data directory, falling back to the working directory
    pub fn from_system() -> Self {
        let base_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base_dir.join(APP_DIR_NAME))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.data_dir().join("snapshots")
    }

    pub fn settings_json_path(&self) -> PathBuf {
        self.data_dir().join("settings.json")
    }

    pub fn pipeline_results_json_path(&self) -> PathBuf {
        self.data_dir().join("pipeline_results.json")
    }

    pub fn context_changes_json_path(&self) -> PathBuf {
        self.data_dir().join("context_changes.json")
    }

    pub fn metrics_log_json_path(&self) -> PathBuf {
        self.data_dir().join("metrics_log.json")
    }

    pub fn restore_list_json_path(&self) -> PathBuf {
        self.data_dir().join("restore_list.json")
    }

    pub fn initialize_directories(&self) -> Result<()> {
        let directories = [self.data_dir(), self.logs_dir(), self.snapshots_dir()];

        for dir in &directories {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| TunerError::io(dir, e))?;
                log::debug!("Created directory: {:?}", dir);
            }
        }

        Ok(())
    }
}
