// Session snapshots and the list of apps closed for a workload
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TunerError};
use crate::file_manager::{read_json_file_or_default, write_json_file};
use crate::models::Metrics;
use crate::task_monitor::AppProcess;
use crate::utils::AppPaths;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedApp {
    pub name: String,
    pub exe_path: Option<String>,
    pub closed_at: i64,
    pub working_dir: Option<String>,
}

impl ClosedApp {
    pub fn from_process(process: &AppProcess, closed_at: i64) -> Self {
        Self {
            name: process.name.clone(),
            exe_path: process.exe_path.as_ref().map(|p| p.to_string_lossy().to_string()),
            closed_at,
            working_dir: process
                .exe_path
                .as_ref()
                .and_then(|p| p.parent())
                .map(|p| p.to_string_lossy().to_string()),
        }
    }
}

/// Apps closed by the most recent pipeline, for manual relaunch
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RestoreList {
    pub session_id: Option<String>,
    pub apps: Vec<ClosedApp>,
    pub created_at: i64,
}

/// State captured before a pipeline changes anything
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub workload: String,
    pub profile_name: String,
    pub taken_at: DateTime<Utc>,
    pub metrics: Metrics,
    pub planned_closures: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    snapshots_dir: PathBuf,
    restore_list_path: PathBuf,
}

impl SnapshotStore {
    pub fn new(paths: &AppPaths) -> Self {
        Self {
            snapshots_dir: paths.snapshots_dir(),
            restore_list_path: paths.restore_list_json_path(),
        }
    }

    pub fn snapshot_path(&self, id: &str) -> PathBuf {
        self.snapshots_dir.join(format!("{}.json", id))
    }

    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<PathBuf> {
        let path = self.snapshot_path(&snapshot.id);
        write_json_file(&path, snapshot)?;
        Ok(path)
    }

    pub fn load_restore_list(&self) -> Result<RestoreList> {
        read_json_file_or_default(&self.restore_list_path)
    }

    /// Starts a fresh list per session; entries with the same executable are kept once
    pub fn record_closed(&self, session_id: &str, apps: Vec<ClosedApp>) -> Result<()> {
        let mut list = self.load_restore_list()?;
        if list.session_id.as_deref() != Some(session_id) {
            list = RestoreList {
                session_id: Some(session_id.to_string()),
                apps: Vec::new(),
                created_at: Utc::now().timestamp(),
            };
        }

        for app in apps {
            let duplicate = list
                .apps
                .iter()
                .any(|a| a.exe_path.is_some() && a.exe_path == app.exe_path);
            if !duplicate {
                list.apps.push(app);
            }
        }

        write_json_file(&self.restore_list_path, &list)
    }

    pub fn clear_restore_list(&self) -> Result<()> {
        remove_if_exists(&self.restore_list_path)
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).map_err(|e| TunerError::io(path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_manager::read_json_file;

    fn process(pid: u32, exe: &str) -> AppProcess {
        AppProcess {
            pid,
            name: Path::new(exe).file_name().unwrap().to_string_lossy().to_string(),
            exe_path: Some(PathBuf::from(exe)),
        }
    }

    #[test]
    fn test_snapshot_written_under_snapshots_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(&AppPaths::new(dir.path()));

        let snapshot = SessionSnapshot {
            id: "abc".to_string(),
            workload: "Valorant".to_string(),
            profile_name: "Valorant".to_string(),
            taken_at: Utc::now(),
            metrics: Metrics::default(),
            planned_closures: vec!["msedge.exe".to_string()],
        };

        let path = store.save(&snapshot).unwrap();
        let loaded: SessionSnapshot = read_json_file(&path).unwrap();
        assert_eq!(loaded.workload, "Valorant");
        assert_eq!(loaded.planned_closures, vec!["msedge.exe"]);
    }

    #[test]
    fn test_restore_list_dedupes_and_resets_per_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(&AppPaths::new(dir.path()));

        let chrome = ClosedApp::from_process(&process(1, "/opt/chrome/chrome"), 10);
        let chrome_again = ClosedApp::from_process(&process(2, "/opt/chrome/chrome"), 11);
        store.record_closed("s1", vec![chrome, chrome_again]).unwrap();

        let list = store.load_restore_list().unwrap();
        assert_eq!(list.apps.len(), 1);
        assert_eq!(list.apps[0].working_dir.as_deref(), Some("/opt/chrome"));

        let slack = ClosedApp::from_process(&process(3, "/opt/slack/slack"), 12);
        store.record_closed("s2", vec![slack]).unwrap();
        let list = store.load_restore_list().unwrap();
        assert_eq!(list.session_id.as_deref(), Some("s2"));
        assert_eq!(list.apps.len(), 1);

        store.clear_restore_list().unwrap();
        assert!(store.load_restore_list().unwrap().apps.is_empty());
    }
}
