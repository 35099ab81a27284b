// Atomic JSON file operations

use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::error::{Result, TunerError};

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).map_err(|e| TunerError::io(path, e))?;
    serde_json::from_str(&contents).map_err(|e| TunerError::json(path, e))
}

/// Writes JSON atomically using write-to-temp-then-rename
pub fn write_json_file<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TunerError::io(parent, e))?;
    }

    let json_string = serde_json::to_string_pretty(data).map_err(|e| TunerError::json(path, e))?;

    let temp_path = path.with_extension("tmp");

    let mut temp_file = File::create(&temp_path).map_err(|e| TunerError::io(&temp_path, e))?;

    temp_file
        .write_all(json_string.as_bytes())
        .map_err(|e| TunerError::io(&temp_path, e))?;

    temp_file
        .sync_all()
        .map_err(|e| TunerError::io(&temp_path, e))?;

    fs::rename(&temp_path, path).map_err(|e| TunerError::io(path, e))?;

    Ok(())
}

pub fn initialize_json_file<T: Serialize>(path: &Path, default: &T) -> Result<()> {
    if !path.exists() {
        log::info!("Initializing JSON file: {:?}", path);
        write_json_file(path, default)?;
    }
    Ok(())
}

pub fn read_json_file_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if path.exists() {
        read_json_file(path)
    } else {
        Ok(T::default())
    }
}

/// Appends a record to a JSON array file, keeping at most `max_entries` newest records
pub fn append_json_record<T>(path: &Path, record: T, max_entries: usize) -> Result<()>
where
    T: DeserializeOwned + Serialize,
{
    let mut records: Vec<T> = read_json_file_or_default(path)?;
    records.push(record);
    if records.len() > max_entries {
        let excess = records.len() - max_entries;
        records.drain(..excess);
    }
    write_json_file(path, &records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Default)]
    struct Sample {
        name: String,
        value: u32,
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sample.json");
        let sample = Sample {
            name: "cs2".to_string(),
            value: 7,
        };

        write_json_file(&path, &sample).unwrap();
        let loaded: Sample = read_json_file(&path).unwrap();
        assert_eq!(loaded, sample);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_missing_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Sample = read_json_file_or_default(&dir.path().join("missing.json")).unwrap();
        assert_eq!(loaded, Sample::default());
    }

    #[test]
    fn test_malformed_json_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = read_json_file::<Sample>(&path).unwrap_err();
        assert!(matches!(err, TunerError::Json { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_append_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        for value in 0..5u32 {
            append_json_record(&path, value, 3).unwrap();
        }
        let records: Vec<u32> = read_json_file(&path).unwrap();
        assert_eq!(records, vec![2, 3, 4]);
    }
}
