// Settings storage and first-run data initialization
use log::{debug, info};

use crate::error::Result;
use crate::file_manager::{initialize_json_file, read_json_file, write_json_file};
use crate::models::Settings;
use crate::utils::AppPaths;

/// Creates the data layout and a default settings file if missing, then loads settings
pub fn initialize_app_data(paths: &AppPaths) -> Result<Settings> {
    paths.initialize_directories()?;
    initialize_json_file(&paths.settings_json_path(), &Settings::default())?;

    let settings = load_settings(paths)?;
    info!("App data initialized at {:?}", paths.root());
    Ok(settings)
}

pub fn load_settings(paths: &AppPaths) -> Result<Settings> {
    let path = paths.settings_json_path();

    if !path.exists() {
        debug!("No settings file at {:?}, using defaults", path);
        return Ok(Settings::default());
    }

    read_json_file(&path)
}

pub fn save_settings(paths: &AppPaths, settings: &Settings) -> Result<()> {
    write_json_file(&paths.settings_json_path(), settings)
}
