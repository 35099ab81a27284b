// Static machine facts: system disk type and power source
use log::debug;
use sysinfo::{DiskKind, Disks};

use crate::models::{MachineFacts, Settings, StorageType};

/// Detects machine facts, letting settings override either value
pub fn detect_machine_facts(settings: &Settings) -> MachineFacts {
    let storage_type = settings
        .storage_override
        .unwrap_or_else(detect_system_storage);
    let on_battery = settings.on_battery_override.unwrap_or_else(detect_on_battery);

    debug!("Machine facts: storage={:?} on_battery={}", storage_type, on_battery);

    MachineFacts {
        storage_type,
        on_battery,
    }
}

/// Storage type of the disk hosting the OS. Unknown kinds count as SSD.
pub fn detect_system_storage() -> StorageType {
    let disks = Disks::new_with_refreshed_list();
    let system_root = if cfg!(windows) { "C:\\" } else { "/" };

    let kind = disks
        .iter()
        .find(|d| d.mount_point().as_os_str() == system_root)
        .or_else(|| disks.iter().next())
        .map(|d| d.kind());

    storage_from_kind(kind)
}

fn storage_from_kind(kind: Option<DiskKind>) -> StorageType {
    match kind {
        Some(DiskKind::HDD) => StorageType::Hdd,
        _ => StorageType::Ssd,
    }
}

#[cfg(target_os = "linux")]
pub fn detect_on_battery() -> bool {
    use std::fs;

    let Ok(entries) = fs::read_dir("/sys/class/power_supply") else {
        return false;
    };

    let mut saw_battery = false;
    for entry in entries.flatten() {
        let path = entry.path();
        let kind = fs::read_to_string(path.join("type")).unwrap_or_default();
        match kind.trim() {
            "Mains" | "USB" => {
                if fs::read_to_string(path.join("online")).unwrap_or_default().trim() == "1" {
                    return false;
                }
            }
            "Battery" => saw_battery = true,
            _ => {}
        }
    }

    // A battery with no online AC adapter means we are discharging
    saw_battery
}

#[cfg(windows)]
pub fn detect_on_battery() -> bool {
    use windows_sys::Win32::System::Power::{GetSystemPowerStatus, SYSTEM_POWER_STATUS};

    let mut status: SYSTEM_POWER_STATUS = unsafe { std::mem::zeroed() };
    let ok = unsafe { GetSystemPowerStatus(&mut status) };
    // ACLineStatus: 0 = offline, 1 = online, 255 = unknown
    ok != 0 && status.ACLineStatus == 0
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn detect_on_battery() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_from_kind() {
        assert_eq!(storage_from_kind(Some(DiskKind::HDD)), StorageType::Hdd);
        assert_eq!(storage_from_kind(Some(DiskKind::SSD)), StorageType::Ssd);
        assert_eq!(storage_from_kind(None), StorageType::Ssd);
    }

    #[test]
    fn test_overrides_win() {
        let settings = Settings {
            storage_override: Some(StorageType::Hdd),
            on_battery_override: Some(true),
            ..Default::default()
        };

        let facts = detect_machine_facts(&settings);
        assert_eq!(facts.storage_type, StorageType::Hdd);
        assert!(facts.on_battery);
    }
}
