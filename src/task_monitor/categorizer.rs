use serde::{Deserialize, Serialize};

/// Process classes a profile must never close
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProtectedCategory {
    AntiCheat,
    SystemCritical,
    SecuritySoftware,
    DriverHardware,
}

impl ProtectedCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            ProtectedCategory::AntiCheat => "Anti-cheat",
            ProtectedCategory::SystemCritical => "System",
            ProtectedCategory::SecuritySoftware => "Security",
            ProtectedCategory::DriverHardware => "Driver",
        }
    }
}

pub fn protected_category(name: &str, exe_path: Option<&str>) -> Option<ProtectedCategory> {
    let name_lower = name.to_lowercase();

    if is_anti_cheat(&name_lower, exe_path) {
        return Some(ProtectedCategory::AntiCheat);
    }

    if is_system_critical(&name_lower) {
        return Some(ProtectedCategory::SystemCritical);
    }

    if is_security_software(&name_lower, exe_path) {
        return Some(ProtectedCategory::SecuritySoftware);
    }

    if is_driver_hardware(&name_lower, exe_path) {
        return Some(ProtectedCategory::DriverHardware);
    }

    None
}

pub fn is_protected(name: &str, exe_path: Option<&str>) -> bool {
    protected_category(name, exe_path).is_some()
}

fn is_anti_cheat(name: &str, path: Option<&str>) -> bool {
    let anti_cheat_names = [
        // Riot Vanguard
        "vgc",
        "vgk",
        "vgtray",
        // Easy Anti-Cheat
        "easyanticheat",
        "eac_",
        // BattlEye
        "beservice",
        "beclient",
        "battleye",
        // Other anti-cheats
        "punkbuster",
        "fairfight",
        "xigncode",
        "gameguard",
        "nprotect",
        "hackshield",
    ];

    if anti_cheat_names.iter().any(|ac| name.contains(ac)) {
        return true;
    }

    if let Some(p) = path {
        let p_lower = p.to_lowercase();
        if p_lower.contains("riot vanguard")
            || p_lower.contains("easyanticheat")
            || p_lower.contains("battleye")
            || p_lower.contains("anti-cheat")
            || p_lower.contains("anticheat")
        {
            return true;
        }
    }

    false
}

fn is_system_critical(name: &str) -> bool {
    let critical_processes = [
        "csrss.exe",
        "wininit.exe",
        "lsass.exe",
        "services.exe",
        "smss.exe",
        "dwm.exe",
        "winlogon.exe",
        "system",
        "system idle process",
        "registry",
        "memory compression",
        "svchost.exe",
        "ntoskrnl.exe",
        "explorer.exe",
        "spoolsv.exe",
        "sihost.exe",
        "fontdrvhost.exe",
        "ctfmon.exe",
        "conhost.exe",
        "runtimebroker.exe",
        "taskhostw.exe",
        "audiodg.exe",
        "lsaiso.exe",
        "secure system",
        "applicationframehost.exe",
        "shellexperiencehost.exe",
        "textinputhost.exe",
        "lockapp.exe",
        // Unix session plumbing
        "init",
        "systemd",
        "xorg",
        "xwayland",
        "pipewire",
        "dbus-daemon",
    ];

    critical_processes.iter().any(|p| name == *p || name.starts_with("csrss"))
}

fn is_security_software(name: &str, path: Option<&str>) -> bool {
    let security_names = [
        // Windows Defender
        "msmpeng.exe",
        "nissrv.exe",
        "securityhealthservice.exe",
        "securityhealthsystray.exe",
        "mpdefendercoreservice.exe",
        // Common AV
        "avp.exe",
        "avgui.exe",
        "avguard.exe",
        "bdagent.exe",
        "mcshield.exe",
        "nortonsecurity.exe",
    ];

    if security_names.iter().any(|s| name == *s) {
        return true;
    }

    if let Some(p) = path {
        let p_lower = p.to_lowercase();
        if p_lower.contains("windows defender")
            || p_lower.contains("antivirus")
            || p_lower.contains("kaspersky")
            || p_lower.contains("bitdefender")
            || p_lower.contains("malwarebytes")
        {
            return true;
        }
    }

    false
}

fn is_driver_hardware(name: &str, path: Option<&str>) -> bool {
    let driver_names = [
        // NVIDIA
        "nvdisplay.container.exe",
        "nvcontainer.exe",
        // AMD
        "amdrsserv.exe",
        // Intel
        "igfxem.exe",
        "intelaudioservice.exe",
        // Audio
        "rtkauduservice64.exe",
        "nahimic",
    ];

    if driver_names.iter().any(|d| name.contains(d)) {
        return true;
    }

    if let Some(p) = path {
        let p_lower = p.to_lowercase();
        if p_lower.contains("nvidia corporation") || p_lower.contains("realtek") {
            return true;
        }
    }

    false
}
