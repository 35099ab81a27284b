// Tweak effectors: the boundary where tuning touches the OS
use std::collections::HashMap;
use std::process::Command;

use log::{debug, info};

use crate::error::{Result, TunerError};

#[cfg(windows)]
use std::os::windows::process::CommandExt;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Applies a single named tweak. Returns a human-readable message on success.
pub trait Effector: Send + Sync {
    fn apply(&self, tweak_id: &str) -> Result<String>;
}

/// Logs every tweak and changes nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunEffector;

impl Effector for DryRunEffector {
    fn apply(&self, tweak_id: &str) -> Result<String> {
        info!("[dry run] would apply tweak '{}'", tweak_id);
        Ok(format!("dry run: {}", tweak_id))
    }
}

/// Runs a configured program per tweak id
#[derive(Debug, Clone, Default)]
pub struct CommandEffector {
    commands: HashMap<String, Vec<String>>,
}

impl CommandEffector {
    pub fn new(commands: HashMap<String, Vec<String>>) -> Self {
        Self { commands }
    }
}

impl Effector for CommandEffector {
    fn apply(&self, tweak_id: &str) -> Result<String> {
        let failure = |message: String| TunerError::EffectorFailure {
            tweak_id: tweak_id.to_string(),
            message,
        };

        let argv = self
            .commands
            .get(tweak_id)
            .ok_or_else(|| failure("no command configured".to_string()))?;
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| failure("empty command".to_string()))?;

        debug!("Running tweak '{}': {} {:?}", tweak_id, program, args);

        let mut cmd = Command::new(program);
        cmd.args(args);

        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        let output = cmd
            .output()
            .map_err(|e| failure(format!("failed to start {}: {}", program, e)))?;

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            Ok(if stdout.is_empty() {
                format!("applied {}", tweak_id)
            } else {
                stdout
            })
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(failure(format!("exited with {}: {}", output.status, stderr)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effector(entries: Vec<(&str, Vec<&str>)>) -> CommandEffector {
        CommandEffector::new(
            entries
                .into_iter()
                .map(|(id, argv)| (id.to_string(), argv.into_iter().map(String::from).collect()))
                .collect(),
        )
    }

    #[test]
    fn test_dry_run_always_succeeds() {
        let message = DryRunEffector.apply("disable_nagle").unwrap();
        assert!(message.contains("disable_nagle"));
    }

    #[test]
    fn test_unknown_tweak_fails() {
        let err = effector(vec![]).apply("disable_nagle").unwrap_err();
        match err {
            TunerError::EffectorFailure { tweak_id, message } => {
                assert_eq!(tweak_id, "disable_nagle");
                assert!(message.contains("no command"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_empty_command_fails() {
        assert!(effector(vec![("noop", vec![])]).apply("noop").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_exit_status() {
        let effector = effector(vec![
            ("ok", vec!["sh", "-c", "echo tuned"]),
            ("bad", vec!["sh", "-c", "echo nope >&2; exit 3"]),
        ]);

        assert_eq!(effector.apply("ok").unwrap(), "tuned");

        let err = effector.apply("bad").unwrap_err().to_string();
        assert!(err.contains("nope"));
    }
}
