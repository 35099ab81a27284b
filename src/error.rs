// Error taxonomy shared by every component
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TunerError {
    /// Hardware sensor could not be opened or read. Never fatal to sampling.
    #[error("sensor unavailable: {0}")]
    SensorUnavailable(String),

    /// A single tweak failed; the pipeline keeps going.
    #[error("tweak '{tweak_id}' failed: {message}")]
    EffectorFailure { tweak_id: String, message: String },

    /// A process could not be inspected or signalled.
    #[error("access denied for process {pid}")]
    ProcessAccessDenied { pid: u32 },

    #[error("a profile pipeline is already running, try again later")]
    PipelineAlreadyRunning,

    #[error("failed to schedule restart: {0}")]
    RestartScheduleFailure(String),

    #[error("unknown monitoring mode '{0}'")]
    UnknownMode(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl TunerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Stable, serializable tag for the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SensorUnavailable(_) => ErrorKind::SensorUnavailable,
            Self::EffectorFailure { .. } => ErrorKind::EffectorFailure,
            Self::ProcessAccessDenied { .. } => ErrorKind::ProcessAccessDenied,
            Self::PipelineAlreadyRunning => ErrorKind::PipelineAlreadyRunning,
            Self::RestartScheduleFailure(_) => ErrorKind::RestartScheduleFailure,
            Self::UnknownMode(_) | Self::Config(_) => ErrorKind::Config,
            Self::Io { .. } | Self::Json { .. } => ErrorKind::Storage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SensorUnavailable,
    EffectorFailure,
    ProcessAccessDenied,
    PipelineAlreadyRunning,
    RestartScheduleFailure,
    Config,
    Storage,
    /// A collaborator panicked mid-pipeline
    Fault,
}

pub type Result<T> = std::result::Result<T, TunerError>;
