// Profile pipeline data structures
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::{TuningWeights, WorkloadCategory};
use crate::error::ErrorKind;

/// Orchestrator state machine phases
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    ClosingApps,
    Applying,
    Scheduled,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    SaveState,
    CloseApp,
    Tweak,
    ScheduleRestart,
}

/// Outcome of a single pipeline step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub kind: StepKind,
    pub target: String,
    pub success: bool,
    pub message: String,
}

impl StepOutcome {
    pub fn ok(kind: StepKind, target: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.to_string(),
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(kind: StepKind, target: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.to_string(),
            success: false,
            message: message.into(),
        }
    }
}

/// Terminal artifact of one apply invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub id: String,
    pub success: bool,
    pub message: String,
    pub workload: String,
    pub profile_name: String,
    pub category: WorkloadCategory,
    pub state: PipelineState,
    pub steps: Vec<StepOutcome>,
    pub weights: Option<TuningWeights>,
    pub restart_deadline: Option<DateTime<Utc>>,
    pub error: Option<ErrorKind>,
    pub applied_at: DateTime<Utc>,
}

impl PipelineResult {
    /// Steps that went through, for callers deciding on manual rollback
    pub fn succeeded_steps(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| s.success)
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| !s.success)
    }
}

/// A pending system restart that can be cancelled until its deadline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledRestart {
    pub deadline: DateTime<Utc>,
    pub cancelled: bool,
}

/// Result of a cancellation request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    Cancelled,
    /// The deadline already passed; nothing to cancel
    AlreadyFired,
    NothingScheduled,
}
