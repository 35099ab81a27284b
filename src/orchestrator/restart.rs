// Delayed system restart that stays cancellable until its deadline
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use parking_lot::{Condvar, Mutex};

use crate::effector::Effector;
use crate::error::{Result, TunerError};
use crate::models::{CancelOutcome, ScheduledRestart};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Cancelled,
    Fired,
}

/// Phase shared by the timer thread and cancellation. Whoever moves it out of
/// `Pending` first decides whether the restart happens.
struct Shared {
    phase: Mutex<Phase>,
    wake: Condvar,
}

struct PendingRestart {
    shared: Arc<Shared>,
    deadline: DateTime<Utc>,
    timer: Option<JoinHandle<()>>,
}

pub struct RestartScheduler {
    effector: Arc<dyn Effector>,
    tweak_id: String,
    current: Mutex<Option<PendingRestart>>,
}

impl RestartScheduler {
    pub fn new(effector: Arc<dyn Effector>, tweak_id: &str) -> Self {
        Self {
            effector,
            tweak_id: tweak_id.to_string(),
            current: Mutex::new(None),
        }
    }

    /// Schedules the restart tweak after `grace`, replacing any pending restart
    pub fn schedule(&self, grace: Duration) -> Result<ScheduledRestart> {
        let out_of_range =
            || TunerError::RestartScheduleFailure(format!("grace window {:?} is out of range", grace));
        let grace_chrono = chrono::Duration::from_std(grace).map_err(|_| out_of_range())?;
        let deadline = Utc::now().checked_add_signed(grace_chrono).ok_or_else(out_of_range)?;
        let fire_at = Instant::now().checked_add(grace).ok_or_else(out_of_range)?;

        let mut current = self.current.lock();
        if let Some(previous) = current.take() {
            if Self::cancel_pending(previous) == CancelOutcome::Cancelled {
                info!("Replaced pending restart with a new schedule");
            }
        }

        let shared = Arc::new(Shared {
            phase: Mutex::new(Phase::Pending),
            wake: Condvar::new(),
        });

        let timer_shared = shared.clone();
        let effector = self.effector.clone();
        let tweak_id = self.tweak_id.clone();

        let timer = thread::Builder::new()
            .name("tuner-restart".to_string())
            .spawn(move || run_timer(timer_shared, fire_at, effector, tweak_id))
            .map_err(|e| TunerError::RestartScheduleFailure(e.to_string()))?;

        info!("Restart scheduled in {:?} (at {})", grace, deadline);

        *current = Some(PendingRestart {
            shared,
            deadline,
            timer: Some(timer),
        });

        Ok(ScheduledRestart {
            deadline,
            cancelled: false,
        })
    }

    /// Cancels before the deadline; after it the restart is irrevocable and this is a no-op
    pub fn cancel(&self) -> CancelOutcome {
        let pending = self.current.lock().take();
        match pending {
            Some(pending) => {
                let outcome = Self::cancel_pending(pending);
                match outcome {
                    CancelOutcome::Cancelled => info!("Scheduled restart cancelled"),
                    CancelOutcome::AlreadyFired => info!("Restart deadline already passed, nothing to cancel"),
                    CancelOutcome::NothingScheduled => {}
                }
                outcome
            }
            None => CancelOutcome::NothingScheduled,
        }
    }

    fn cancel_pending(mut pending: PendingRestart) -> CancelOutcome {
        let outcome = {
            let mut phase = pending.shared.phase.lock();
            match *phase {
                Phase::Pending => {
                    *phase = Phase::Cancelled;
                    pending.shared.wake.notify_all();
                    CancelOutcome::Cancelled
                }
                Phase::Fired => CancelOutcome::AlreadyFired,
                Phase::Cancelled => CancelOutcome::NothingScheduled,
            }
        };

        // A cancelled timer exits at once; a fired one is left to finish on its own
        if outcome == CancelOutcome::Cancelled {
            if let Some(timer) = pending.timer.take() {
                let _ = timer.join();
            }
        }
        outcome
    }

    /// The restart still waiting for its deadline, if any
    pub fn pending(&self) -> Option<ScheduledRestart> {
        let current = self.current.lock();
        let pending = current.as_ref()?;
        if *pending.shared.phase.lock() == Phase::Pending {
            Some(ScheduledRestart {
                deadline: pending.deadline,
                cancelled: false,
            })
        } else {
            None
        }
    }
}

fn run_timer(shared: Arc<Shared>, fire_at: Instant, effector: Arc<dyn Effector>, tweak_id: String) {
    {
        let mut phase = shared.phase.lock();
        while *phase == Phase::Pending && Instant::now() < fire_at {
            shared.wake.wait_until(&mut phase, fire_at);
        }
        if *phase != Phase::Pending {
            return;
        }
        *phase = Phase::Fired;
    }

    info!("Restart grace window elapsed, applying '{}'", tweak_id);
    match catch_unwind(AssertUnwindSafe(|| effector.apply(&tweak_id))) {
        Ok(Ok(message)) => info!("Restart issued: {}", message),
        Ok(Err(e)) => error!("Restart failed: {}", e),
        Err(_) => warn!("Restart effector panicked"),
    }
}
