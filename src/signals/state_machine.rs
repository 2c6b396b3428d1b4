//! Per-symbol signal throttle.
//!
//! `Idle` fires on the first qualifying evaluation and moves to `Cooldown`.
//! The cooldown is only re-checked when the next candle completes, so a
//! symbol that goes quiet stays in `Cooldown` until data resumes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Lifecycle {
    #[default]
    Idle,
    Cooldown,
}

#[derive(Debug, Clone, Default)]
pub struct SignalStateMachine {
    lifecycle: Lifecycle,
    last_signal_time: Option<DateTime<Utc>>,
}

impl SignalStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn last_signal_time(&self) -> Option<DateTime<Utc>> {
        self.last_signal_time
    }

    /// Leaves `Cooldown` once strictly more than `cooldown` has elapsed.
    pub fn poll(&mut self, now: DateTime<Utc>, cooldown: Duration) -> Lifecycle {
        if self.lifecycle == Lifecycle::Cooldown {
            let expired = self
                .last_signal_time
                .map_or(true, |last| now - last > cooldown);
            if expired {
                self.lifecycle = Lifecycle::Idle;
            }
        }
        self.lifecycle
    }

    /// Records a signal if the machine is `Idle`. Returns whether it fired.
    pub fn fire(&mut self, now: DateTime<Utc>) -> bool {
        if self.lifecycle != Lifecycle::Idle {
            return false;
        }
        self.lifecycle = Lifecycle::Cooldown;
        self.last_signal_time = Some(now);
        true
    }

    /// Time left before the next signal may fire; `None` when `Idle` or
    /// already expired.
    pub fn remaining_cooldown(&self, now: DateTime<Utc>, cooldown: Duration) -> Option<Duration> {
        if self.lifecycle != Lifecycle::Cooldown {
            return None;
        }
        let last = self.last_signal_time?;
        let remaining = cooldown.checked_sub(&(now - last))?;
        (remaining > Duration::zero()).then_some(remaining)
    }

    pub fn reset(&mut self) {
        self.lifecycle = Lifecycle::Idle;
        self.last_signal_time = None;
    }
}
