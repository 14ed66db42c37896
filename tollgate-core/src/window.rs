//! Sliding look-back windows over an attempt history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{attempt::AttemptEvent, config::LockoutConfig, policy::LockoutTier};

/// Failure counts for each look-back window.
///
/// The windows overlap: a recent failure is counted in all three.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCounts {
    pub short: u32,
    pub medium: u32,
    pub long: u32,
}

impl WindowCounts {
    /// Count failed events with `now - timestamp < window` for every tier window.
    pub fn evaluate(events: &[AttemptEvent], now: DateTime<Utc>, config: &LockoutConfig) -> Self {
        let mut counts = Self::default();

        for event in events.iter().filter(|e| !e.success) {
            let age = now - event.timestamp;
            if age < config.short.window {
                counts.short += 1;
            }
            if age < config.medium.window {
                counts.medium += 1;
            }
            if age < config.long.window {
                counts.long += 1;
            }
        }

        counts
    }

    pub fn get(&self, tier: LockoutTier) -> u32 {
        match tier {
            LockoutTier::Short => self.short,
            LockoutTier::Medium => self.medium,
            LockoutTier::Long => self.long,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.long == 0 && self.medium == 0 && self.short == 0
    }
}
