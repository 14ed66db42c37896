//! Attempt history types.
//!
//! An [`AttemptRecord`] holds the history of one (email, IP) pair. Lock expiry
//! is lazy: a stored `locked_until` in the past is treated as absent and is
//! cleared by [`AttemptRecord::active_lock`], the only place that compares a
//! lock against the current instant.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::window::WindowCounts;

/// Composite key identifying one attempt history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptKey {
    /// Lowercased email address
    pub email: String,
    /// Source IP exactly as supplied by the caller
    pub ip: String,
}

impl AttemptKey {
    /// Build a key, case-folding the email. The IP is used verbatim.
    pub fn new(email: &str, ip: &str) -> Self {
        Self {
            email: normalize_email(email),
            ip: ip.to_string(),
        }
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.to_lowercase()
}

/// A single authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptEvent {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

/// Attempt history and lock state for one key.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// Events in chronological order
    pub events: Vec<AttemptEvent>,
    /// Read through [`active_lock`](Self::active_lock) only
    pub(crate) locked_until: Option<DateTime<Utc>>,
    /// Timestamp of the most recent event
    pub last_seen: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            events: Vec::new(),
            locked_until: None,
            last_seen: now,
        }
    }

    /// Append an attempt. A success wipes the history and any lock, starting
    /// a fresh counting epoch.
    ///
    /// Returns the lock that was still in force when a success cleared it.
    pub fn push(&mut self, success: bool, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.last_seen = now;

        if success {
            let lifted = self.active_lock(now);
            self.events.clear();
            self.locked_until = None;
            return lifted;
        }

        self.events.push(AttemptEvent {
            timestamp: now,
            success,
        });
        None
    }

    /// The lock in force at `now`, clearing an expired one.
    pub fn active_lock(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.locked_until {
            Some(until) if now < until => Some(until),
            Some(until) => {
                tracing::debug!(locked_until = %until, "Clearing expired lockout");
                self.locked_until = None;
                None
            }
            None => None,
        }
    }

    /// Drop events that can no longer fall inside a window of length `keep`.
    ///
    /// Returns the number of events removed.
    pub fn prune(&mut self, now: DateTime<Utc>, keep: Duration) -> usize {
        let before = self.events.len();
        self.events.retain(|e| now - e.timestamp < keep);
        before - self.events.len()
    }
}

/// Lock state reported to callers building a rejection response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockoutStatus {
    pub locked: bool,
    /// Time left until the lock expires
    pub remaining: Option<Duration>,
    pub locked_until: Option<DateTime<Utc>>,
}

impl LockoutStatus {
    pub fn unlocked() -> Self {
        Self::default()
    }

    pub(crate) fn from_lock(lock: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match lock {
            Some(until) => Self {
                locked: true,
                remaining: Some(until - now),
                locked_until: Some(until),
            },
            None => Self::unlocked(),
        }
    }

    /// Seconds until the lock expires, rounded up, for a `Retry-After` header.
    pub fn retry_after_seconds(&self) -> Option<i64> {
        self.remaining.map(|remaining| {
            let secs = remaining.num_seconds();
            if remaining > Duration::seconds(secs) {
                secs + 1
            } else {
                secs
            }
        })
    }
}

/// Window counts combined with the current lock state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureStats {
    pub short: u32,
    pub medium: u32,
    pub long: u32,
    pub locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
}

impl FailureStats {
    pub fn new(counts: WindowCounts, lock: Option<DateTime<Utc>>) -> Self {
        Self {
            short: counts.short,
            medium: counts.medium,
            long: counts.long,
            locked: lock.is_some(),
            locked_until: lock,
        }
    }

    pub fn counts(&self) -> WindowCounts {
        WindowCounts {
            short: self.short,
            medium: self.medium,
            long: self.long,
        }
    }
}

/// Read-only view of a record, returned by the per-email and per-IP scans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSnapshot {
    pub email: String,
    pub ip: String,
    pub failures: WindowCounts,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_seen: DateTime<Utc>,
}
