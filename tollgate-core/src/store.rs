//! In-memory attempt store.
//!
//! Records live in a sharded [`DashMap`]. Every operation on a key holds that
//! key's shard lock for its whole read-modify-write, so two concurrent failures
//! for the same pair cannot both observe a stale count. No method holds a map
//! guard while calling back into the map.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::{
    attempt::{
        AttemptKey, AttemptRecord, AttemptSnapshot, FailureStats, LockoutStatus, normalize_email,
    },
    config::LockoutConfig,
    policy::{self, LockoutDecision},
    window::WindowCounts,
};

/// Result of evaluating the lockout policy for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutEvaluation {
    pub counts: WindowCounts,
    pub decision: Option<LockoutDecision>,
    /// The lock in force once the evaluation was applied
    pub locked_until: Option<DateTime<Utc>>,
}

/// What a sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Records deleted outright
    pub removed: usize,
    /// Events dropped from records that were kept
    pub pruned_events: usize,
}

pub struct AttemptStore {
    records: DashMap<AttemptKey, AttemptRecord>,
    config: Arc<LockoutConfig>,
}

impl AttemptStore {
    pub fn new(config: Arc<LockoutConfig>) -> Self {
        Self {
            records: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record an attempt, creating the record on first use.
    ///
    /// Returns the lock that was lifted when a success arrived while locked.
    pub fn record(
        &self,
        key: AttemptKey,
        success: bool,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let mut record = self
            .records
            .entry(key)
            .or_insert_with(|| AttemptRecord::new(now));
        record.push(success, now)
    }

    /// Record a failure and evaluate the policy under the same shard lock.
    pub fn record_failure(&self, key: AttemptKey, now: DateTime<Utc>) -> LockoutEvaluation {
        let mut record = self
            .records
            .entry(key)
            .or_insert_with(|| AttemptRecord::new(now));
        record.push(false, now);
        self.evaluate(&mut record, now)
    }

    /// Evaluate the policy for an existing record, locking it on a match.
    ///
    /// A missing record has no failures and is never locked.
    pub fn apply_lockout(&self, key: &AttemptKey, now: DateTime<Utc>) -> LockoutEvaluation {
        match self.records.get_mut(key) {
            Some(mut record) => self.evaluate(&mut record, now),
            None => LockoutEvaluation {
                counts: WindowCounts::default(),
                decision: None,
                locked_until: None,
            },
        }
    }

    fn evaluate(&self, record: &mut AttemptRecord, now: DateTime<Utc>) -> LockoutEvaluation {
        let counts = WindowCounts::evaluate(&record.events, now, &self.config);
        let decision = policy::evaluate(&counts, now, &self.config);

        if let Some(decision) = decision {
            record.locked_until = Some(decision.locked_until);
        }

        LockoutEvaluation {
            counts,
            decision,
            locked_until: record.active_lock(now),
        }
    }

    /// Delete a record. Returns the removed record's lock if it was still in force.
    pub fn remove(&self, key: &AttemptKey, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.records
            .remove(key)
            .and_then(|(_, mut record)| record.active_lock(now))
    }

    pub fn lockout_status(&self, key: &AttemptKey, now: DateTime<Utc>) -> LockoutStatus {
        let lock = self
            .records
            .get_mut(key)
            .and_then(|mut record| record.active_lock(now));
        LockoutStatus::from_lock(lock, now)
    }

    pub fn failure_stats(&self, key: &AttemptKey, now: DateTime<Utc>) -> FailureStats {
        match self.records.get_mut(key) {
            Some(mut record) => {
                let lock = record.active_lock(now);
                FailureStats::new(
                    WindowCounts::evaluate(&record.events, now, &self.config),
                    lock,
                )
            }
            None => FailureStats::default(),
        }
    }

    /// All records for an email, across every IP.
    pub fn records_by_email(&self, email: &str, now: DateTime<Utc>) -> Vec<AttemptSnapshot> {
        let email = normalize_email(email);
        self.snapshots(|key| key.email == email, now)
    }

    /// All records for an IP, across every email.
    pub fn records_by_ip(&self, ip: &str, now: DateTime<Utc>) -> Vec<AttemptSnapshot> {
        self.snapshots(|key| key.ip == ip, now)
    }

    pub fn count_by_email(&self, email: &str) -> usize {
        let email = normalize_email(email);
        self.records.iter().filter(|r| r.key().email == email).count()
    }

    pub fn count_by_ip(&self, ip: &str) -> usize {
        self.records.iter().filter(|r| r.key().ip == ip).count()
    }

    fn snapshots<F>(&self, matches: F, now: DateTime<Utc>) -> Vec<AttemptSnapshot>
    where
        F: Fn(&AttemptKey) -> bool,
    {
        let mut snapshots: Vec<AttemptSnapshot> = self
            .records
            .iter_mut()
            .filter(|r| matches(r.key()))
            .map(|mut r| {
                let locked_until = r.active_lock(now);
                AttemptSnapshot {
                    email: r.key().email.clone(),
                    ip: r.key().ip.clone(),
                    failures: WindowCounts::evaluate(&r.events, now, &self.config),
                    locked_until,
                    last_seen: r.last_seen,
                }
            })
            .collect();

        snapshots.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        snapshots
    }

    /// Reclaim idle records.
    ///
    /// A record is deleted when it is not locked and its most recent activity is
    /// older than the long window plus the sweep margin. Unlocked records that
    /// survive have events outside the long window pruned. Locked records are
    /// never touched.
    pub fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let cutoff = now - self.config.retention();
        let keep = self.config.long.window;
        let mut report = SweepReport::default();

        self.records.retain(|_, record| {
            if record.active_lock(now).is_some() {
                return true;
            }
            if record.last_seen < cutoff {
                report.removed += 1;
                return false;
            }
            report.pruned_events += record.prune(now, keep);
            true
        });

        report
    }
}
