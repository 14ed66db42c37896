//! Login attempt tracking and progressive lockout.
//!
//! This module tracks authentication outcomes per (email, IP) pair, counts
//! failures across three overlapping windows and locks the pair out for an
//! escalating duration once a window threshold is met.
//!
//! # Features
//!
//! - Per-pair attempt history with lazy lock expiry
//! - Severity-first tier evaluation (24 h, then 1 h, then 15 min)
//! - Threat classification combining per-pair, per-email and per-IP signals
//! - Background sweeper that reclaims idle records
//! - Security events for monitoring
//!
//! # Example
//!
//! ```rust,ignore
//! use tollgate_core::services::LoginAttemptService;
//! use tollgate_core::LockoutConfig;
//!
//! let service = LoginAttemptService::new(LockoutConfig::default());
//!
//! // Reject before verifying credentials
//! if service.is_locked_out("user@example.com", "192.168.1.1") {
//!     // Return 429 with service.get_lockout_status(..)
//! }
//!
//! // Record the outcome afterwards
//! service.record_attempt("user@example.com", "192.168.1.1", false).await;
//! service.check_and_apply_lockout("user@example.com", "192.168.1.1").await;
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    attempt::{AttemptKey, AttemptSnapshot, FailureStats, LockoutStatus},
    clock::{Clock, SystemClock},
    config::LockoutConfig,
    events::{Event, EventBus, UnlockReason},
    services::sweeper::SweeperHandle,
    store::{AttemptStore, LockoutEvaluation, SweepReport},
    threat::{ThreatAssessment, ThreatLevel},
};

/// Service for tracking login attempts and applying lockouts.
///
/// # Thread Safety
///
/// The service is `Send + Sync` and meant to be shared behind an `Arc`. Each
/// operation completes synchronously under the lock of the affected record;
/// only event dispatch awaits, and it happens after the lock is released.
pub struct LoginAttemptService {
    store: Arc<AttemptStore>,
    config: Arc<LockoutConfig>,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl LoginAttemptService {
    /// Create a service that reads the system clock.
    pub fn new(config: LockoutConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: LockoutConfig, clock: Arc<dyn Clock>) -> Self {
        let config = Arc::new(config);
        Self {
            store: Arc::new(AttemptStore::new(Arc::clone(&config))),
            config,
            clock,
            events: EventBus::default(),
        }
    }

    /// Replace the event bus events are published to.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Number of (email, IP) records currently held.
    pub fn tracked_records(&self) -> usize {
        self.store.len()
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Record the outcome of an authentication attempt.
    ///
    /// A success wipes the failure history and any lock for the pair. A
    /// failure is appended; call [`check_and_apply_lockout`] afterwards to
    /// evaluate the policy.
    ///
    /// [`check_and_apply_lockout`]: Self::check_and_apply_lockout
    pub async fn record_attempt(&self, email: &str, ip: &str, success: bool) {
        if !self.config.enabled {
            return;
        }

        let now = self.now();
        let key = AttemptKey::new(email, ip);
        let lifted = self.store.record(key.clone(), success, now);
        tracing::debug!(email = %key.email, ip = %key.ip, success, "Recorded login attempt");

        if success {
            if lifted.is_some() {
                self.publish_unlock(key, UnlockReason::LoginSucceeded, now)
                    .await;
            }
            return;
        }

        let failures = self.store.failure_stats(&key, now).counts();
        self.events
            .publish(Event::LoginFailed {
                email: key.email,
                ip: key.ip,
                failures,
                timestamp: now,
            })
            .await;
    }

    /// Evaluate the lockout policy for a pair, locking it on a match.
    ///
    /// Call after recording a failure. Returns `true` when a tier matched. When
    /// none matches an existing lock is left untouched.
    pub async fn check_and_apply_lockout(&self, email: &str, ip: &str) -> bool {
        if !self.config.enabled {
            return false;
        }

        let now = self.now();
        let key = AttemptKey::new(email, ip);
        let evaluation = self.store.apply_lockout(&key, now);
        self.announce_lockout(key, evaluation, now).await
    }

    /// Record a failure and apply the policy in one step.
    ///
    /// The two happen under the same record lock, so concurrent failures for
    /// one pair cannot both miss the threshold.
    pub async fn record_failed_attempt(&self, email: &str, ip: &str) -> LockoutStatus {
        if !self.config.enabled {
            return LockoutStatus::unlocked();
        }

        let now = self.now();
        let key = AttemptKey::new(email, ip);
        let evaluation = self.store.record_failure(key.clone(), now);

        self.events
            .publish(Event::LoginFailed {
                email: key.email.clone(),
                ip: key.ip.clone(),
                failures: evaluation.counts,
                timestamp: now,
            })
            .await;

        let status = LockoutStatus::from_lock(evaluation.locked_until, now);
        self.announce_lockout(key, evaluation, now).await;
        status
    }

    async fn announce_lockout(
        &self,
        key: AttemptKey,
        evaluation: LockoutEvaluation,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(decision) = evaluation.decision else {
            return false;
        };

        tracing::warn!(
            email = %key.email,
            ip = %key.ip,
            tier = %decision.tier,
            locked_until = %decision.locked_until,
            "Account locked"
        );

        self.events
            .publish(Event::AccountLocked {
                email: key.email,
                ip: key.ip,
                tier: decision.tier,
                failures: evaluation.counts,
                locked_until: decision.locked_until,
                timestamp: now,
            })
            .await;

        true
    }

    /// Delete the record for a pair, e.g. after a verified password reset.
    ///
    /// Idempotent: a missing record is a no-op.
    pub async fn reset_attempts(&self, email: &str, ip: &str) {
        let now = self.now();
        let key = AttemptKey::new(email, ip);

        if self.store.remove(&key, now).is_some() {
            self.publish_unlock(key, UnlockReason::Reset, now).await;
        }
    }

    async fn publish_unlock(&self, key: AttemptKey, reason: UnlockReason, now: DateTime<Utc>) {
        tracing::info!(email = %key.email, ip = %key.ip, ?reason, "Account unlocked");
        self.events
            .publish(Event::AccountUnlocked {
                email: key.email,
                ip: key.ip,
                reason,
                timestamp: now,
            })
            .await;
    }

    /// Whether the pair is locked right now. Clears an expired lock.
    pub fn is_locked_out(&self, email: &str, ip: &str) -> bool {
        self.get_lockout_status(email, ip).locked
    }

    /// Lock state with remaining time, for building a rejection response.
    pub fn get_lockout_status(&self, email: &str, ip: &str) -> LockoutStatus {
        if !self.config.enabled {
            return LockoutStatus::unlocked();
        }

        self.store
            .lockout_status(&AttemptKey::new(email, ip), self.now())
    }

    /// Window counts and lock state for a pair.
    ///
    /// Counts are never modified; an expired lock may be cleared.
    pub fn get_failure_stats(&self, email: &str, ip: &str) -> FailureStats {
        if !self.config.enabled {
            return FailureStats::default();
        }

        self.store
            .failure_stats(&AttemptKey::new(email, ip), self.now())
    }

    /// Classify the pair together with the signals behind the classification.
    pub fn assess_threat(&self, email: &str, ip: &str) -> ThreatAssessment {
        let stats = self.get_failure_stats(email, ip);
        let records_for_ip = self.store.count_by_ip(ip);
        let records_for_email = self.store.count_by_email(email);

        ThreatAssessment::new(records_for_ip, records_for_email, stats, &self.config)
    }

    pub fn get_threat_level(&self, email: &str, ip: &str) -> ThreatLevel {
        self.assess_threat(email, ip).level
    }

    /// Every record for this email, most recently active first.
    pub fn get_attempts_by_email(&self, email: &str) -> Vec<AttemptSnapshot> {
        self.store.records_by_email(email, self.now())
    }

    /// Every record for this IP, most recently active first.
    pub fn get_attempts_by_ip(&self, ip: &str) -> Vec<AttemptSnapshot> {
        self.store.records_by_ip(ip, self.now())
    }

    /// Run one sweep pass now.
    pub fn sweep(&self) -> SweepReport {
        sweep_and_log(&self.store, self.now())
    }

    /// Start the background sweeper.
    ///
    /// This spawns a task that runs a sweep every `sweep_interval` until the
    /// shutdown receiver changes or its sender is dropped.
    ///
    /// # Arguments
    ///
    /// * `shutdown` - A watch receiver that signals when to stop the task
    ///
    /// # Returns
    ///
    /// A `JoinHandle` for the spawned task.
    pub fn start_sweeper(&self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let clock = Arc::clone(&self.clock);
        let period = self
            .config
            .sweep_interval
            .to_std()
            .ok()
            .filter(|period| !period.is_zero())
            .unwrap_or(DEFAULT_SWEEP_INTERVAL);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        sweep_and_log(&store, clock.now());
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down login attempt sweeper");
                        break;
                    }
                }
            }
        })
    }

    /// Start the background sweeper and return a handle that stops it.
    pub fn spawn_sweeper(&self) -> SweeperHandle {
        let (tx, rx) = watch::channel(false);
        SweeperHandle::new(tx, self.start_sweeper(rx))
    }
}

const DEFAULT_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(300);

fn sweep_and_log(store: &AttemptStore, now: DateTime<Utc>) -> SweepReport {
    let report = store.sweep(now);
    if report.removed > 0 || report.pruned_events > 0 {
        tracing::info!(
            removed = report.removed,
            pruned_events = report.pruned_events,
            remaining = store.len(),
            "Swept stale login attempt records"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::MockClock, error::EventError, events::EventHandler, policy::LockoutTier,
    };
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Mutex;

    /// Collects every event it sees
    #[derive(Default)]
    struct RecordingHandler {
        events: Mutex<Vec<Event>>,
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        async fn handle_event(&self, event: &Event) -> Result<(), EventError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl EventHandler for FailingHandler {
        async fn handle_event(&self, _event: &Event) -> Result<(), EventError> {
            Err(EventError::HandlerError("audit sink unavailable".into()))
        }
    }

    fn service() -> (LoginAttemptService, MockClock) {
        let clock = MockClock::default();
        let service =
            LoginAttemptService::with_clock(LockoutConfig::default(), Arc::new(clock.clone()));
        (service, clock)
    }

    async fn fail(service: &LoginAttemptService, times: usize) -> bool {
        let mut locked = false;
        for _ in 0..times {
            service.record_attempt("test@example.com", "10.0.0.1", false).await;
            locked = service
                .check_and_apply_lockout("test@example.com", "10.0.0.1")
                .await;
        }
        locked
    }

    #[tokio::test]
    async fn test_four_failures_do_not_lock() {
        let (service, _) = service();
        assert!(!fail(&service, 4).await);
        assert!(!service.is_locked_out("test@example.com", "10.0.0.1"));
        assert_eq!(service.get_failure_stats("test@example.com", "10.0.0.1").short, 4);
    }

    #[tokio::test]
    async fn test_fifth_failure_locks_for_fifteen_minutes() {
        let (service, clock) = service();
        assert!(fail(&service, 5).await);

        let status = service.get_lockout_status("test@example.com", "10.0.0.1");
        assert!(status.locked);
        assert_eq!(status.locked_until, Some(clock.now() + Duration::minutes(15)));
        assert_eq!(status.remaining, Some(Duration::minutes(15)));
        assert_eq!(status.retry_after_seconds(), Some(900));
    }

    #[tokio::test]
    async fn test_lock_expires_lazily() {
        let (service, clock) = service();
        fail(&service, 5).await;

        clock.advance(Duration::minutes(15));
        assert!(!service.is_locked_out("test@example.com", "10.0.0.1"));

        // Counts are untouched; the 15 minute window has just passed
        let stats = service.get_failure_stats("test@example.com", "10.0.0.1");
        assert_eq!(stats.short, 0);
        assert_eq!(stats.medium, 5);
        assert!(!stats.locked);
    }

    #[tokio::test]
    async fn test_email_is_case_insensitive() {
        let (service, _) = service();
        service.record_attempt("Test@Example.com", "10.0.0.1", false).await;
        assert_eq!(service.get_failure_stats("test@example.com", "10.0.0.1").short, 1);
        assert_eq!(service.get_failure_stats("test@example.com", "10.0.0.2").short, 0);
    }

    #[tokio::test]
    async fn test_success_resets_history() {
        let (service, _) = service();
        fail(&service, 5).await;
        service.record_attempt("test@example.com", "10.0.0.1", true).await;

        let stats = service.get_failure_stats("test@example.com", "10.0.0.1");
        assert_eq!(stats, FailureStats::default());
        assert!(!service.is_locked_out("test@example.com", "10.0.0.1"));
    }

    #[tokio::test]
    async fn test_reset_attempts_is_idempotent() {
        let (service, _) = service();
        fail(&service, 5).await;

        service.reset_attempts("test@example.com", "10.0.0.1").await;
        service.reset_attempts("test@example.com", "10.0.0.1").await;

        assert!(!service.is_locked_out("test@example.com", "10.0.0.1"));
        assert_eq!(service.tracked_records(), 0);
    }

    #[tokio::test]
    async fn test_record_failed_attempt_returns_status() {
        let (service, clock) = service();
        for _ in 0..4 {
            let status = service.record_failed_attempt("test@example.com", "10.0.0.1").await;
            assert!(!status.locked);
        }

        let status = service.record_failed_attempt("test@example.com", "10.0.0.1").await;
        assert!(status.locked);
        assert_eq!(status.locked_until, Some(clock.now() + Duration::minutes(15)));
    }

    #[tokio::test]
    async fn test_events_for_lock_and_unlock() {
        let (service, _) = service();
        let handler = Arc::new(RecordingHandler::default());
        service.event_bus().register(handler.clone()).await;

        fail(&service, 5).await;
        service.record_attempt("test@example.com", "10.0.0.1", true).await;

        let events = handler.events.lock().unwrap();
        let failed = events
            .iter()
            .filter(|e| matches!(e, Event::LoginFailed { .. }))
            .count();
        assert_eq!(failed, 5);

        assert!(events.iter().any(|e| matches!(
            e,
            Event::AccountLocked { tier: LockoutTier::Short, failures, .. } if failures.short == 5
        )));
        assert!(matches!(
            events.last(),
            Some(Event::AccountUnlocked {
                reason: UnlockReason::LoginSucceeded,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_hide_lockout() {
        let (service, _) = service();
        let alerts = Arc::new(RecordingHandler::default());
        service.event_bus().register(Arc::new(FailingHandler)).await;
        service.event_bus().register(alerts.clone()).await;

        for _ in 0..5 {
            service
                .record_failed_attempt("test@example.com", "10.0.0.1")
                .await;
        }

        assert!(service.is_locked_out("test@example.com", "10.0.0.1"));
        let events = alerts.events.lock().unwrap();
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, Event::AccountLocked { .. }))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_reset_without_lock_emits_nothing() {
        let (service, _) = service();
        let handler = Arc::new(RecordingHandler::default());
        service.event_bus().register(handler.clone()).await;

        service.reset_attempts("nobody@example.com", "10.0.0.1").await;
        assert!(handler.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_service_tracks_nothing() {
        let service = LoginAttemptService::new(LockoutConfig::disabled());
        for _ in 0..25 {
            let status = service.record_failed_attempt("test@example.com", "10.0.0.1").await;
            assert!(!status.locked);
        }
        assert!(!service.check_and_apply_lockout("test@example.com", "10.0.0.1").await);
        assert_eq!(service.tracked_records(), 0);
        assert_eq!(
            service.get_threat_level("test@example.com", "10.0.0.1"),
            ThreatLevel::Low
        );
    }

    #[tokio::test]
    async fn test_threat_level_escalates() {
        let (service, _) = service();
        assert_eq!(
            service.get_threat_level("test@example.com", "10.0.0.1"),
            ThreatLevel::Low
        );

        for _ in 0..5 {
            service.record_attempt("test@example.com", "10.0.0.1", false).await;
        }
        assert_eq!(
            service.get_threat_level("test@example.com", "10.0.0.1"),
            ThreatLevel::Medium
        );

        service
            .check_and_apply_lockout("test@example.com", "10.0.0.1")
            .await;
        assert_eq!(
            service.get_threat_level("test@example.com", "10.0.0.1"),
            ThreatLevel::High
        );
    }

    #[tokio::test]
    async fn test_assess_threat_reports_signals() {
        let (service, _) = service();
        service.record_attempt("a@example.com", "10.0.0.1", false).await;
        service.record_attempt("a@example.com", "10.0.0.2", false).await;
        service.record_attempt("b@example.com", "10.0.0.1", false).await;

        let assessment = service.assess_threat("a@example.com", "10.0.0.1");
        assert_eq!(assessment.records_for_ip, 2);
        assert_eq!(assessment.records_for_email, 2);
        assert_eq!(assessment.stats.short, 1);
        assert_eq!(assessment.level, ThreatLevel::Low);
    }

    #[tokio::test]
    async fn test_sweep_uses_injected_clock() {
        let (service, clock) = service();
        service.record_attempt("test@example.com", "10.0.0.1", false).await;

        clock.advance(Duration::hours(24));
        assert_eq!(service.sweep().removed, 0);

        clock.advance(Duration::hours(1) + Duration::seconds(1));
        assert_eq!(service.sweep().removed, 1);
        assert_eq!(service.tracked_records(), 0);
    }

    #[tokio::test]
    async fn test_sweeper_task_stops_on_shutdown() {
        let (service, clock) = service();
        service.record_attempt("test@example.com", "10.0.0.1", false).await;
        clock.advance(Duration::hours(26));

        let (tx, rx) = watch::channel(false);
        let handle = service.start_sweeper(rx);

        // The first tick fires immediately
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(service.tracked_records(), 0);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_sweep_interval_falls_back_to_default() {
        let clock = MockClock::default();
        let config = LockoutConfig {
            sweep_interval: Duration::zero(),
            ..LockoutConfig::default()
        };
        let service = LoginAttemptService::with_clock(config, Arc::new(clock.clone()));
        service.record_attempt("test@example.com", "10.0.0.1", false).await;
        clock.advance(Duration::hours(26));

        let (tx, rx) = watch::channel(false);
        let handle = service.start_sweeper(rx);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        assert_eq!(service.tracked_records(), 0);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
