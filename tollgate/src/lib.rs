//! # Tollgate
//!
//! Tollgate tracks login attempts per (email, source IP) pair and locks a pair
//! out with escalating durations when failures pile up:
//!
//! - 5 failures in 15 minutes lock for 15 minutes
//! - 10 failures in 1 hour lock for 1 hour
//! - 20 failures in 24 hours lock for 24 hours
//!
//! The most severe matching tier always wins. Alongside the lockout decision,
//! Tollgate classifies each pair as LOW, MEDIUM, HIGH or CRITICAL for alerting,
//! flagging an IP that has attempted many different accounts.
//!
//! State is held in memory in a single process. Password verification, token
//! issuance and HTTP routing belong to the application; Tollgate only consumes
//! the identity key and the boolean outcome of each attempt.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tollgate::Tollgate;
//!
//! #[tokio::main]
//! async fn main() {
//!     let tollgate = Tollgate::default();
//!
//!     let (email, ip) = ("user@example.com", "203.0.113.7");
//!     if tollgate.is_locked_out(email, ip) {
//!         let status = tollgate.get_lockout_status(email, ip);
//!         println!("retry in {:?}s", status.retry_after_seconds());
//!         return;
//!     }
//!
//!     let verified = false; // outcome of the password check
//!     tollgate.record_attempt(email, ip, verified).await;
//!     if !verified {
//!         tollgate.check_and_apply_lockout(email, ip).await;
//!     }
//! }
//! ```
use std::sync::{Arc, Mutex};

use tollgate_core::SweeperHandle;

mod builder;

pub use builder::{TollgateBuilder, TollgateBuilderError};

/// Re-export core types from tollgate_core
///
/// These types are commonly used when working with the Tollgate API.
pub use tollgate_core::{
    AttemptKey, AttemptSnapshot, Clock, Event, EventHandler, FailureStats, LockoutConfig,
    LockoutStatus, LockoutTier, LoginAttemptService, MockClock, SweepReport, SystemClock,
    ThreatAssessment, ThreatConfig, ThreatLevel, TierPolicy, UnlockReason, WindowCounts,
    error::{ConfigError, EventError},
};

/// The main entry point for Tollgate.
///
/// Owns the [`LoginAttemptService`] and the lifecycle of its background
/// sweeper. Cheap to share behind an `Arc`.
pub struct Tollgate {
    service: Arc<LoginAttemptService>,
    sweeper: Mutex<Option<SweeperHandle>>,
}

impl Default for Tollgate {
    fn default() -> Self {
        Self::new(LockoutConfig::default())
    }
}

impl Tollgate {
    /// Create a Tollgate instance reading the system clock, without a sweeper.
    pub fn new(config: LockoutConfig) -> Self {
        Self::from_service(Arc::new(LoginAttemptService::new(config)))
    }

    /// Create a builder for configuring Tollgate.
    pub fn builder() -> TollgateBuilder {
        TollgateBuilder::new()
    }

    pub fn from_service(service: Arc<LoginAttemptService>) -> Self {
        Self {
            service,
            sweeper: Mutex::new(None),
        }
    }

    /// The underlying service.
    pub fn service(&self) -> &Arc<LoginAttemptService> {
        &self.service
    }

    pub fn config(&self) -> &LockoutConfig {
        self.service.config()
    }

    /// Record the outcome of an authentication attempt.
    pub async fn record_attempt(&self, email: &str, ip: &str, success: bool) {
        self.service.record_attempt(email, ip, success).await
    }

    /// Record a failure and apply the lockout policy in one step.
    pub async fn record_failed_attempt(&self, email: &str, ip: &str) -> LockoutStatus {
        self.service.record_failed_attempt(email, ip).await
    }

    /// Evaluate the lockout policy after a failure. Returns `true` when locked.
    pub async fn check_and_apply_lockout(&self, email: &str, ip: &str) -> bool {
        self.service.check_and_apply_lockout(email, ip).await
    }

    /// Delete all history for a pair.
    pub async fn reset_attempts(&self, email: &str, ip: &str) {
        self.service.reset_attempts(email, ip).await
    }

    pub fn is_locked_out(&self, email: &str, ip: &str) -> bool {
        self.service.is_locked_out(email, ip)
    }

    pub fn get_lockout_status(&self, email: &str, ip: &str) -> LockoutStatus {
        self.service.get_lockout_status(email, ip)
    }

    pub fn get_failure_stats(&self, email: &str, ip: &str) -> FailureStats {
        self.service.get_failure_stats(email, ip)
    }

    pub fn get_threat_level(&self, email: &str, ip: &str) -> ThreatLevel {
        self.service.get_threat_level(email, ip)
    }

    pub fn assess_threat(&self, email: &str, ip: &str) -> ThreatAssessment {
        self.service.assess_threat(email, ip)
    }

    pub fn get_attempts_by_email(&self, email: &str) -> Vec<AttemptSnapshot> {
        self.service.get_attempts_by_email(email)
    }

    pub fn get_attempts_by_ip(&self, ip: &str) -> Vec<AttemptSnapshot> {
        self.service.get_attempts_by_ip(ip)
    }

    /// Run one sweep pass immediately.
    pub fn sweep(&self) -> SweepReport {
        self.service.sweep()
    }

    /// Start the background sweeper if it is not already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_sweeper(&self) {
        let mut sweeper = self.sweeper.lock().unwrap_or_else(|e| e.into_inner());
        if sweeper.as_ref().is_some_and(SweeperHandle::is_running) {
            return;
        }
        *sweeper = Some(self.service.spawn_sweeper());
        tracing::info!(
            interval_secs = self.config().sweep_interval.num_seconds(),
            "Started login attempt sweeper"
        );
    }

    pub fn sweeper_running(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(SweeperHandle::is_running)
    }

    /// Stop the background sweeper and wait for it to exit.
    pub async fn shutdown(&self) {
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        if let Some(handle) = handle {
            handle.stop().await;
        }
    }
}
