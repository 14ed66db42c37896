//! Core functionality for tollgate
//!
//! This crate contains the login attempt tracking and progressive lockout
//! engine. It keeps a per-(email, IP) history of authentication outcomes in
//! memory, counts failures over 15 minute, 1 hour and 24 hour windows, locks a
//! pair out for an escalating duration, and classifies the threat a pair
//! represents.
//!
//! See [`LoginAttemptService`] for the entry point, [`LockoutConfig`] for the
//! tier table, and [`Clock`] for injecting time in tests.
//!
pub mod attempt;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod policy;
pub mod services;
pub mod store;
pub mod threat;
pub mod window;

pub use attempt::{
    AttemptEvent, AttemptKey, AttemptRecord, AttemptSnapshot, FailureStats, LockoutStatus,
};
pub use clock::{Clock, MockClock, SystemClock};
pub use config::{LockoutConfig, ThreatConfig, TierPolicy};
pub use error::Error;
pub use events::{Event, EventBus, EventHandler, UnlockReason};
pub use policy::{LockoutDecision, LockoutTier};
pub use services::{LoginAttemptService, SweeperHandle};
pub use store::{AttemptStore, SweepReport};
pub use threat::{ThreatAssessment, ThreatLevel};
pub use window::WindowCounts;
