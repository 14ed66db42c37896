//! Service layer for business logic
//!
//! This module contains the service that composes the attempt store, the
//! lockout policy and the threat classifier, plus the sweeper lifecycle.

pub mod login_attempts;
pub mod sweeper;

pub use login_attempts::LoginAttemptService;
pub use sweeper::SweeperHandle;
