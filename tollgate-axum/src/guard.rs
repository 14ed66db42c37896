//! Helpers for login handlers.

use tollgate::Tollgate;

use crate::error::{LockoutError, Result};

/// Reject a login attempt for a locked pair.
///
/// Call before verifying credentials so a locked pair gets the same response
/// whether or not the password would have matched.
pub fn ensure_not_locked(tollgate: &Tollgate, email: &str, ip: &str) -> Result<()> {
    let status = tollgate.get_lockout_status(email, ip);
    if status.locked {
        tracing::debug!(email, ip, "Rejected login for locked pair");
        return Err(LockoutError::Locked(status));
    }
    Ok(())
}

/// Record the outcome of a credential check.
///
/// A failure is recorded and the lockout policy applied in one step; if that
/// locks the pair the lockout is returned so the handler can answer with 429.
pub async fn record_outcome(tollgate: &Tollgate, email: &str, ip: &str, success: bool) -> Result<()> {
    if success {
        tollgate.record_attempt(email, ip, true).await;
        return Ok(());
    }

    let status = tollgate.record_failed_attempt(email, ip).await;
    if status.locked {
        return Err(LockoutError::Locked(status));
    }
    Ok(())
}
