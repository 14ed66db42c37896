//! Escalating lockout policy.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{config::LockoutConfig, window::WindowCounts};

/// One of the three lockout severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockoutTier {
    Short,
    Medium,
    Long,
}

impl fmt::Display for LockoutTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockoutTier::Short => write!(f, "short"),
            LockoutTier::Medium => write!(f, "medium"),
            LockoutTier::Long => write!(f, "long"),
        }
    }
}

/// The outcome of a policy evaluation that matched a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutDecision {
    pub tier: LockoutTier,
    pub locked_until: DateTime<Utc>,
}

/// Pick the lockout to apply for the given counts, if any.
///
/// Tiers are tried from most to least severe and the first whose threshold is
/// met wins, so ten failures in an hour that also include five in fifteen
/// minutes produce the one hour lockout.
pub fn evaluate(
    counts: &WindowCounts,
    now: DateTime<Utc>,
    config: &LockoutConfig,
) -> Option<LockoutDecision> {
    config
        .tiers_by_severity()
        .into_iter()
        .find(|(tier, policy)| counts.get(*tier) >= policy.threshold)
        .map(|(tier, policy)| LockoutDecision {
            tier,
            locked_until: now + policy.lockout,
        })
}
