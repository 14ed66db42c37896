//! Coarse threat classification for alerting.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{attempt::FailureStats, config::LockoutConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreatLevel::Low => write!(f, "LOW"),
            ThreatLevel::Medium => write!(f, "MEDIUM"),
            ThreatLevel::High => write!(f, "HIGH"),
            ThreatLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// The classification together with the signals it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatAssessment {
    pub level: ThreatLevel,
    /// Distinct records sharing the IP, across all emails
    pub records_for_ip: usize,
    /// Distinct records sharing the email, across all IPs
    pub records_for_email: usize,
    /// Failure stats for the exact (email, IP) pair
    pub stats: FailureStats,
}

impl ThreatAssessment {
    pub fn new(
        records_for_ip: usize,
        records_for_email: usize,
        stats: FailureStats,
        config: &LockoutConfig,
    ) -> Self {
        Self {
            level: classify(records_for_ip, &stats, config),
            records_for_ip,
            records_for_email,
            stats,
        }
    }
}

/// Classify a pair. Rules are checked top-down; the first match wins.
pub fn classify(records_for_ip: usize, stats: &FailureStats, config: &LockoutConfig) -> ThreatLevel {
    if records_for_ip > config.threat.max_records_per_ip || stats.long >= config.long.threshold {
        ThreatLevel::Critical
    } else if stats.medium >= config.medium.threshold || stats.locked {
        ThreatLevel::High
    } else if stats.short >= config.short.threshold {
        ThreatLevel::Medium
    } else {
        ThreatLevel::Low
    }
}
