//! Lockout configuration.
//!
//! The defaults reproduce the three-tier policy:
//!
//! | Tier   | Window | Failure threshold | Lockout duration |
//! |--------|--------|-------------------|------------------|
//! | short  | 15 min | 5                 | 15 min           |
//! | medium | 1 h    | 10                | 1 h              |
//! | long   | 24 h   | 20                | 24 h             |

use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, policy::LockoutTier};

/// Threshold and lockout duration for one look-back window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicy {
    /// Look-back window over which failures are counted
    #[serde(with = "duration_secs")]
    pub window: Duration,
    /// Failures within `window` that trigger the lockout
    pub threshold: u32,
    /// How long the identity stays locked once the threshold is met
    #[serde(with = "duration_secs")]
    pub lockout: Duration,
}

impl TierPolicy {
    pub fn new(window: Duration, threshold: u32, lockout: Duration) -> Self {
        Self {
            window,
            threshold,
            lockout,
        }
    }
}

/// Settings for the threat classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatConfig {
    /// An IP with more distinct attempt records than this is classified as
    /// CRITICAL regardless of per-pair failure counts.
    pub max_records_per_ip: usize,
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            max_records_per_ip: 5,
        }
    }
}

/// Configuration for login attempt tracking and lockout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutConfig {
    /// When false nothing is recorded and nothing is ever locked
    pub enabled: bool,
    pub short: TierPolicy,
    pub medium: TierPolicy,
    pub long: TierPolicy,
    /// How often the background sweeper runs
    #[serde(with = "duration_secs")]
    pub sweep_interval: Duration,
    /// Extra age beyond the long window before an idle record is swept
    #[serde(with = "duration_secs")]
    pub sweep_margin: Duration,
    pub threat: ThreatConfig,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            short: TierPolicy::new(Duration::minutes(15), 5, Duration::minutes(15)),
            medium: TierPolicy::new(Duration::hours(1), 10, Duration::hours(1)),
            long: TierPolicy::new(Duration::hours(24), 20, Duration::hours(24)),
            sweep_interval: Duration::minutes(5),
            sweep_margin: Duration::hours(1),
            threat: ThreatConfig::default(),
        }
    }
}

impl LockoutConfig {
    /// A configuration that disables tracking entirely.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Tiers ordered from most to least severe.
    ///
    /// Lockout evaluation walks this order and stops at the first match.
    pub fn tiers_by_severity(&self) -> [(LockoutTier, &TierPolicy); 3] {
        [
            (LockoutTier::Long, &self.long),
            (LockoutTier::Medium, &self.medium),
            (LockoutTier::Short, &self.short),
        ]
    }

    pub fn tier(&self, tier: LockoutTier) -> &TierPolicy {
        match tier {
            LockoutTier::Short => &self.short,
            LockoutTier::Medium => &self.medium,
            LockoutTier::Long => &self.long,
        }
    }

    /// Records whose newest activity is older than this are eligible for sweeping.
    pub fn retention(&self) -> Duration {
        self.long.window + self.sweep_margin
    }

    /// Load configuration from `TOLLGATE_*` environment variables.
    ///
    /// Unset variables fall back to [`LockoutConfig::default`]. The result is
    /// validated before it is returned.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            enabled: env_or("TOLLGATE_ENABLED", defaults.enabled)?,
            short: tier_from_env("SHORT", defaults.short)?,
            medium: tier_from_env("MEDIUM", defaults.medium)?,
            long: tier_from_env("LONG", defaults.long)?,
            sweep_interval: env_secs_or("TOLLGATE_SWEEP_INTERVAL_SECS", defaults.sweep_interval)?,
            sweep_margin: env_secs_or("TOLLGATE_SWEEP_MARGIN_SECS", defaults.sweep_margin)?,
            threat: ThreatConfig {
                max_records_per_ip: env_or(
                    "TOLLGATE_MAX_RECORDS_PER_IP",
                    defaults.threat.max_records_per_ip,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration describes a coherent policy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (tier, policy) in self.tiers_by_severity() {
            if policy.threshold == 0 {
                return Err(ConfigError::ZeroThreshold(tier.to_string()));
            }
            if policy.window <= Duration::zero() {
                return Err(ConfigError::NonPositiveDuration(format!("{tier} window")));
            }
            if policy.lockout <= Duration::zero() {
                return Err(ConfigError::NonPositiveDuration(format!("{tier} lockout")));
            }
        }

        if self.short.window > self.medium.window {
            return Err(ConfigError::WindowOrder(
                "short window exceeds medium window".to_string(),
            ));
        }
        if self.medium.window > self.long.window {
            return Err(ConfigError::WindowOrder(
                "medium window exceeds long window".to_string(),
            ));
        }

        if self.sweep_interval <= Duration::zero() {
            return Err(ConfigError::NonPositiveDuration("sweep interval".to_string()));
        }
        if self.sweep_margin < Duration::zero() {
            return Err(ConfigError::NonPositiveDuration("sweep margin".to_string()));
        }

        Ok(())
    }
}

fn tier_from_env(prefix: &str, default: TierPolicy) -> Result<TierPolicy, ConfigError> {
    Ok(TierPolicy {
        window: env_secs_or(&format!("TOLLGATE_{prefix}_WINDOW_SECS"), default.window)?,
        threshold: env_or(&format!("TOLLGATE_{prefix}_THRESHOLD"), default.threshold)?,
        lockout: env_secs_or(&format!("TOLLGATE_{prefix}_LOCKOUT_SECS"), default.lockout)?,
    })
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => parse_value(name, &value),
        Err(_) => Ok(default),
    }
}

fn env_secs_or(name: &str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(name) {
        Ok(value) => {
            let secs: i64 = parse_value(name, &value)?;
            Duration::try_seconds(secs).ok_or_else(|| ConfigError::InvalidValue {
                name: name.to_string(),
                value,
            })
        }
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Serialize a [`Duration`] as whole seconds.
mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(duration.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        Duration::try_seconds(secs)
            .ok_or_else(|| D::Error::custom(format!("duration out of range: {secs}s")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_tier_table() {
        let config = LockoutConfig::default();
        assert!(config.enabled);
        assert_eq!(config.short.threshold, 5);
        assert_eq!(config.short.window, Duration::minutes(15));
        assert_eq!(config.short.lockout, Duration::minutes(15));
        assert_eq!(config.medium.threshold, 10);
        assert_eq!(config.medium.lockout, Duration::hours(1));
        assert_eq!(config.long.threshold, 20);
        assert_eq!(config.long.lockout, Duration::hours(24));
        assert_eq!(config.sweep_interval, Duration::minutes(5));
        assert_eq!(config.threat.max_records_per_ip, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_disabled_config() {
        let config = LockoutConfig::disabled();
        assert!(!config.enabled);
        assert_eq!(config.short, LockoutConfig::default().short);
    }

    #[test]
    fn test_tiers_by_severity_order() {
        let config = LockoutConfig::default();
        let order: Vec<LockoutTier> = config
            .tiers_by_severity()
            .iter()
            .map(|(tier, _)| *tier)
            .collect();
        assert_eq!(
            order,
            vec![LockoutTier::Long, LockoutTier::Medium, LockoutTier::Short]
        );
    }

    #[test]
    fn test_retention_is_long_window_plus_margin() {
        let config = LockoutConfig::default();
        assert_eq!(config.retention(), Duration::hours(25));
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let mut config = LockoutConfig::default();
        config.medium.threshold = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroThreshold(tier)) if tier == "medium"
        ));
    }

    #[test]
    fn test_validate_rejects_shrinking_windows() {
        let mut config = LockoutConfig::default();
        config.short.window = Duration::hours(2);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WindowOrder(_))
        ));
    }

    #[test]
    fn test_validate_rejects_non_positive_sweep_interval() {
        let config = LockoutConfig {
            sweep_interval: Duration::zero(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveDuration(_))
        ));
    }

    #[test]
    fn test_parse_value_reports_variable_name() {
        let err = parse_value::<u32>("TOLLGATE_SHORT_THRESHOLD", "five").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value for TOLLGATE_SHORT_THRESHOLD: five"
        );
    }

    #[test]
    fn test_serde_durations_as_seconds() {
        let config = LockoutConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["short"]["window"], 900);
        assert_eq!(json["long"]["lockout"], 86_400);
        assert_eq!(json["sweep_interval"], 300);

        let parsed: LockoutConfig = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, config);
    }
}
