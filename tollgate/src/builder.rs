//! Builder pattern for configuring a [`Tollgate`] instance.
//!
//! # Example
//!
//! ```rust,no_run
//! use tollgate::{LockoutConfig, TollgateBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tollgate = TollgateBuilder::new()
//!         .with_config(LockoutConfig::default())
//!         .with_sweeper(true)
//!         .build()
//!         .await?;
//!
//!     tollgate.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tollgate_core::{
    Clock, EventBus, EventHandler, LockoutConfig, LoginAttemptService, SystemClock,
    error::ConfigError,
};

use crate::Tollgate;

/// Errors that can occur while building a [`Tollgate`] instance.
#[derive(Debug, thiserror::Error)]
pub enum TollgateBuilderError {
    #[error("Invalid lockout configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Builder for [`Tollgate`].
pub struct TollgateBuilder {
    config: LockoutConfig,
    clock: Arc<dyn Clock>,
    handlers: Vec<Arc<dyn EventHandler>>,
    start_sweeper: bool,
}

impl Default for TollgateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TollgateBuilder {
    /// Create a new builder with default configuration.
    ///
    /// # Defaults
    ///
    /// - Lockout tiers: 5 failures / 15 min, 10 / 1 h, 20 / 24 h
    /// - Clock: system clock
    /// - Event handlers: none
    /// - Sweeper: not started
    pub fn new() -> Self {
        Self {
            config: LockoutConfig::default(),
            clock: Arc::new(SystemClock),
            handlers: Vec::new(),
            start_sweeper: false,
        }
    }

    /// Use the given lockout configuration.
    pub fn with_config(mut self, config: LockoutConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the lockout configuration from `TOLLGATE_*` environment variables.
    ///
    /// See [`LockoutConfig::from_env`] for the variables read.
    pub fn with_config_from_env(mut self) -> Result<Self, TollgateBuilderError> {
        self.config = LockoutConfig::from_env()?;
        Ok(self)
    }

    /// Read time from the given clock instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register a handler for lockout events.
    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Start the background sweeper as part of [`build`](Self::build).
    ///
    /// Default: false
    pub fn with_sweeper(mut self, start: bool) -> Self {
        self.start_sweeper = start;
        self
    }

    /// Build the Tollgate instance.
    ///
    /// Validates the configuration, registers event handlers and, when
    /// requested, starts the sweeper on the current tokio runtime.
    pub async fn build(self) -> Result<Tollgate, TollgateBuilderError> {
        self.config.validate()?;

        let events = EventBus::new();
        for handler in self.handlers {
            events.register(handler).await;
        }

        let service =
            LoginAttemptService::with_clock(self.config, self.clock).with_event_bus(events);
        let tollgate = Tollgate::from_service(Arc::new(service));

        if self.start_sweeper {
            tollgate.start_sweeper();
        }

        Ok(tollgate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_build_rejects_invalid_config() {
        let mut config = LockoutConfig::default();
        config.short.threshold = 0;

        let result = TollgateBuilder::new().with_config(config).build().await;
        assert!(matches!(result, Err(TollgateBuilderError::Config(_))));
    }

    #[tokio::test]
    async fn test_build_with_custom_config() {
        let mut config = LockoutConfig::default();
        config.short.threshold = 3;
        config.short.lockout = Duration::minutes(30);

        let tollgate = TollgateBuilder::new()
            .with_config(config)
            .build()
            .await
            .expect("Failed to build Tollgate");

        assert_eq!(tollgate.config().short.threshold, 3);
        assert!(!tollgate.sweeper_running());
    }

    #[tokio::test]
    async fn test_build_starts_sweeper() {
        let tollgate = TollgateBuilder::new()
            .with_sweeper(true)
            .build()
            .await
            .expect("Failed to build Tollgate");

        assert!(tollgate.sweeper_running());
        tollgate.shutdown().await;
        assert!(!tollgate.sweeper_running());
    }
}
