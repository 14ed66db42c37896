use thiserror::Error;

/// Errors raised at the fallible edges of the lockout engine.
///
/// The attempt-tracking operations themselves are total and never return this
/// type; it only covers configuration loading and event dispatch.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },

    #[error("Threshold for the {0} tier must be greater than zero")]
    ZeroThreshold(String),

    #[error("Non-positive duration: {0}")]
    NonPositiveDuration(String),

    #[error("Windows must not shrink as severity increases: {0}")]
    WindowOrder(String),
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event bus error: {0}")]
    BusError(String),

    #[error("Event handler error: {0}")]
    HandlerError(String),
}

impl Error {
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    pub fn is_event_error(&self) -> bool {
        matches!(self, Error::Event(_))
    }
}
