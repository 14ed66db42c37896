//! Security events published by the lockout engine, and the bus that dispatches them.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{error::EventError, policy::LockoutTier, window::WindowCounts};

/// Reason why a lock was lifted before it expired.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UnlockReason {
    /// A successful login reset the history
    LoginSucceeded,
    /// The record was deleted explicitly, e.g. after a verified password reset
    Reset,
}

/// Security events emitted by the lockout engine.
///
/// Events are meant for monitoring and audit pipelines. `AccountLocked` is the
/// one that should raise alerts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Emitted when a login attempt fails.
    LoginFailed {
        /// The email address that was attempted
        email: String,
        /// Source IP of the attempt
        ip: String,
        /// Failure counts after recording this attempt
        failures: WindowCounts,
        /// When the attempt occurred
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a lockout tier is applied.
    AccountLocked {
        email: String,
        ip: String,
        /// The tier whose threshold was met
        tier: LockoutTier,
        /// Failure counts that triggered the lockout
        failures: WindowCounts,
        /// When the lockout will expire
        locked_until: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a lock still in force is lifted.
    AccountUnlocked {
        email: String,
        ip: String,
        reason: UnlockReason,
        timestamp: DateTime<Utc>,
    },
}

/// A trait for handling events emitted by the event bus
///
/// Implementors of this trait can be registered with the [`EventBus`] to receive and process events.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle_event(&self, event: &Event) -> Result<(), EventError>;
}

/// Event bus that can emit events and register event handlers
///
/// The event bus is responsible for managing event handlers and emitting events to them.
///
/// # Examples
///
/// ```
/// # use std::sync::Arc;
/// # use async_trait::async_trait;
/// # use tollgate_core::events::{Event, EventBus, EventHandler};
/// # use tollgate_core::error::EventError;
/// struct AlertHandler;
///
/// #[async_trait]
/// impl EventHandler for AlertHandler {
///     async fn handle_event(&self, event: &Event) -> Result<(), EventError> {
///         if let Event::AccountLocked { email, tier, .. } = event {
///             println!("{email} locked ({tier})");
///         }
///         Ok(())
///     }
/// }
///
/// # async fn example() {
/// let event_bus = EventBus::default();
/// event_bus.register(Arc::new(AlertHandler)).await;
/// # }
/// ```
#[derive(Clone)]
pub struct EventBus {
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register an event handler with the event bus
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().await.push(handler);
    }

    /// Emit an event to all registered handlers, stopping at the first error
    pub async fn emit(&self, event: &Event) -> Result<(), EventError> {
        for handler in self.handlers.read().await.iter() {
            handler.handle_event(event).await?;
        }

        Ok(())
    }

    /// Deliver an event to every handler, logging failures instead of
    /// returning them. A failing handler does not stop later ones.
    pub async fn publish(&self, event: Event) {
        for handler in self.handlers.read().await.iter() {
            if let Err(e) = handler.handle_event(&event).await {
                tracing::warn!(error = %e, ?event, "Event handler failed");
            }
        }
    }
}
