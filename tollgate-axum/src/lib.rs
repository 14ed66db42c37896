//! # Tollgate Axum Integration
//!
//! This crate provides Axum glue for the Tollgate lockout engine:
//!
//! - [`LockoutError`]: a `429 Too Many Requests` response with a `Retry-After`
//!   header and lockout metadata
//! - [`ensure_not_locked`] and [`record_outcome`] for login handlers
//! - [`ConnectionInfo`]: the client address of the request
//! - [`routes`]: operator endpoints for investigating and clearing lockouts
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use axum::{Json, Router, extract::State, routing::post};
//! use serde::Deserialize;
//! use tollgate::Tollgate;
//! use tollgate_axum::{ConnectionInfo, LockoutError, ensure_not_locked, record_outcome};
//!
//! #[derive(Deserialize)]
//! struct LoginRequest {
//!     email: String,
//!     password: String,
//! }
//!
//! async fn login(
//!     State(tollgate): State<Arc<Tollgate>>,
//!     connection: ConnectionInfo,
//!     Json(req): Json<LoginRequest>,
//! ) -> Result<&'static str, LockoutError> {
//!     let ip = connection.ip.unwrap_or_default();
//!     ensure_not_locked(&tollgate, &req.email, &ip)?;
//!
//!     let verified = req.password == "correct horse battery staple";
//!     record_outcome(&tollgate, &req.email, &ip, verified).await?;
//!     Ok(if verified { "welcome" } else { "invalid credentials" })
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let tollgate = Arc::new(Tollgate::default());
//!     tollgate.start_sweeper();
//!
//!     let app = Router::new()
//!         .route("/login", post(login))
//!         .with_state(tollgate.clone())
//!         .nest("/admin/lockouts", tollgate_axum::routes(tollgate));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(
//!         listener,
//!         app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
//!     )
//!     .await
//!     .unwrap();
//! }
//! ```

mod error;
mod extractors;
mod guard;
mod routes;
mod types;

use std::sync::Arc;

pub use error::{LockoutError, Result};
pub use guard::{ensure_not_locked, record_outcome};
pub use routes::LockoutState;
pub use types::{ConnectionInfo, LockedResponse, PairQuery};

use axum::Router;
use tollgate::Tollgate;

/// Create the operator router for a Tollgate instance.
pub fn routes(tollgate: Arc<Tollgate>) -> Router {
    routes::create_router(tollgate)
}
