use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use tollgate::Tollgate;

use crate::{
    error::{LockoutError, Result},
    types::PairQuery,
};

#[derive(Clone)]
pub struct LockoutState {
    pub tollgate: Arc<Tollgate>,
}

/// Operator routes for investigating and clearing lockouts.
///
/// | Method | Path                     | Returns                         |
/// |--------|--------------------------|---------------------------------|
/// | GET    | `/status?email=&ip=`     | failure stats for the pair      |
/// | GET    | `/threat?email=&ip=`     | threat assessment for the pair  |
/// | DELETE | `/attempts?email=&ip=`   | 204, history deleted            |
/// | GET    | `/attempts/email/{email}`| every record for the email      |
/// | GET    | `/attempts/ip/{ip}`      | every record for the IP         |
/// | POST   | `/sweep`                 | result of an immediate sweep    |
///
/// These routes expose attempt history; mount them behind operator authentication.
pub fn create_router(tollgate: Arc<Tollgate>) -> Router {
    let state = LockoutState { tollgate };

    Router::new()
        .route("/status", get(status_handler))
        .route("/threat", get(threat_handler))
        .route("/attempts", delete(reset_handler))
        .route("/attempts/email/{email}", get(attempts_by_email_handler))
        .route("/attempts/ip/{ip}", get(attempts_by_ip_handler))
        .route("/sweep", post(sweep_handler))
        .with_state(state)
}

fn pair(query: std::result::Result<Query<PairQuery>, QueryRejection>) -> Result<PairQuery> {
    query
        .map(|Query(query)| query)
        .map_err(|e| LockoutError::BadRequest(e.body_text()))
}

async fn status_handler(
    State(state): State<LockoutState>,
    query: std::result::Result<Query<PairQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let query = pair(query)?;
    Ok(Json(state.tollgate.get_failure_stats(&query.email, &query.ip)))
}

async fn threat_handler(
    State(state): State<LockoutState>,
    query: std::result::Result<Query<PairQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let query = pair(query)?;
    let assessment = state.tollgate.assess_threat(&query.email, &query.ip);
    if assessment.level >= tollgate::ThreatLevel::High {
        tracing::warn!(
            email = %query.email,
            ip = %query.ip,
            level = %assessment.level,
            "Elevated threat level"
        );
    }
    Ok(Json(assessment))
}

async fn reset_handler(
    State(state): State<LockoutState>,
    query: std::result::Result<Query<PairQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let query = pair(query)?;
    state.tollgate.reset_attempts(&query.email, &query.ip).await;
    tracing::info!(email = %query.email, ip = %query.ip, "Attempt history reset by operator");
    Ok(StatusCode::NO_CONTENT)
}

async fn attempts_by_email_handler(
    State(state): State<LockoutState>,
    Path(email): Path<String>,
) -> impl IntoResponse {
    Json(state.tollgate.get_attempts_by_email(&email))
}

async fn attempts_by_ip_handler(
    State(state): State<LockoutState>,
    Path(ip): Path<String>,
) -> impl IntoResponse {
    Json(state.tollgate.get_attempts_by_ip(&ip))
}

async fn sweep_handler(State(state): State<LockoutState>) -> impl IntoResponse {
    Json(state.tollgate.sweep())
}
