use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tollgate::LockoutStatus;

use crate::types::LockedResponse;

#[derive(Debug, Error)]
pub enum LockoutError {
    #[error("Too many failed login attempts")]
    Locked(LockoutStatus),

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl IntoResponse for LockoutError {
    fn into_response(self) -> Response {
        match self {
            LockoutError::Locked(status) => {
                let code = StatusCode::TOO_MANY_REQUESTS;
                let retry_after = status.retry_after_seconds();
                let body = Json(LockedResponse {
                    error: "Too many failed login attempts",
                    code: code.as_u16(),
                    locked_until: status.locked_until,
                    retry_after,
                });

                let mut response = (code, body).into_response();
                if let Some(secs) = retry_after {
                    if let Ok(value) = HeaderValue::from_str(&secs.max(0).to_string()) {
                        response.headers_mut().insert(header::RETRY_AFTER, value);
                    }
                }
                response
            }
            LockoutError::BadRequest(msg) => {
                let code = StatusCode::BAD_REQUEST;
                let body = Json(json!({
                    "error": msg,
                    "code": code.as_u16()
                }));
                (code, body).into_response()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, LockoutError>;
