use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity key supplied as query parameters: `?email=..&ip=..`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairQuery {
    pub email: String,
    pub ip: String,
}

/// Client address as seen by the server.
///
/// Taken from the socket peer address. Deployments behind a proxy must resolve
/// the real client address themselves before handing it to Tollgate.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LockedResponse {
    pub error: &'static str,
    pub code: u16,
    pub locked_until: Option<DateTime<Utc>>,
    /// Seconds until the lock expires
    pub retry_after: Option<i64>,
}
