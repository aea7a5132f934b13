//! Route Handlers
//!
//! `/ping/{id}` upserts into the monitor registry; `/outbox` exposes
//! the destructive-read drain protocol to external pollers.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use crate::types::{OutboxEntry, PingOverrides};
use crate::web::{error::AppError, AppState};

// --- Request/Response Structs ---

/// Query parameters of a ping: `t` (timeout hours), `s` (subject),
/// `b` (body). The JSON request body, when present, wins field-wise.
#[derive(Debug, Default, Deserialize)]
pub struct PingParams {
    pub t: Option<f64>,
    pub s: Option<String>,
    pub b: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClearParams {
    /// Highest outbox id the caller observed; only entries at or below
    /// it are deleted. Without it the clear truncates everything.
    pub up_to: Option<i64>,
}

// --- Route Handlers ---

/// `GET|POST /ping/{id}` — record a heartbeat.
pub async fn ping_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<PingParams>,
    body: Bytes,
) -> Result<String, AppError> {
    let overrides = merge_overrides(&params, &body)?;

    let now = Utc::now().timestamp();
    let db = state.db.lock().await;
    db.record_heartbeat(
        &id,
        now,
        overrides.timeout,
        overrides.subject.as_deref(),
        overrides.body.as_deref(),
    )?;

    Ok(format!("OK: heartbeat recorded for '{id}'\n"))
}

/// `GET /outbox` — every pending alert, store unchanged.
pub async fn peek_outbox_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<OutboxEntry>>, AppError> {
    let db = state.db.lock().await;
    let entries = db.peek_outbox()?;
    Ok(Json(entries))
}

/// `DELETE /outbox` — destructive clear, scoped to `up_to` when given.
pub async fn clear_outbox_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ClearParams>,
) -> Result<String, AppError> {
    let db = state.db.lock().await;
    let deleted = match params.up_to {
        Some(max_id) => db.clear_outbox_through(max_id)?,
        None => db.clear_outbox_all()?,
    };
    Ok(format!("OK: cleared {deleted} entries\n"))
}

// --- Override resolution ---

/// Resolve the effective overrides for a ping: start from the query
/// params, then let a non-empty JSON body override field-wise.
/// Malformed JSON is a client error with no registry mutation.
fn merge_overrides(params: &PingParams, raw_body: &[u8]) -> Result<PingOverrides, AppError> {
    let mut overrides = PingOverrides {
        timeout: params.t,
        subject: params.s.clone(),
        body: params.b.clone(),
    };

    let trimmed: &[u8] = {
        let s = raw_body;
        let start = s.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(s.len());
        &s[start..]
    };
    if trimmed.is_empty() {
        return Ok(overrides);
    }

    let from_body: PingOverrides = serde_json::from_slice(trimmed)
        .map_err(|e| AppError::BadRequest(format!("malformed ping body: {e}")))?;

    if from_body.timeout.is_some() {
        overrides.timeout = from_body.timeout;
    }
    if from_body.subject.is_some() {
        overrides.subject = from_body.subject;
    }
    if from_body.body.is_some() {
        overrides.body = from_body.body;
    }

    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(t: Option<f64>, s: Option<&str>, b: Option<&str>) -> PingParams {
        PingParams {
            t,
            s: s.map(String::from),
            b: b.map(String::from),
        }
    }

    #[test]
    fn test_query_params_alone() {
        let merged = merge_overrides(&params(Some(2.0), Some("subj"), None), b"").unwrap();
        assert_eq!(merged.timeout, Some(2.0));
        assert_eq!(merged.subject.as_deref(), Some("subj"));
        assert!(merged.body.is_none());
    }

    #[test]
    fn test_json_body_overrides_query_field_wise() {
        let merged = merge_overrides(
            &params(Some(2.0), Some("from-query"), Some("query-body")),
            br#"{"timeout": 5.5, "subject": "from-json"}"#,
        )
        .unwrap();
        assert_eq!(merged.timeout, Some(5.5));
        assert_eq!(merged.subject.as_deref(), Some("from-json"));
        // body was absent from the JSON, so the query param stands
        assert_eq!(merged.body.as_deref(), Some("query-body"));
    }

    #[test]
    fn test_whitespace_body_is_ignored() {
        let merged = merge_overrides(&params(None, None, None), b"  \n ").unwrap();
        assert!(merged.timeout.is_none());
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let err = merge_overrides(&params(None, None, None), b"{not json").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
