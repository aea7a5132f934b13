//! Static shared-token authentication.
//!
//! Every route requires the configured token, presented either as an
//! `Authorization: Bearer` header or a `token` query parameter.
//! Rejection is uniform and happens before any store access.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::web::{error::AppError, AppState};

pub async fn require_token(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let expected = &state.config.api_token;

    let presented = bearer_token(req.headers())
        .map(str::to_string)
        .or_else(|| query_token(req.uri().query().unwrap_or("")));

    match presented {
        Some(token) if !expected.is_empty() && token == *expected => Ok(next.run(req).await),
        _ => {
            warn!("Rejected request to {} (bad or missing token)", req.uri().path());
            Err(AppError::Unauthorized)
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Extract the token from a raw query string (`token=<value>`),
/// percent-decoding the value so tokens with reserved characters
/// still authenticate.
fn query_token(query: &str) -> Option<String> {
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .filter(|t| !t.is_empty())
        .and_then(|t| urlencoding::decode(t).ok())
        .map(|t| t.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer sekrit"),
        );
        assert_eq!(bearer_token(&headers), Some("sekrit"));
    }

    #[test]
    fn test_bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("sekrit"));
        assert_eq!(bearer_token(&headers), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_query_token_extraction() {
        assert_eq!(query_token("t=2&token=sekrit"), Some("sekrit".to_string()));
        assert_eq!(query_token("token="), None);
        assert_eq!(query_token("s=hello"), None);
        assert_eq!(query_token(""), None);
    }

    #[test]
    fn test_query_token_is_percent_decoded() {
        assert_eq!(
            query_token("token=se%2Fkr%3Dt"),
            Some("se/kr=t".to_string())
        );
    }
}
