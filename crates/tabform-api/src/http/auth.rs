//! Capability gate for the settings routes.

use std::sync::Arc;

use axum::{extract::State, http::Request, middleware::Next, response::Response};
use tracing::warn;

use crate::http::constants::{HEADER_ADMIN_TOKEN, QUERY_TOKEN};
use crate::http::errors::ApiError;
use crate::state::ApiState;

/// Reject requests that do not present the configured admin token.
///
/// Without a configured token every request passes.
pub(crate) async fn require_admin_token(
    State(state): State<Arc<ApiState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Ok(next.run(req).await);
    };

    let presented = extract_admin_token(&req)
        .ok_or_else(|| ApiError::unauthorized("missing admin token header or query parameter"))?;
    if !tokens_match(expected, &presented) {
        warn!(path = %req.uri().path(), "rejected settings request with invalid admin token");
        return Err(ApiError::unauthorized("invalid admin token"));
    }

    Ok(next.run(req).await)
}

pub(crate) fn extract_admin_token(req: &Request<axum::body::Body>) -> Option<String> {
    let header_value = req
        .headers()
        .get(HEADER_ADMIN_TOKEN)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(value) = header_value {
        return Some(value.to_string());
    }

    let query = req.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(name, value)| name == QUERY_TOKEN && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

// Compares every byte so the time taken does not depend on where a mismatch occurs.
fn tokens_match(expected: &str, presented: &str) -> bool {
    let (expected, presented) = (expected.as_bytes(), presented.as_bytes());
    expected.len() == presented.len()
        && expected
            .iter()
            .zip(presented)
            .fold(0u8, |diff, (left, right)| diff | (left ^ right))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str, header: Option<&str>) -> Request<axum::body::Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = header {
            builder = builder.header(HEADER_ADMIN_TOKEN, token);
        }
        builder
            .body(axum::body::Body::empty())
            .expect("request should build")
    }

    #[test]
    fn token_is_read_from_header_before_query() {
        assert_eq!(
            extract_admin_token(&request("/settings?token=query", Some(" header "))),
            Some("header".to_string())
        );
        assert_eq!(
            extract_admin_token(&request("/settings?section=a&token=query", None)),
            Some("query".to_string())
        );
        assert_eq!(
            extract_admin_token(&request("/settings?token=a%26b+c", None)),
            Some("a&b c".to_string())
        );
        assert_eq!(extract_admin_token(&request("/settings?token=", None)), None);
        assert_eq!(extract_admin_token(&request("/settings", None)), None);
    }

    #[test]
    fn token_comparison_requires_exact_match() {
        assert!(tokens_match("secret", "secret"));
        assert!(!tokens_match("secret", "secreT"));
        assert!(!tokens_match("secret", "secret2"));
    }
}
