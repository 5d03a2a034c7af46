//! Request-id propagation and bearer-token auth for the admin API.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::api::ApiError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied request id that is echoed back as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request id for the current request, stored as an extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Which bearer tokens the protected routes accept.
#[derive(Debug, Clone)]
pub enum ApiAuth {
    /// Every request is let through. Only allowed in development.
    Disabled,
    Keys(Arc<HashSet<String>>),
}

impl ApiAuth {
    /// Reads comma-separated tokens from `FEEDWATCH_API_KEYS`.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var("FEEDWATCH_API_KEYS").unwrap_or_default();
        Self::from_keys(&raw, is_development)
    }

    /// An empty key list disables auth in development and is an error
    /// anywhere else.
    pub fn from_keys(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let keys: HashSet<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        match (keys.is_empty(), is_development) {
            (false, _) => Ok(Self::Keys(Arc::new(keys))),
            (true, true) => {
                tracing::warn!("auth: FEEDWATCH_API_KEYS empty; admin API is unauthenticated");
                Ok(Self::Disabled)
            }
            (true, false) => anyhow::bail!("FEEDWATCH_API_KEYS must list at least one token"),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Keys(_))
    }

    fn admits(&self, headers: &HeaderMap) -> bool {
        match self {
            Self::Disabled => true,
            Self::Keys(keys) => bearer_token(headers.get(AUTHORIZATION))
                .is_some_and(|token| keys.contains(token)),
        }
    }
}

/// Tags the request with a [`RequestId`] and echoes it on the response.
///
/// A caller-supplied id is reused when it is non-empty and short enough;
/// otherwise a `UUIDv4` is generated.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(|| Uuid::new_v4().to_string(), ToOwned::to_owned);

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Rejects requests without an accepted bearer token with `401`.
pub async fn require_bearer_auth(
    State(auth): State<ApiAuth>,
    req: Request,
    next: Next,
) -> Response {
    if auth.admits(req.headers()) {
        return next.run(req).await;
    }

    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    tracing::warn!(request_id = %request_id, path = %req.uri().path(), "auth: rejected request");
    ApiError::new(request_id, "unauthorized", "missing or invalid bearer token").into_response()
}

fn bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    let value = value?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(authorization: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(authorization));
        headers
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let value = HeaderValue::from_static("bearer  tok-1 ");
        assert_eq!(bearer_token(Some(&value)), Some("tok-1"));
    }

    #[test]
    fn other_schemes_and_empty_tokens_are_ignored() {
        assert_eq!(bearer_token(Some(&HeaderValue::from_static("Basic abc"))), None);
        assert_eq!(bearer_token(Some(&HeaderValue::from_static("Bearer  "))), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn empty_keys_disable_auth_only_in_development() {
        assert!(!ApiAuth::from_keys("", true).expect("dev").is_enabled());
        assert!(ApiAuth::from_keys(" , ", false).is_err());
    }

    #[test]
    fn keys_are_trimmed_and_matched_exactly() {
        let auth = ApiAuth::from_keys(" alpha , beta ,", false).expect("auth");
        assert!(auth.is_enabled());
        assert!(auth.admits(&headers("Bearer alpha")));
        assert!(auth.admits(&headers("Bearer beta")));
        assert!(!auth.admits(&headers("Bearer alph")));
        assert!(!auth.admits(&HeaderMap::new()));
    }

    #[test]
    fn disabled_auth_admits_anything() {
        assert!(ApiAuth::Disabled.admits(&HeaderMap::new()));
    }
}
