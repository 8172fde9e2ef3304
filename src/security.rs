use crate::models::ApiError;
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{self, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{collections::HashMap, convert::Infallible, env, sync::Arc};
use tracing::{debug, info, warn};

const API_KEY_HEADER: &str = "x-feeds-key";

#[derive(Clone)]
pub struct AuthState {
    records: Arc<HashMap<String, AuthContext>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthContext {
    pub org_id: String,
    pub api_key_id: String,
}

impl AuthState {
    pub fn from_env() -> Self {
        let raw = env::var("FEEDS_API_KEYS").unwrap_or_default();
        Self::from_spec(&raw)
    }

    /// Parses `org:key,org:key`. Malformed entries are skipped.
    pub fn from_spec(raw: &str) -> Self {
        let mut entries = HashMap::new();
        for (idx, token) in raw.split(',').enumerate() {
            let trimmed = token.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut parts = trimmed.splitn(2, ':');
            let org_id = parts.next().map(str::trim).filter(|s| !s.is_empty());
            let key = parts.next().map(str::trim).filter(|s| !s.is_empty());
            match (org_id, key) {
                (Some(org), Some(secret)) => {
                    entries.insert(
                        secret.to_string(),
                        AuthContext {
                            org_id: org.to_string(),
                            api_key_id: format!("key-{:02}", idx + 1),
                        },
                    );
                }
                _ => warn!(
                    target = "spapi.api",
                    "ignored malformed FEEDS_API_KEYS entry at position {}",
                    idx + 1
                ),
            }
        }

        if entries.is_empty() {
            warn!(
                target = "spapi.api",
                "FEEDS_API_KEYS produced no keys; protected routes will reject every request"
            );
        } else {
            info!(
                target = "spapi.api",
                key_count = entries.len(),
                "loaded API keys"
            );
        }
        Self {
            records: Arc::new(entries),
        }
    }

    fn authenticate(&self, presented: &str) -> Option<AuthContext> {
        self.records.get(presented).cloned()
    }
}

pub async fn require_api_auth(
    State(state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Infallible> {
    let Some(presented) = extract_api_key(request.headers()) else {
        return Ok(unauthorized_response(
            "missing_api_key",
            "Provide X-Feeds-Key or Bearer token",
        ));
    };

    let Some(context) = state.authenticate(&presented) else {
        return Ok(unauthorized_response("invalid_api_key", "Key not recognized"));
    };

    debug!(
        target = "spapi.api",
        org_id = %context.org_id,
        api_key_id = %context.api_key_id,
        "request authenticated"
    );
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

fn extract_api_key(headers: &http::HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(http::header::AUTHORIZATION)
        && let Ok(raw) = value.to_str()
        && let Some(prefix) = raw.get(..6)
        && prefix.eq_ignore_ascii_case("bearer")
    {
        return Some(raw[6..].trim().to_string()).filter(|v| !v.is_empty());
    }
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn unauthorized_response(code: &str, message: &str) -> Response {
    let payload = ApiError {
        error: code.to_string(),
        detail: Some(message.to_string()),
    };
    (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
}
