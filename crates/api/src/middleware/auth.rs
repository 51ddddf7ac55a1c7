//! Signed-request authentication middleware.
//!
//! Every protected request carries three headers: `X-App-Key`,
//! `X-Request-Time` (decimal unix seconds) and `X-Request-Signature`. The
//! signature is the UPPERCASE-hex HMAC-MD5 of the sorted parameter map
//! `{app_key, timestamp, path}` unioned with all query-string and (for
//! POST) form-encoded parameters; see `pushgate_common::signing`.
//!
//! The layer is only installed when an app key is configured; a deployment
//! without one runs unauthenticated by explicit choice, not through a
//! hidden bypass.

use std::collections::BTreeMap;

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use pushgate_common::error::AppError;
use pushgate_common::signing::sign_params;

use crate::state::AppState;

/// Maximum allowed distance between request time and server time.
const MAX_CLOCK_SKEW_SECS: i64 = 600;

fn header<'a>(req: &'a Request, name: &str) -> &'a str {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Verify the request signature; reject with 400 `{"err": ...}` before any
/// business logic runs.
pub async fn require_signature(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    match verify(&state, req).await {
        Ok(req) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}

async fn verify(state: &AppState, req: Request) -> Result<Request, AppError> {
    let Some(expected_key) = state.config.app_key.as_deref() else {
        return Ok(req);
    };
    let secret = state.config.app_secret.as_deref().unwrap_or("");

    let app_key = header(&req, "X-App-Key").to_string();
    if app_key != expected_key {
        return Err(AppError::Auth("Invalid X-App-Key".to_string()));
    }

    // an unparseable timestamp behaves as 0 and fails the window check
    let timestamp_raw = header(&req, "X-Request-Time").to_string();
    let timestamp: i64 = timestamp_raw.parse().unwrap_or(0);
    let now = Utc::now().timestamp();
    if (now - timestamp).abs() > MAX_CLOCK_SKEW_SECS {
        return Err(AppError::Auth("Invalid X-Request-Time".to_string()));
    }

    let signature = header(&req, "X-Request-Signature").to_string();

    let mut params = BTreeMap::new();
    params.insert("app_key".to_string(), app_key);
    params.insert("timestamp".to_string(), timestamp_raw);
    params.insert("path".to_string(), req.uri().path().to_string());

    if let Some(query) = req.uri().query() {
        // last value wins on duplicate keys
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params.insert(key.into_owned(), value.into_owned());
        }
    }

    let is_form_post = req.method() == Method::POST
        && header(&req, "Content-Type").starts_with("application/x-www-form-urlencoded");

    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|e| AppError::Internal(format!("read request body: {}", e)))?;

    if is_form_post {
        for (key, value) in url::form_urlencoded::parse(&bytes) {
            params.insert(key.into_owned(), value.into_owned());
        }
    }

    if sign_params(secret, &params) != signature {
        return Err(AppError::Auth("Invalid X-Request-Signature".to_string()));
    }

    // hand the buffered body back to the downstream extractors
    Ok(Request::from_parts(parts, Body::from(bytes)))
}
