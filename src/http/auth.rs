//! Host-level bearer check for the registration endpoint.

use super::AppState;
use crate::error::BridgeError;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use log::warn;

/// Reject the request unless it carries `Authorization: Bearer <token>`.
///
/// Passes everything through when no token is configured.
pub async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.access_token.as_deref() else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if presented == Some(expected) {
        next.run(request).await
    } else {
        warn!("[HTTP] Rejected unauthenticated request to {}", request.uri().path());
        BridgeError::Unauthorized.into_response()
    }
}
