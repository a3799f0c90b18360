//! Route handlers.
//!
//! Bodies are taken as raw bytes so malformed JSON maps to the same
//! `{success: false, error}` shape as every other failure. Hub calls are
//! synchronous and run on the blocking pool.

use super::AppState;
use crate::error::{BridgeError, Result};
use crate::registration::RegistrationRequest;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use log::{debug, error};
use serde_json::{Map, Value, json};

const PING_MESSAGE: &str = "Desktop App integration is loaded";
const REGISTRATION_INFO: &str =
    "Desktop App registration API; use POST with device_id and device_name";

fn parse_object(body: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(BridgeError::validation("Invalid JSON")),
    }
}

/// Run a synchronous hub operation off the async workers.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BridgeError::IoError(std::io::Error::other(e)))?
}

pub async fn ping() -> Json<Value> {
    Json(json!({"message": PING_MESSAGE}))
}

pub async fn registration_info() -> Json<Value> {
    Json(json!({"message": REGISTRATION_INFO}))
}

pub async fn register(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>> {
    let data = parse_object(&body)?;
    let request: RegistrationRequest = serde_json::from_value(Value::Object(data))
        .map_err(|e| BridgeError::validation(format!("Invalid registration: {}", e)))?;
    let device_id = request.device_id.clone().unwrap_or_default();

    let hub = state.hub.clone();
    let outcome = blocking(move || hub.register(request))
        .await
        .inspect_err(|e| match e {
            BridgeError::Validation(msg) => debug!("[HTTP] Registration rejected: {}", msg),
            other => error!("[HTTP] Failed to register device {}: {}", device_id, other),
        })?;

    Ok(Json(json!({
        "success": true,
        "webhook_id": outcome.secret_handle,
    })))
}

pub async fn webhook(
    State(state): State<AppState>,
    Path(secret_handle): Path<String>,
    body: Bytes,
) -> Result<Json<Value>> {
    let mut data = parse_object(&body)?;
    let command_type = match data.remove("type") {
        Some(Value::String(t)) if !t.is_empty() => t,
        _ => return Err(BridgeError::validation("Missing 'type' field")),
    };
    let payload = data.remove("data").unwrap_or(Value::Null);

    let webhooks = state.webhooks.clone();
    let response = blocking(move || webhooks.dispatch(&secret_handle, &command_type, payload)).await?;
    Ok(Json(response))
}
