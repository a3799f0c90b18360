//! Mapping of [`BridgeError`] to HTTP responses.

use crate::error::BridgeError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

impl BridgeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::Validation(_) | BridgeError::SerdeJsonError(_) => StatusCode::BAD_REQUEST,
            BridgeError::NotFound => StatusCode::GONE,
            BridgeError::Unauthorized => StatusCode::UNAUTHORIZED,
            BridgeError::Persistence(_) | BridgeError::IoError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            BridgeError::StartupCapability(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));
        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            BridgeError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(BridgeError::NotFound.status_code(), StatusCode::GONE);
        assert_eq!(
            BridgeError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            BridgeError::Persistence("disk full".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
