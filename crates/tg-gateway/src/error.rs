//! Gateway error taxonomy and its HTTP mapping.
//!
//! Startup configuration failures are `anyhow` errors in `main` and are
//! intentionally fatal. Everything else is caught at the handler boundary
//! and converted into a structured `{"error": ...}` response.

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed or incomplete caller input. No side effects have occurred.
    #[error("{0}")]
    Validation(String),

    /// The upstream target was unreachable or failed before response headers
    /// arrived. Never retried.
    #[error("{0}")]
    UpstreamConnect(String),

    /// A Telegram API or webhook call failed.
    #[error("{0}")]
    Telegram(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::UpstreamConnect(_) | GatewayError::Telegram(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (
            self.status(),
            axum::Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        assert_eq!(
            GatewayError::Validation("Missing url".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn upstream_and_telegram_map_to_500() {
        assert_eq!(
            GatewayError::UpstreamConnect("refused".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::Telegram("send failed".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
