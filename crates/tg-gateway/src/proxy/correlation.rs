//! Correlation ID generation for relay tracing.

use uuid::Uuid;

/// Header attached to outbound relay requests so upstream logs can be
/// matched against gateway spans. Never echoed into the caller's response.
pub const CORRELATION_HEADER: &str = "x-gateway-request-id";

/// Generate a new correlation ID (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
