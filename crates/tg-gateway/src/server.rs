//! Axum HTTP server: router, handlers, graceful shutdown.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::Router;
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE};
use http::StatusCode;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::proxy::relay::{self, ProxyRequest};
use crate::stats::GatewayStats;
use crate::telegram::{FileKind, TelegramClient};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: GatewayConfig,
    pub telegram: TelegramClient,
    /// Client for /proxy relays; its own connect timeout, pool shared across
    /// relays but never serialized.
    pub proxy_client: reqwest::Client,
    /// Client for webhook forwards.
    pub webhook_client: reqwest::Client,
    pub stats: GatewayStats,
}

/// Build the gateway router. Exposed separately from [`run`] so integration
/// tests can bind it to an ephemeral port.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/proxy", any(handle_proxy))
        .route("/telegram", post(handle_telegram))
        .route("/send", post(handle_send))
        .route("/send-file", post(handle_send_file))
        .route("/telegram-file", get(handle_telegram_file))
        .route("/api/stats", get(handle_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Build and run the HTTP server.
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let listen_addr = state.config.server.listen_address.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "tg-gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("tg-gateway shut down gracefully");
    Ok(())
}

/// GET / — static liveness text.
async fn handle_root() -> impl IntoResponse {
    (StatusCode::OK, "tg-gateway is running")
}

/// ALL /proxy — the streaming relay core.
///
/// The inbound body only describes the upstream request, so reading it fully
/// is fine; the upstream response body is never buffered.
async fn handle_proxy(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    state.stats.inc_proxy_requests();

    // An absent body describes nothing; let validation report the missing url.
    let request: ProxyRequest = if body.is_empty() {
        ProxyRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(r) => r,
            Err(e) => {
                return GatewayError::Validation(format!("Invalid proxy request: {e}"))
                    .into_response();
            }
        }
    };

    match relay::relay(&state.proxy_client, request, state.stats.clone()).await {
        Ok(response) => response,
        Err(e) => {
            state.stats.inc_proxy_failures();
            tracing::warn!(error = %e, "Relay failed");
            e.into_response()
        }
    }
}

/// POST /telegram — forward the raw Telegram update to the automation webhook.
///
/// The downstream status is logged but never propagated: a non-success reply
/// here would make Telegram re-deliver the update.
async fn handle_telegram(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    state.stats.inc_telegram_updates();
    tracing::info!(bytes = body.len(), "Telegram update received");

    let result = state
        .webhook_client
        .post(&state.config.webhook.url)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await;

    match result {
        Ok(response) => {
            if !response.status().is_success() {
                tracing::warn!(
                    status = response.status().as_u16(),
                    "Webhook answered with non-success status"
                );
            }
            (StatusCode::OK, "OK").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Webhook forward failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "ERROR").into_response()
        }
    }
}

/// Extract a usable chat_id: a number or a non-empty string (numeric ids or
/// @channel usernames). Anything else counts as missing.
fn extract_chat_id(payload: &serde_json::Value) -> Option<&serde_json::Value> {
    payload.get("chat_id").filter(|v| match v {
        serde_json::Value::Number(_) => true,
        serde_json::Value::String(s) => !s.is_empty(),
        _ => false,
    })
}

/// POST /send — send a text message through the Bot API, echoing its JSON
/// response back to the caller.
async fn handle_send(
    State(state): State<Arc<AppState>>,
    axum::Json(payload): axum::Json<serde_json::Value>,
) -> Response {
    let chat_id = extract_chat_id(&payload);
    let text = payload
        .get("text")
        .and_then(|v| v.as_str())
        .filter(|t| !t.is_empty());

    let (chat_id, text) = match (chat_id, text) {
        (Some(c), Some(t)) => (c, t),
        _ => {
            return GatewayError::Validation("chat_id and text are required".to_string())
                .into_response();
        }
    };

    match state.telegram.send_message(chat_id, text).await {
        Ok(body) => {
            state.stats.inc_messages_sent();
            axum::Json(body).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Telegram send failed");
            e.into_response()
        }
    }
}

/// POST /send-file — send a typed media attachment by URL.
async fn handle_send_file(
    State(state): State<Arc<AppState>>,
    axum::Json(payload): axum::Json<serde_json::Value>,
) -> Response {
    let chat_id = extract_chat_id(&payload);
    let file_url = payload
        .get("file_url")
        .and_then(|v| v.as_str())
        .filter(|u| !u.is_empty());
    let kind_tag = payload.get("type").and_then(|v| v.as_str());

    let (chat_id, file_url, kind_tag) = match (chat_id, file_url, kind_tag) {
        (Some(c), Some(u), Some(k)) => (c, u, k),
        _ => {
            return GatewayError::Validation(
                "chat_id, type and file_url are required".to_string(),
            )
            .into_response();
        }
    };

    // Closed set of attachment kinds; unknown tags fail before any network call.
    let kind: FileKind =
        match serde_json::from_value(serde_json::Value::String(kind_tag.to_string())) {
            Ok(k) => k,
            Err(_) => {
                return GatewayError::Validation(format!(
                    "Unsupported type '{kind_tag}', expected one of: photo, document, audio, voice, video"
                ))
                .into_response();
            }
        };

    match state.telegram.send_file(chat_id, kind, file_url).await {
        Ok(body) => {
            state.stats.inc_files_sent();
            axum::Json(body).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Telegram file send failed");
            e.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileQuery {
    file_path: Option<String>,
}

/// GET /telegram-file — stream a file out of Telegram file storage with a
/// forced attachment disposition.
async fn handle_telegram_file(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileQuery>,
) -> Response {
    let file_path = match query.file_path.as_deref().filter(|p| !p.is_empty()) {
        Some(p) => p,
        None => {
            return GatewayError::Validation("Missing file_path".to_string()).into_response();
        }
    };

    let upstream = match state.telegram.fetch_file(file_path).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "Telegram file fetch failed");
            return e.into_response();
        }
    };

    if !upstream.status().is_success() {
        tracing::error!(
            status = upstream.status().as_u16(),
            "Telegram file fetch returned non-success status"
        );
        return GatewayError::Telegram("Failed to fetch file from Telegram".to_string())
            .into_response();
    }

    let content_type = upstream
        .headers()
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_DISPOSITION, "attachment");

    match builder.body(Body::from_stream(upstream.bytes_stream())) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build file response");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}

/// GET /api/stats — current gateway counters.
async fn handle_stats(State(state): State<Arc<AppState>>) -> Response {
    axum::Json(state.stats.snapshot()).into_response()
}

/// Wait for SIGINT (Ctrl+C) for graceful shutdown.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("Shutdown signal received, draining connections...");
}
