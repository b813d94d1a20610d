//! The streaming relay core.
//!
//! Forwards a caller-described upstream request and streams the response
//! body back verbatim: no parsing, no transformation, no full buffering.
//! Only content-type, content-disposition and content-length are copied
//! from the upstream response; every other header is dropped so hop-by-hop
//! and security-sensitive headers never leak through.

use std::collections::HashMap;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use futures_core::Stream;
use http::header::{
    HeaderName, HeaderValue, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE,
};
use http::{Method, StatusCode};
use serde::Deserialize;
use tracing::Instrument;

use super::correlation::{self, CORRELATION_HEADER};
use crate::error::GatewayError;
use crate::stats::GatewayStats;

/// Response headers copied from the upstream. Everything else is dropped.
const ALLOWED_RESPONSE_HEADERS: [HeaderName; 3] =
    [CONTENT_TYPE, CONTENT_DISPOSITION, CONTENT_LENGTH];

/// Caller's description of the upstream request.
#[derive(Debug, Default, Deserialize)]
pub struct ProxyRequest {
    /// Absolute target URL. Required; its absence fails before any I/O.
    pub url: Option<String>,

    /// HTTP verb, defaults to GET.
    pub method: Option<String>,

    /// Headers forwarded verbatim to the upstream.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Optional payload, serialized as JSON text before transmission.
    pub body: Option<serde_json::Value>,
}

/// A pass-through body stream that counts relayed bytes.
///
/// Chunks flow through unchanged. On completion the byte total is recorded
/// into gateway stats and onto the relay span. A mid-stream upstream error
/// is logged and surfaced, which cuts the connection — headers were already
/// sent at that point, so the caller observes a truncated body rather than
/// an error status.
struct RelayBody {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    stats: GatewayStats,
    relayed: u64,
    span: tracing::Span,
    start: Instant,
}

impl Stream for RelayBody {
    type Item = Result<Bytes, reqwest::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                self.relayed += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                self.stats.inc_proxy_failures();
                tracing::error!(
                    parent: &self.span,
                    error = %e,
                    relayed_bytes = self.relayed,
                    "Upstream stream failed mid-transfer, truncating response"
                );
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                self.stats.add_relayed_bytes(self.relayed);
                self.span.record("relayed_bytes", self.relayed);
                tracing::debug!(
                    parent: &self.span,
                    relayed_bytes = self.relayed,
                    total_ms = self.start.elapsed().as_millis() as u64,
                    "Relay stream complete"
                );
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Forward one described request upstream and stream the response back.
///
/// Exactly one upstream call per invocation; validation failures return
/// before any network I/O, connect failures map to [`GatewayError::UpstreamConnect`],
/// and no failure is ever retried.
pub async fn relay(
    client: &reqwest::Client,
    request: ProxyRequest,
    stats: GatewayStats,
) -> Result<Response, GatewayError> {
    let url = match request.url.as_deref() {
        Some(u) if !u.is_empty() => u.to_string(),
        _ => return Err(GatewayError::Validation("Missing url".to_string())),
    };

    let method = match request.method.as_deref() {
        None => Method::GET,
        Some(m) => Method::from_bytes(m.as_bytes())
            .map_err(|_| GatewayError::Validation(format!("Invalid method: {m}")))?,
    };

    let correlation_id = correlation::generate_id();
    let span = tracing::info_span!(
        "relay",
        correlation_id = %correlation_id,
        method = %method,
        url = %url,
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
        relayed_bytes = tracing::field::Empty,
    );
    let start = Instant::now();

    async move {
        let mut req_builder = client
            .request(method, &url)
            .header(CORRELATION_HEADER, correlation_id.as_str());

        for (name, value) in &request.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| GatewayError::Validation(format!("Invalid header name: {name}")))?;
            let header_value = HeaderValue::from_str(value).map_err(|_| {
                GatewayError::Validation(format!("Invalid value for header {name}"))
            })?;
            req_builder = req_builder.header(header_name, header_value);
        }

        if let Some(body) = &request.body {
            req_builder = req_builder.json(body);
        }

        // Suspends until upstream response headers arrive; the body is
        // consumed incrementally below, never materialized in full.
        let upstream = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::UpstreamConnect(format!("Upstream timeout: {e}"))
            } else {
                GatewayError::UpstreamConnect(format!("Upstream connection error: {e}"))
            }
        })?;

        let status = upstream.status();
        let latency = start.elapsed().as_millis() as u64;
        let span = tracing::Span::current();
        span.record("status", status.as_u16());
        span.record("latency_ms", latency);
        tracing::info!(
            status = status.as_u16(),
            latency_ms = latency,
            "Upstream headers received"
        );

        // Mirror the upstream status and the allow-listed headers before any
        // body byte is written. Absent headers are omitted, never defaulted.
        let mut builder = Response::builder()
            .status(StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY));
        for name in ALLOWED_RESPONSE_HEADERS {
            if let Some(value) = upstream.headers().get(&name) {
                builder = builder.header(name, value.clone());
            }
        }

        let relay_body = RelayBody {
            inner: Box::pin(upstream.bytes_stream()),
            stats,
            relayed: 0,
            span: span.clone(),
            start,
        };

        builder
            .body(Body::from_stream(relay_body))
            .map_err(|e| GatewayError::UpstreamConnect(format!("Failed to build relay response: {e}")))
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> reqwest::Client {
        reqwest::Client::new()
    }

    #[tokio::test]
    async fn missing_url_fails_before_any_io() {
        let result = relay(&test_client(), ProxyRequest::default(), GatewayStats::new()).await;
        match result {
            Err(GatewayError::Validation(msg)) => assert_eq!(msg, "Missing url"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_url_fails_before_any_io() {
        let request = ProxyRequest {
            url: Some(String::new()),
            ..Default::default()
        };
        let result = relay(&test_client(), request, GatewayStats::new()).await;
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }

    #[tokio::test]
    async fn invalid_method_is_rejected() {
        let request = ProxyRequest {
            url: Some("http://example.test/".to_string()),
            method: Some("NOT A VERB".to_string()),
            ..Default::default()
        };
        let result = relay(&test_client(), request, GatewayStats::new()).await;
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }

    #[tokio::test]
    async fn invalid_header_name_is_rejected() {
        let mut headers = HashMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        let request = ProxyRequest {
            url: Some("http://example.test/".to_string()),
            headers,
            ..Default::default()
        };
        let result = relay(&test_client(), request, GatewayStats::new()).await;
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }

    #[test]
    fn proxy_request_deserializes_with_defaults() {
        let request: ProxyRequest = serde_json::from_str("{}").unwrap();
        assert!(request.url.is_none());
        assert!(request.method.is_none());
        assert!(request.headers.is_empty());
        assert!(request.body.is_none());
    }

    #[test]
    fn proxy_request_deserializes_full_shape() {
        let request: ProxyRequest = serde_json::from_str(
            r#"{
                "url": "https://example.test/file.bin",
                "method": "POST",
                "headers": {"authorization": "Bearer t"},
                "body": {"k": "v"}
            }"#,
        )
        .unwrap();
        assert_eq!(request.url.as_deref(), Some("https://example.test/file.bin"));
        assert_eq!(request.method.as_deref(), Some("POST"));
        assert_eq!(request.headers["authorization"], "Bearer t");
        assert_eq!(request.body.unwrap()["k"], "v");
    }
}
