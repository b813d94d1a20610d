//! Thin client over the Telegram Bot API.

use serde::Deserialize;
use serde_json::Value;

use crate::error::GatewayError;

/// Media attachment kinds accepted by `POST /send-file`.
///
/// Closed set: an unknown tag fails deserialization before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Photo,
    Document,
    Audio,
    Voice,
    Video,
}

impl FileKind {
    /// Bot API method used to send this kind of attachment.
    pub fn api_method(self) -> &'static str {
        match self {
            FileKind::Photo => "sendPhoto",
            FileKind::Document => "sendDocument",
            FileKind::Audio => "sendAudio",
            FileKind::Voice => "sendVoice",
            FileKind::Video => "sendVideo",
        }
    }

    /// Name of the JSON field that carries the file URL in the payload.
    pub fn payload_field(self) -> &'static str {
        match self {
            FileKind::Photo => "photo",
            FileKind::Document => "document",
            FileKind::Audio => "audio",
            FileKind::Voice => "voice",
            FileKind::Video => "video",
        }
    }
}

/// Client for outbound Bot API calls. Cheap to clone.
///
/// The token is embedded in request URLs per the Bot API convention and is
/// never logged.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(http: reqwest::Client, api_url: String, token: String) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Send a text message; returns Telegram's JSON response verbatim.
    pub async fn send_message(&self, chat_id: &Value, text: &str) -> Result<Value, GatewayError> {
        let mut payload = serde_json::Map::new();
        payload.insert("chat_id".to_string(), chat_id.clone());
        payload.insert("text".to_string(), Value::String(text.to_string()));
        self.call("sendMessage", Value::Object(payload)).await
    }

    /// Send a media attachment by URL via the method matching `kind`.
    pub async fn send_file(
        &self,
        chat_id: &Value,
        kind: FileKind,
        file_url: &str,
    ) -> Result<Value, GatewayError> {
        let mut payload = serde_json::Map::new();
        payload.insert("chat_id".to_string(), chat_id.clone());
        payload.insert(
            kind.payload_field().to_string(),
            Value::String(file_url.to_string()),
        );
        self.call(kind.api_method(), Value::Object(payload)).await
    }

    /// Fetch a file from Telegram file storage. The response is returned
    /// unread so the caller can stream its body.
    pub async fn fetch_file(&self, file_path: &str) -> Result<reqwest::Response, GatewayError> {
        let url = format!("{}/file/bot{}/{}", self.api_url, self.token, file_path);
        self.http
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::Telegram(format!("Telegram file fetch failed: {e}")))
    }

    async fn call(&self, method: &str, payload: Value) -> Result<Value, GatewayError> {
        let url = format!("{}/bot{}/{}", self.api_url, self.token, method);
        let response = self
            .http
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Telegram(format!("Telegram {method} request failed: {e}")))?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            GatewayError::Telegram(format!("Telegram {method} returned a non-JSON response: {e}"))
        })?;

        tracing::debug!(method, status = status.as_u16(), "Telegram API call complete");
        Ok(body)
    }
}
