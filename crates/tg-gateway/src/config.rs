//! Configuration types and loading logic.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

/// Top-level gateway configuration.
///
/// Built once at startup and shared immutably with every handler.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub telegram: TelegramConfig,
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub proxy: ProxySettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server listen configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot access token. Required; startup fails without it.
    pub token: String,

    /// Base URL of the Bot API (overridable so tests can point at a mock).
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Downstream automation webhook configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Webhook URL that receives forwarded Telegram updates. Required.
    pub url: String,
}

/// Settings for the streaming proxy endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxySettings {
    /// Connect-phase timeout for upstream calls. The transfer itself is not
    /// bounded: relayed bodies can be arbitrarily large.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "tg_gateway=debug,info").
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
        }
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file and environment variables.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (TG_ prefix, __ for nesting)
    /// 2. TOML config file
    /// 3. Defaults
    pub fn load(config_path: &str) -> anyhow::Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("TG_").split("__"));
        Self::from_figment(figment)
    }

    fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config: GatewayConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.telegram.token.is_empty() {
            anyhow::bail!("telegram.token must not be empty (set TG_TELEGRAM__TOKEN)");
        }
        if self.webhook.url.is_empty() {
            anyhow::bail!("webhook.url must not be empty (set TG_WEBHOOK__URL)");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> anyhow::Result<GatewayConfig> {
        GatewayConfig::from_figment(Figment::from(Toml::string(toml)))
    }

    #[test]
    fn minimal_config_applies_defaults() {
        let config = from_toml(
            r#"
            [telegram]
            token = "123:abc"

            [webhook]
            url = "https://hooks.example/run"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.listen_address, "0.0.0.0:3000");
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
        assert_eq!(config.telegram.timeout_secs, 30);
        assert_eq!(config.proxy.timeout_secs, 30);
        assert_eq!(config.logging.log_level, "info");
    }

    #[test]
    fn missing_token_fails_startup() {
        let result = from_toml(
            r#"
            [webhook]
            url = "https://hooks.example/run"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_webhook_url_fails_startup() {
        let result = from_toml(
            r#"
            [telegram]
            token = "123:abc"

            [webhook]
            url = ""
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = from_toml(
            r#"
            [server]
            listen_address = "127.0.0.1:8080"

            [telegram]
            token = "123:abc"
            api_url = "http://localhost:9000"

            [webhook]
            url = "http://localhost:5678/webhook"

            [proxy]
            timeout_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.server.listen_address, "127.0.0.1:8080");
        assert_eq!(config.telegram.api_url, "http://localhost:9000");
        assert_eq!(config.proxy.timeout_secs, 10);
    }
}
