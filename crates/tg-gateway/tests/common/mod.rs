//! Shared helpers for integration tests: mock upstream servers and a
//! gateway instance bound to an ephemeral port.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::Router;
use tg_gateway::config::{
    GatewayConfig, LoggingConfig, ProxySettings, ServerConfig, TelegramConfig, WebhookConfig,
};
use tg_gateway::server::{self, AppState};
use tg_gateway::stats::GatewayStats;
use tg_gateway::telegram::TelegramClient;

/// Token used by every test gateway; mock Bot API routes embed it.
#[allow(dead_code)]
pub const TEST_TOKEN: &str = "test-token";

/// Serve an axum router on an ephemeral local port, returning its address.
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Spawn a gateway wired to the given Telegram API and webhook URLs.
pub async fn spawn_gateway(api_url: &str, webhook_url: &str) -> SocketAddr {
    let config = GatewayConfig {
        server: ServerConfig {
            listen_address: "127.0.0.1:0".to_string(),
        },
        telegram: TelegramConfig {
            token: TEST_TOKEN.to_string(),
            api_url: api_url.to_string(),
            timeout_secs: 5,
        },
        webhook: WebhookConfig {
            url: webhook_url.to_string(),
        },
        proxy: ProxySettings { timeout_secs: 5 },
        logging: LoggingConfig::default(),
    };

    let client = reqwest::Client::new();
    let telegram = TelegramClient::new(
        client.clone(),
        config.telegram.api_url.clone(),
        config.telegram.token.clone(),
    );
    let state = AppState {
        config,
        telegram,
        proxy_client: client.clone(),
        webhook_client: client,
        stats: GatewayStats::new(),
    };

    spawn_server(server::router(state)).await
}

/// Shared hit counter for asserting how many requests a mock served.
#[derive(Clone, Default)]
pub struct HitCounter(Arc<AtomicUsize>);

impl HitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
