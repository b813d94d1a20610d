//! tg-gateway: bidirectional HTTP relay between the Telegram Bot API and an
//! automation webhook.

use std::time::Duration;

use tg_gateway::config::GatewayConfig;
use tg_gateway::server::{self, AppState};
use tg_gateway::stats::GatewayStats;
use tg_gateway::telegram::TelegramClient;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1).cloned())
        .or_else(|| args.get(1).filter(|a| !a.starts_with('-')).cloned())
        .or_else(|| std::env::var("TG_GATEWAY_CONFIG").ok())
        .unwrap_or_else(|| "tg-gateway.toml".to_string());

    // Load configuration. Fails fast — before binding the listener — when
    // the Telegram token or webhook URL is missing.
    let config = GatewayConfig::load(&config_path)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        init_tracing(&config.logging.log_level);

        tracing::info!(
            config_path = %config_path,
            listen_address = %config.server.listen_address,
            webhook_url = %config.webhook.url,
            "Starting tg-gateway"
        );

        run(config).await
    })
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    // Connect-phase timeouts only: both clients stream response bodies of
    // unbounded size, which a total-request deadline would cut off.
    let api_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.telegram.timeout_secs))
        .build()?;

    let proxy_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.proxy.timeout_secs))
        .build()?;

    let telegram = TelegramClient::new(
        api_client.clone(),
        config.telegram.api_url.clone(),
        config.telegram.token.clone(),
    );

    let state = AppState {
        config,
        telegram,
        proxy_client,
        webhook_client: api_client,
        stats: GatewayStats::new(),
    };

    server::run(state).await
}
