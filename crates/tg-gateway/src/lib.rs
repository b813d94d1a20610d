//! tg-gateway: bidirectional HTTP relay between the Telegram Bot API and an
//! automation webhook, with a generic streaming reverse proxy.

pub mod config;
pub mod error;
pub mod proxy;
pub mod server;
pub mod stats;
pub mod telegram;
