pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod parser;
pub mod prompt;
pub mod query;
pub mod server;
pub mod state;
pub mod telemetry;

use crate::{config::AppConfig, server::Server};

/// Bootstraps the CRM query service using environment configuration.
pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    Server::new(config)?.run().await
}
