pub mod models;
pub mod server;
pub mod config;
pub mod llm;
pub mod cli;
pub mod client;

use cli::Args;
use config::RelayConfig;
use log::info;
use server::{ api::AppState, Server };
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = RelayConfig::from_args(&args)?;

    info!("--- Relay Configuration ---");
    info!("Server Address: {}", config.addr);
    info!("Provider Base URL: {}", config.llm.base_url);
    info!(
        "Provider Credential: {}",
        if config.has_credential() { "configured" } else { "MISSING (/chat will answer 500)" }
    );
    info!("Chat Model: {}", config.llm.model);
    info!("Reasoning Effort: {}", config.llm.effort);
    info!("Provider Timeout: {}s", config.llm.timeout.as_secs());
    info!(
        "System Prompt: {}",
        args.system_prompt_path.as_deref().unwrap_or("built-in")
    );
    info!("Caller Auth: {}", if config.server_api_key.is_some() { "enabled" } else { "disabled" });
    if config.rate_limit_per_second > 0 {
        info!("Rate Limit: {} req/s", config.rate_limit_per_second);
    } else {
        info!("Rate Limit: disabled");
    }
    info!("Max Body Size: {} bytes", config.max_body_bytes);
    info!("TLS Enabled: {}", config.tls.is_some());
    info!("---------------------------");

    let state = AppState::from_config(config)?;
    let server = Server::new(state);
    server.run().await?;

    Ok(())
}
