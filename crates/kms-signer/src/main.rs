use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use casper_kms_signer::{AppState, Config, KeysService, run};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();

    let state = AppState {
        keys: KeysService::new(config.key_management_service()?),
        mode: config.mode(),
    };

    run(config.host, config.port, state).await
}
