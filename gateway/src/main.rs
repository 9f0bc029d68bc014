use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use validation_gateway::{AppState, Config, RuleSet};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = start(Config::parse()).await {
        error!(error = %err, "gateway stopped");
        return Err(err);
    }
    Ok(())
}

async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config.resolve()?;
    info!(rules_dir = %settings.rules_dir.display(), "using rules directory");
    info!(schemas_dir = %settings.schemas_dir.display(), "using schemas directory");

    let rules = RuleSet::from_file(&settings.rules_file, &settings.schemas_dir)?;
    let state = AppState::new(rules, &settings);

    let addr = SocketAddr::new(settings.bind, settings.port);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    validation_gateway::run(listener, state).await?;
    Ok(())
}
