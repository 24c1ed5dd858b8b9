use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use chartcascade::Config;
use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "chartcascade starting");

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    cli::run(cli, config).await?;

    info!("chartcascade completed");
    Ok(())
}
