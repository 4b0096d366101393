//! Main entry point for the species-harvester CLI

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;
use species_harvester::cli::{Cli, Commands};

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("species_harvester=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Harvest(ref args) => args
            .execute(&cli)
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!(e)),
        Commands::ResolveTaxa(ref args) => args
            .execute(&cli)
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!(e)),
        Commands::Rename(ref args) => cli
            .load_config()
            .map_err(|e| anyhow::anyhow!(e))
            .and_then(|config| args.execute(&config, cli.output_format))
            .map(|_| ()),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }
}
