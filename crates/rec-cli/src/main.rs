use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rec_cli::commands;
use rec_cli::connections::connections_json_path;
use rec_cli::{Cli, Commands, Config, default_config_file};

/// Persists the effective settings for `--save`.
fn save_config(cli: &Cli, config: &Config) -> Result<()> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => default_config_file().context("could not determine config directory")?,
    };
    config.save_to(&path)?;
    tracing::info!(path = %path.display(), "saved configuration");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = Config::load_from(cli.config.as_deref(), &cli.overrides())
        .context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if cli.save {
        save_config(&cli, &config)?;
    }

    match &cli.command {
        None | Some(Commands::Run) => {
            let history_path = connections_json_path()?;
            commands::run::run(&config, &history_path).await?;
        }
        Some(Commands::Check) => {
            commands::check::run(&config).await?;
        }
        Some(Commands::Sanitize { title }) => {
            commands::sanitize::run(&mut io::stdout().lock(), title, &config)?;
        }
        Some(Commands::Config) => {
            commands::config::run(&mut io::stdout().lock(), &config)?;
        }
    }

    Ok(())
}
