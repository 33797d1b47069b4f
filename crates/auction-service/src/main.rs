use anyhow::{Context, Result};
use auction_config::{AuctionConfig, ConfigLoader};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	setup_tracing(&cli.log_level)?;

	let config = load_config(&cli).await?;

	match cli.command {
		Some(Command::Watch) | None => commands::watch(config, shutdown_signal()).await,
		Some(Command::Detail { auction_id }) => {
			commands::detail(config, auction_id, shutdown_signal()).await
		}
		Some(Command::Bid { auction_id, amount }) => {
			commands::bid(config, auction_id, &amount).await
		}
		Some(Command::Bids) => commands::placed_bids(config).await,
		Some(Command::Login { email, password }) => {
			commands::login(config, &email, &password).await
		}
		Some(Command::Validate) => {
			commands::validate(&config);
			Ok(())
		}
	}
}

async fn load_config(cli: &Cli) -> Result<AuctionConfig> {
	let mut loader = ConfigLoader::new();
	if let Some(path) = &cli.config {
		info!("Loading configuration from: {:?}", path);
		loader = loader.with_file(path);
	}

	loader.load().await.context("Failed to load configuration")
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.try_init()
		.context("Failed to initialize tracing")?;

	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			tracing::error!("Failed to listen for Ctrl+C: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			}
			Err(e) => {
				tracing::error!("Failed to install SIGTERM handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
