//! Main entry point for the gasless voting relayer.
//!
//! Voters sign a vote off-chain; this service checks the vote is eligible,
//! submits it on-chain from the relayer's own account and watches the
//! transaction until it confirms.
//!
//! # Configuration
//!
//! 1. **File (--config)**: TOML file with `${VAR}` interpolation
//! 2. **Environment**: `RPC_URL`, `CONTRACT_ADDRESS`, `RELAYER_PRIVATE_KEY`
//!    and friends, read directly (a `.env` file is honoured)

use clap::Parser;
use relayer_config::Config;
use relayer_service::{build_relayer_from_config, server};
use std::path::PathBuf;

/// Command-line arguments for the relayer service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	///
	/// When omitted, configuration is read from environment variables.
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started relayer");

	let config = load_config(&args).await?;
	tracing::info!("Loaded configuration [{}]", config.relayer.id);

	let api_config = config.api.clone();
	let engine = build_relayer_from_config(config).await?;

	let shutdown = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!("Failed to listen for shutdown signal: {}", e);
			std::future::pending::<()>().await;
		}
		tracing::info!("Shutdown signal received");
	};

	let result = server::start_server(api_config, engine.clone(), shutdown).await;

	engine.shutdown();
	tracing::info!("Stopped relayer");
	result
}

async fn load_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
	if let Some(config_path) = &args.config {
		tracing::info!("Loading configuration from file: {:?}", config_path);
		return Config::from_file(config_path).await.map_err(Into::into);
	}

	tracing::info!("No --config given, reading configuration from environment");
	Config::from_env().map_err(Into::into)
}
