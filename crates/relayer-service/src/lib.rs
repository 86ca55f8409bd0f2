//! Gasless voting relayer service library.
//!
//! This library provides the HTTP API handlers, request validation and
//! server wiring for the relayer binary.

pub mod apis;
pub mod server;
pub mod validators;

use relayer_config::Config;
use relayer_core::RelayerEngine;
use relayer_ledger::{implementations::evm::alloy::AlloyLedger, LedgerService};
use std::sync::Arc;

/// Connects to the configured ledger and builds a ready engine.
///
/// Fails fast when the node is unreachable, serves a different chain or
/// the relayer account cannot be read.
pub async fn build_relayer_from_config(
	config: Config,
) -> Result<RelayerEngine, Box<dyn std::error::Error>> {
	let ledger = AlloyLedger::connect(&config).await?;
	let ledger = Arc::new(LedgerService::new(
		Arc::new(ledger),
		config.ledger_timeout(),
	));

	let engine = RelayerEngine::new(config, ledger);
	engine.initialize().await?;
	Ok(engine)
}
