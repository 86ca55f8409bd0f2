//! Builder for creating Config instances with sensible defaults.
//!
//! Defaults target a local development node, which keeps tests short.

use crate::{ApiConfig, Config, GasConfig, LedgerConfig, MonitorConfig, RelayerConfig};
use alloy_primitives::{Address, U256};
use relayer_types::SecretString;

/// Builder for creating `Config` instances.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	relayer_id: String,
	private_key: String,
	min_balance_warning_wei: U256,
	request_budget_ms: u64,
	verify_signatures: bool,
	rpc_url: String,
	contract_address: Address,
	chain_id: u64,
	ledger_timeout_ms: u64,
	gas: GasConfig,
	monitor: MonitorConfig,
	api: ApiConfig,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			relayer_id: "test-relayer".to_string(),
			// Well-known development key #0 of local test nodes.
			private_key: "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
				.to_string(),
			min_balance_warning_wei: U256::from(100_000_000_000_000_000u64),
			request_budget_ms: 15_000,
			verify_signatures: true,
			rpc_url: "http://127.0.0.1:8545".to_string(),
			contract_address: Address::repeat_byte(0xcc),
			chain_id: 31337,
			ledger_timeout_ms: 8_000,
			gas: GasConfig::default(),
			monitor: MonitorConfig::default(),
			api: ApiConfig::default(),
		}
	}

	pub fn relayer_id(mut self, id: impl Into<String>) -> Self {
		self.relayer_id = id.into();
		self
	}

	pub fn private_key(mut self, key: impl Into<String>) -> Self {
		self.private_key = key.into();
		self
	}

	pub fn min_balance_warning_wei(mut self, wei: U256) -> Self {
		self.min_balance_warning_wei = wei;
		self
	}

	pub fn request_budget_ms(mut self, ms: u64) -> Self {
		self.request_budget_ms = ms;
		self
	}

	pub fn verify_signatures(mut self, verify: bool) -> Self {
		self.verify_signatures = verify;
		self
	}

	pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
		self.rpc_url = url.into();
		self
	}

	pub fn contract_address(mut self, address: Address) -> Self {
		self.contract_address = address;
		self
	}

	pub fn chain_id(mut self, chain_id: u64) -> Self {
		self.chain_id = chain_id;
		self
	}

	pub fn ledger_timeout_ms(mut self, ms: u64) -> Self {
		self.ledger_timeout_ms = ms;
		self
	}

	pub fn gas(mut self, gas: GasConfig) -> Self {
		self.gas = gas;
		self
	}

	pub fn monitor(mut self, monitor: MonitorConfig) -> Self {
		self.monitor = monitor;
		self
	}

	pub fn api_port(mut self, port: u16) -> Self {
		self.api.port = port;
		self
	}

	pub fn build(self) -> Config {
		Config {
			relayer: RelayerConfig {
				id: self.relayer_id,
				private_key: SecretString::from(self.private_key),
				min_balance_warning_wei: self.min_balance_warning_wei,
				request_budget_ms: self.request_budget_ms,
				verify_signatures: self.verify_signatures,
			},
			ledger: LedgerConfig {
				rpc_url: self.rpc_url,
				contract_address: self.contract_address,
				chain_id: self.chain_id,
				timeout_ms: self.ledger_timeout_ms,
				eip712_name: "GaslessVoting".to_string(),
				eip712_version: "1".to_string(),
			},
			gas: self.gas,
			monitor: self.monitor,
			api: self.api,
		}
	}
}
