//! Configuration module for the gasless voting relayer.
//!
//! Configuration comes from a TOML file whose string values may reference
//! environment variables as `${VAR}` or `${VAR:-default}`, or, when no file
//! is given, directly from the plain environment variables operators are
//! used to (`RPC_URL`, `CONTRACT_ADDRESS`, `RELAYER_PRIVATE_KEY`, ...).
//! Either way the result is validated once at startup so the service fails
//! fast instead of at its first submission.

pub mod builders;

pub use builders::config::ConfigBuilder;

use alloy_primitives::{Address, U256};
use regex::Regex;
use relayer_types::{without_0x_prefix, SecretString};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the relayer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Relayer identity and request handling.
	pub relayer: RelayerConfig,
	/// Connection to the ledger node and voting contract.
	pub ledger: LedgerConfig,
	/// Fixed gas and fee policy for submissions.
	#[serde(default)]
	pub gas: GasConfig,
	/// Confirmation monitoring ladder.
	#[serde(default)]
	pub monitor: MonitorConfig,
	/// HTTP API server.
	#[serde(default)]
	pub api: ApiConfig,
}

/// Configuration specific to the relayer instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayerConfig {
	/// Identifier used in logs.
	#[serde(default = "default_relayer_id")]
	pub id: String,
	/// Hex-encoded signing key of the relayer account.
	pub private_key: SecretString,
	/// Balance (wei) below which the relayer logs a low-funds warning.
	#[serde(with = "u256_decimal", default = "default_min_balance_warning")]
	pub min_balance_warning_wei: U256,
	/// Total budget for eligibility check plus submission, in milliseconds.
	#[serde(default = "default_request_budget_ms")]
	pub request_budget_ms: u64,
	/// Recover the EIP-712 signer locally before submitting.
	#[serde(default = "default_true")]
	pub verify_signatures: bool,
}

/// Configuration for the ledger connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
	/// HTTP JSON-RPC endpoint of the node.
	pub rpc_url: String,
	/// Deployed voting contract.
	pub contract_address: Address,
	/// Chain the contract lives on; also the EIP-712 domain chain id.
	pub chain_id: u64,
	/// Per-call timeout for every ledger operation, in milliseconds.
	#[serde(default = "default_ledger_timeout_ms")]
	pub timeout_ms: u64,
	/// EIP-712 domain name of the voting contract.
	#[serde(default = "default_eip712_name")]
	pub eip712_name: String,
	/// EIP-712 domain version of the voting contract.
	#[serde(default = "default_eip712_version")]
	pub eip712_version: String,
}

/// Fixed gas policy.
///
/// Submissions never estimate gas or follow the network's suggested fees:
/// a fixed generous limit and capped fees keep the worst-case cost of a vote
/// predictable for the creators who reimburse it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GasConfig {
	#[serde(default = "default_gas_limit")]
	pub gas_limit: u64,
	#[serde(default = "default_max_fee_per_gas_wei")]
	pub max_fee_per_gas_wei: u64,
	#[serde(default = "default_max_priority_fee_per_gas_wei")]
	pub max_priority_fee_per_gas_wei: u64,
	/// Fee increase, in percent, applied to a replacement transaction.
	#[serde(default = "default_replacement_bump_pct")]
	pub replacement_bump_pct: u32,
	/// How many times a nonce conflict is retried with a fresh nonce.
	#[serde(default = "default_max_nonce_retries")]
	pub max_nonce_retries: u32,
}

impl Default for GasConfig {
	fn default() -> Self {
		Self {
			gas_limit: default_gas_limit(),
			max_fee_per_gas_wei: default_max_fee_per_gas_wei(),
			max_priority_fee_per_gas_wei: default_max_priority_fee_per_gas_wei(),
			replacement_bump_pct: default_replacement_bump_pct(),
			max_nonce_retries: default_max_nonce_retries(),
		}
	}
}

/// Confirmation monitoring ladder.
///
/// The first receipt check happens `initial_check_seconds` after submission;
/// each entry of `backoff_seconds` schedules one further check. The total
/// number of checks is therefore `1 + backoff_seconds.len()`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
	#[serde(default = "default_initial_check_seconds")]
	pub initial_check_seconds: u64,
	#[serde(default = "default_backoff_seconds")]
	pub backoff_seconds: Vec<u64>,
	/// Number of receipt-less checks after which the replacement is sent.
	#[serde(default = "default_replace_after_checks")]
	pub replace_after_checks: u32,
}

impl Default for MonitorConfig {
	fn default() -> Self {
		Self {
			initial_check_seconds: default_initial_check_seconds(),
			backoff_seconds: default_backoff_seconds(),
			replace_after_checks: default_replace_after_checks(),
		}
	}
}

impl MonitorConfig {
	pub fn initial_delay(&self) -> Duration {
		Duration::from_secs(self.initial_check_seconds)
	}

	pub fn max_checks(&self) -> u32 {
		1 + self.backoff_seconds.len() as u32
	}
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			host: default_api_host(),
			port: default_api_port(),
		}
	}
}

fn default_relayer_id() -> String {
	"gasless-relayer".to_string()
}

fn default_min_balance_warning() -> U256 {
	U256::from(100_000_000_000_000_000u64) // 0.1 ETH
}

fn default_request_budget_ms() -> u64 {
	15_000
}

fn default_true() -> bool {
	true
}

fn default_ledger_timeout_ms() -> u64 {
	8_000
}

fn default_eip712_name() -> String {
	"GaslessVoting".to_string()
}

fn default_eip712_version() -> String {
	"1".to_string()
}

fn default_gas_limit() -> u64 {
	500_000
}

fn default_max_fee_per_gas_wei() -> u64 {
	50_000_000_000 // 50 gwei
}

fn default_max_priority_fee_per_gas_wei() -> u64 {
	2_000_000_000 // 2 gwei
}

fn default_replacement_bump_pct() -> u32 {
	25
}

fn default_max_nonce_retries() -> u32 {
	3
}

fn default_initial_check_seconds() -> u64 {
	10
}

fn default_backoff_seconds() -> Vec<u64> {
	vec![15, 30, 60, 120]
}

fn default_replace_after_checks() -> u32 {
	1
}

fn default_api_host() -> String {
	"0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
	3001
}

/// Serde helpers for U256 values written as decimal strings.
pub mod u256_decimal {
	use alloy_primitives::U256;
	use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.to_string().serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		U256::from_str_radix(s.trim(), 10).map_err(D::Error::custom)
	}
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {e}")))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)));
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl FromStr for Config {
	type Err = ConfigError;

	/// Parses TOML content after resolving environment references, then
	/// validates the result.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

impl Config {
	/// Loads configuration from a TOML file.
	///
	/// A `.env` file in the working directory is loaded first so that
	/// `${VAR}` references can be satisfied from it.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let _ = dotenvy::dotenv();
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await?;
		tracing::debug!(path = %path.display(), "Read configuration file");
		content.parse()
	}

	/// Builds configuration from plain environment variables.
	///
	/// Recognized variables: `RPC_URL`, `CONTRACT_ADDRESS`,
	/// `RELAYER_PRIVATE_KEY`, `CHAIN_ID`, `PORT` and
	/// `MIN_BALANCE_WARNING_WEI`. Everything else takes its default.
	pub fn from_env() -> Result<Self, ConfigError> {
		let _ = dotenvy::dotenv();

		let required = |name: &str| {
			std::env::var(name).map_err(|_| {
				ConfigError::Validation(format!("Environment variable '{name}' not found"))
			})
		};

		let contract_address = required("CONTRACT_ADDRESS")?
			.parse::<Address>()
			.map_err(|e| ConfigError::Validation(format!("Invalid CONTRACT_ADDRESS: {e}")))?;
		let chain_id = required("CHAIN_ID")?
			.parse::<u64>()
			.map_err(|e| ConfigError::Validation(format!("Invalid CHAIN_ID: {e}")))?;

		let mut api = ApiConfig::default();
		if let Ok(port) = std::env::var("PORT") {
			api.port = port
				.parse()
				.map_err(|e| ConfigError::Validation(format!("Invalid PORT: {e}")))?;
		}

		let min_balance_warning_wei = match std::env::var("MIN_BALANCE_WARNING_WEI") {
			Ok(value) => U256::from_str_radix(value.trim(), 10).map_err(|e| {
				ConfigError::Validation(format!("Invalid MIN_BALANCE_WARNING_WEI: {e}"))
			})?,
			Err(_) => default_min_balance_warning(),
		};

		let config = Config {
			relayer: RelayerConfig {
				id: default_relayer_id(),
				private_key: SecretString::from(required("RELAYER_PRIVATE_KEY")?),
				min_balance_warning_wei,
				request_budget_ms: default_request_budget_ms(),
				verify_signatures: default_true(),
			},
			ledger: LedgerConfig {
				rpc_url: required("RPC_URL")?,
				contract_address,
				chain_id,
				timeout_ms: default_ledger_timeout_ms(),
				eip712_name: default_eip712_name(),
				eip712_version: default_eip712_version(),
			},
			gas: GasConfig::default(),
			monitor: MonitorConfig::default(),
			api,
		};
		config.validate()?;
		Ok(config)
	}

	/// Validates the configuration to ensure all required fields are properly set.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.relayer.id.is_empty() {
			return Err(ConfigError::Validation("Relayer ID cannot be empty".into()));
		}

		let key_ok = self.relayer.private_key.with_exposed(|key| {
			let key = without_0x_prefix(key);
			key.len() == 64 && key.chars().all(|c| c.is_ascii_hexdigit())
		});
		if !key_ok {
			return Err(ConfigError::Validation(
				"Relayer private key must be 64 hex characters (32 bytes)".into(),
			));
		}

		if self.relayer.request_budget_ms == 0 {
			return Err(ConfigError::Validation(
				"request_budget_ms must be greater than zero".into(),
			));
		}

		if self.ledger.rpc_url.trim().is_empty() {
			return Err(ConfigError::Validation("Ledger RPC URL cannot be empty".into()));
		}
		if self.ledger.contract_address == Address::ZERO {
			return Err(ConfigError::Validation(
				"Contract address cannot be the zero address".into(),
			));
		}
		if self.ledger.timeout_ms == 0 {
			return Err(ConfigError::Validation(
				"Ledger timeout_ms must be greater than zero".into(),
			));
		}

		if self.gas.gas_limit == 0 {
			return Err(ConfigError::Validation("Gas limit cannot be zero".into()));
		}
		if self.gas.max_fee_per_gas_wei == 0 {
			return Err(ConfigError::Validation("max_fee_per_gas_wei cannot be zero".into()));
		}
		if self.gas.max_priority_fee_per_gas_wei > self.gas.max_fee_per_gas_wei {
			return Err(ConfigError::Validation(
				"Priority fee cannot exceed the max fee per gas".into(),
			));
		}
		// Nodes refuse replacements priced less than 10% above the original.
		if self.gas.replacement_bump_pct < 10 {
			return Err(ConfigError::Validation(
				"replacement_bump_pct must be at least 10".into(),
			));
		}

		if self.monitor.backoff_seconds.is_empty() {
			return Err(ConfigError::Validation(
				"Monitor backoff ladder cannot be empty".into(),
			));
		}
		if self.monitor.replace_after_checks == 0
			|| self.monitor.replace_after_checks >= self.monitor.max_checks()
		{
			return Err(ConfigError::Validation(format!(
				"replace_after_checks must be between 1 and {}",
				self.monitor.max_checks() - 1
			)));
		}

		Ok(())
	}

	pub fn request_budget(&self) -> Duration {
		Duration::from_millis(self.relayer.request_budget_ms)
	}

	pub fn ledger_timeout(&self) -> Duration {
		Duration::from_millis(self.ledger.timeout_ms)
	}
}
