//! Alloy-based ledger implementation.
//!
//! Talks to an EVM node over HTTP JSON-RPC. Reads go through `eth_call`
//! against the voting contract; writes are signed locally by the relayer's
//! wallet and broadcast with every transaction field set explicitly, so the
//! provider never estimates gas, fetches fees or picks a nonce on its own.

use crate::{LedgerError, LedgerInterface};
use alloy_json_rpc::RpcError;
use alloy_network::{EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolCall;
use alloy_transport::{layers::RetryBackoffLayer, TransportError};
use async_trait::async_trait;
use relayer_config::Config;
use relayer_types::{
	contracts::{IGaslessVoting, PollView},
	truncate_id, CreatorAllowance, LedgerReceipt, PollSnapshot, RelayerAccount, VoteTransaction,
};

/// Alloy-based EVM ledger client bound to one contract on one chain.
pub struct AlloyLedger {
	provider: DynProvider,
	relayer: Address,
	contract: Address,
	chain_id: u64,
}

impl AlloyLedger {
	/// Connects to the configured node and verifies it serves the expected
	/// chain before returning.
	pub async fn connect(config: &Config) -> Result<Self, LedgerError> {
		let signer = config
			.relayer
			.private_key
			.with_exposed(|key| key.parse::<PrivateKeySigner>())
			.map_err(|e| LedgerError::Configuration(format!("Invalid relayer key: {}", e)))?;
		let signer = signer.with_chain_id(Some(config.ledger.chain_id));
		let relayer = signer.address();

		let url = config.ledger.rpc_url.parse().map_err(|e| {
			LedgerError::Configuration(format!("Invalid RPC URL {}: {}", config.ledger.rpc_url, e))
		})?;

		// Retry transient transport failures and rate limits; the service-level
		// timeout still bounds the total time spent per call.
		let retry_layer = RetryBackoffLayer::new(
			3,   // max_retry
			500, // backoff: initial backoff in milliseconds
			10,  // cups: compute units per second
		);
		let client = RpcClient::builder().layer(retry_layer).http(url);

		let provider = ProviderBuilder::new()
			.wallet(EthereumWallet::from(signer))
			.connect_client(client)
			.erased();

		let node_chain_id = provider
			.get_chain_id()
			.await
			.map_err(|e| map_rpc_error("eth_chainId", e))?;
		if node_chain_id != config.ledger.chain_id {
			return Err(LedgerError::Configuration(format!(
				"Node reports chain id {} but configuration expects {}",
				node_chain_id, config.ledger.chain_id
			)));
		}

		tracing::info!(
			relayer = %relayer,
			contract = %config.ledger.contract_address,
			chain_id = node_chain_id,
			"Connected to ledger"
		);

		Ok(Self {
			provider,
			relayer,
			contract: config.ledger.contract_address,
			chain_id: node_chain_id,
		})
	}

	/// Executes a read-only contract call and decodes its return value.
	async fn call<C: SolCall>(&self, call: C) -> Result<C::Return, LedgerError> {
		let request = TransactionRequest::default()
			.with_to(self.contract)
			.with_input(Bytes::from(call.abi_encode()));

		let output = self
			.provider
			.call(request)
			.await
			.map_err(|e| map_rpc_error(C::SIGNATURE, e))?;

		C::abi_decode_returns(&output)
			.map_err(|e| LedgerError::Decode(format!("{}: {}", C::SIGNATURE, e)))
	}
}

/// Translates a transport error into the ledger taxonomy.
///
/// A JSON-RPC error response means the node processed the request and said
/// no; anything else means we never got a verdict.
fn map_rpc_error(operation: &str, err: TransportError) -> LedgerError {
	match err {
		RpcError::ErrorResp(payload) => LedgerError::Rejected(payload.message.to_string()),
		RpcError::DeserError { err, .. } => {
			LedgerError::Decode(format!("{}: {}", operation, err))
		},
		RpcError::LocalUsageError(err) => {
			LedgerError::Configuration(format!("{}: {}", operation, err))
		},
		other => LedgerError::Unreachable(format!("{}: {}", operation, other)),
	}
}

/// Converts the contract's poll view, treating an empty record as missing.
fn snapshot_from_view(poll_id: u64, view: PollView) -> Result<PollSnapshot, LedgerError> {
	if view.creator == Address::ZERO {
		return Err(LedgerError::NotFound(format!("Poll {} does not exist", poll_id)));
	}

	Ok(PollSnapshot {
		poll_id,
		title: view.title,
		creator: view.creator,
		end_time: view.endTime.saturating_to(),
		candidate_count: view.candidateCount.saturating_to(),
		is_public: view.isPublic,
		voter_count: view.voterCount.saturating_to(),
		max_voters: view.maxVoters.saturating_to(),
	})
}

/// Whether a revert reason says the poll id is unknown to the contract.
fn is_missing_poll_revert(message: &str) -> bool {
	let lower = message.to_ascii_lowercase();
	lower.contains("not exist") || lower.contains("invalid poll")
}

#[async_trait]
impl LedgerInterface for AlloyLedger {
	fn relayer_address(&self) -> Address {
		self.relayer
	}

	fn contract_address(&self) -> Address {
		self.contract
	}

	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	async fn get_poll_snapshot(&self, poll_id: u64) -> Result<PollSnapshot, LedgerError> {
		let view = self
			.call(IGaslessVoting::getPollDetailsCall {
				pollId: U256::from(poll_id),
			})
			.await
			.map_err(|e| match e {
				LedgerError::Rejected(msg) if is_missing_poll_revert(&msg) => {
					LedgerError::NotFound(format!("Poll {} does not exist", poll_id))
				},
				other => other,
			})?;

		snapshot_from_view(poll_id, view)
	}

	async fn has_voted(&self, poll_id: u64, voter: Address) -> Result<bool, LedgerError> {
		self.call(IGaslessVoting::hasVotedCall {
			pollId: U256::from(poll_id),
			voter,
		})
		.await
	}

	async fn get_creator_allowance(
		&self,
		creator: Address,
	) -> Result<CreatorAllowance, LedgerError> {
		let (general, relayer) = tokio::try_join!(
			self.call(IGaslessVoting::creatorFundsCall { creator }),
			self.call(IGaslessVoting::relayerAllowanceCall {
				creator,
				relayer: self.relayer,
			}),
		)?;

		Ok(CreatorAllowance { general, relayer })
	}

	async fn get_relayer_state(&self) -> Result<RelayerAccount, LedgerError> {
		let balance = async {
			self.provider
				.get_balance(self.relayer)
				.await
				.map_err(|e| map_rpc_error("eth_getBalance", e))
		};
		let nonce = self.get_pending_nonce();
		let authorized = self.call(IGaslessVoting::authorizedRelayersCall {
			relayer: self.relayer,
		});

		let (balance, nonce, authorized) = tokio::try_join!(balance, nonce, authorized)?;

		Ok(RelayerAccount {
			address: self.relayer,
			balance,
			authorized,
			nonce,
		})
	}

	async fn get_pending_nonce(&self) -> Result<u64, LedgerError> {
		self.provider
			.get_transaction_count(self.relayer)
			.pending()
			.await
			.map_err(|e| map_rpc_error("eth_getTransactionCount", e))
	}

	async fn submit(&self, tx: VoteTransaction) -> Result<TxHash, LedgerError> {
		let request = TransactionRequest::default()
			.with_from(self.relayer)
			.with_to(tx.to)
			.with_input(tx.data.clone())
			.with_chain_id(tx.chain_id)
			.with_nonce(tx.nonce)
			.with_gas_limit(tx.gas_limit)
			.with_max_fee_per_gas(tx.fees.max_fee_per_gas)
			.with_max_priority_fee_per_gas(tx.fees.max_priority_fee_per_gas);

		tracing::debug!(
			nonce = tx.nonce,
			gas_limit = tx.gas_limit,
			max_fee_per_gas = tx.fees.max_fee_per_gas,
			data_len = tx.data.len(),
			"Broadcasting meta-vote transaction"
		);

		let pending = self
			.provider
			.send_transaction(request)
			.await
			.map_err(|e| map_rpc_error("eth_sendRawTransaction", e))?;

		let hash = *pending.tx_hash();
		tracing::debug!(
			tx_hash = %truncate_id(&hash.to_string()),
			nonce = tx.nonce,
			"Accepted into pending pool"
		);
		Ok(hash)
	}

	async fn get_receipt(&self, hash: &TxHash) -> Result<LedgerReceipt, LedgerError> {
		let receipt = self
			.provider
			.get_transaction_receipt(*hash)
			.await
			.map_err(|e| map_rpc_error("eth_getTransactionReceipt", e))?;

		if let Some(receipt) = receipt {
			let block_number = receipt.block_number.unwrap_or(0);
			let gas_used = receipt.gas_used;
			return Ok(if receipt.status() {
				LedgerReceipt::Confirmed {
					hash: *hash,
					block_number,
					gas_used,
				}
			} else {
				LedgerReceipt::Reverted {
					hash: *hash,
					block_number,
					gas_used,
				}
			});
		}

		// No receipt yet: tell a transaction still in the pool apart from one
		// the node has never seen or has dropped.
		let known = self
			.provider
			.get_transaction_by_hash(*hash)
			.await
			.map_err(|e| map_rpc_error("eth_getTransactionByHash", e))?;

		Ok(match known {
			Some(_) => LedgerReceipt::Pending,
			None => LedgerReceipt::NotFound,
		})
	}
}
