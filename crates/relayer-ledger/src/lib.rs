//! Ledger client module for the gasless voting relayer.
//!
//! This module is the only place the relayer talks to the blockchain node.
//! It reads contract state, submits signed meta-vote transactions and polls
//! for receipts. There is no business logic here: every operation is plain
//! I/O, and [`LedgerService`] bounds each call with a timeout.

use alloy_primitives::{Address, TxHash};
use async_trait::async_trait;
use relayer_types::{CreatorAllowance, LedgerReceipt, PollSnapshot, RelayerAccount, VoteTransaction};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
	/// The node could not be reached, or the call timed out.
	#[error("Ledger unreachable: {0}")]
	Unreachable(String),
	/// The node or the contract refused the request.
	#[error("Ledger rejected: {0}")]
	Rejected(String),
	/// The requested entity does not exist on the ledger.
	#[error("Not found: {0}")]
	NotFound(String),
	/// The node answered with data that could not be decoded.
	#[error("Decode error: {0}")]
	Decode(String),
	/// Local setup problem (bad key, wrong chain, bad URL).
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl LedgerError {
	/// Whether the error says nothing about ledger state, only about our
	/// ability to reach it.
	pub fn is_unreachable(&self) -> bool {
		matches!(self, LedgerError::Unreachable(_))
	}
}

/// Trait defining the interface to the voting ledger.
///
/// Implementations hold the relayer's signing identity and a connection to
/// one deployed voting contract on one chain.
#[async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait LedgerInterface: Send + Sync {
	/// Address the relayer signs with.
	fn relayer_address(&self) -> Address;

	/// Voting contract this client is bound to.
	fn contract_address(&self) -> Address;

	/// Chain the contract is deployed on.
	fn chain_id(&self) -> u64;

	/// Reads a poll's current details.
	///
	/// Fails with [`LedgerError::NotFound`] when the poll does not exist.
	async fn get_poll_snapshot(&self, poll_id: u64) -> Result<PollSnapshot, LedgerError>;

	/// Checks the contract's vote bitmap for `voter` in `poll_id`.
	async fn has_voted(&self, poll_id: u64, voter: Address) -> Result<bool, LedgerError>;

	/// Reads the creator's general reimbursement pool and the amount
	/// earmarked for this relayer.
	async fn get_creator_allowance(&self, creator: Address)
		-> Result<CreatorAllowance, LedgerError>;

	/// Reads the relayer's balance, authorization flag and pending nonce.
	async fn get_relayer_state(&self) -> Result<RelayerAccount, LedgerError>;

	/// Next sequence number for the relayer, counting transactions still in
	/// the pending pool.
	async fn get_pending_nonce(&self) -> Result<u64, LedgerError>;

	/// Signs and broadcasts a transaction.
	///
	/// Returns as soon as the node accepts it into its pending pool; does
	/// not wait for inclusion.
	async fn submit(&self, tx: VoteTransaction) -> Result<TxHash, LedgerError>;

	/// Looks up the current receipt state of a transaction.
	async fn get_receipt(&self, hash: &TxHash) -> Result<LedgerReceipt, LedgerError>;
}

/// Service that bounds every ledger call with a timeout.
///
/// An elapsed timeout is reported as [`LedgerError::Unreachable`] so callers
/// never confuse a slow node with a ledger-level refusal.
pub struct LedgerService {
	implementation: Arc<dyn LedgerInterface>,
	timeout: Duration,
}

impl LedgerService {
	/// Creates a new LedgerService around a concrete implementation.
	pub fn new(implementation: Arc<dyn LedgerInterface>, timeout: Duration) -> Self {
		Self {
			implementation,
			timeout,
		}
	}

	async fn bounded<T>(
		&self,
		operation: &str,
		fut: impl Future<Output = Result<T, LedgerError>>,
	) -> Result<T, LedgerError> {
		match tokio::time::timeout(self.timeout, fut).await {
			Ok(result) => result,
			Err(_) => {
				tracing::warn!(
					operation,
					timeout_ms = self.timeout.as_millis() as u64,
					"Ledger call timed out"
				);
				Err(LedgerError::Unreachable(format!(
					"{} timed out after {}ms",
					operation,
					self.timeout.as_millis()
				)))
			},
		}
	}

	pub fn relayer_address(&self) -> Address {
		self.implementation.relayer_address()
	}

	pub fn contract_address(&self) -> Address {
		self.implementation.contract_address()
	}

	pub fn chain_id(&self) -> u64 {
		self.implementation.chain_id()
	}

	pub async fn get_poll_snapshot(&self, poll_id: u64) -> Result<PollSnapshot, LedgerError> {
		self.bounded(
			"get_poll_snapshot",
			self.implementation.get_poll_snapshot(poll_id),
		)
		.await
	}

	pub async fn has_voted(&self, poll_id: u64, voter: Address) -> Result<bool, LedgerError> {
		self.bounded("has_voted", self.implementation.has_voted(poll_id, voter))
			.await
	}

	pub async fn get_creator_allowance(
		&self,
		creator: Address,
	) -> Result<CreatorAllowance, LedgerError> {
		self.bounded(
			"get_creator_allowance",
			self.implementation.get_creator_allowance(creator),
		)
		.await
	}

	pub async fn get_relayer_state(&self) -> Result<RelayerAccount, LedgerError> {
		self.bounded("get_relayer_state", self.implementation.get_relayer_state())
			.await
	}

	pub async fn get_pending_nonce(&self) -> Result<u64, LedgerError> {
		self.bounded("get_pending_nonce", self.implementation.get_pending_nonce())
			.await
	}

	pub async fn submit(&self, tx: VoteTransaction) -> Result<TxHash, LedgerError> {
		self.bounded("submit", self.implementation.submit(tx)).await
	}

	pub async fn get_receipt(&self, hash: &TxHash) -> Result<LedgerReceipt, LedgerError> {
		self.bounded("get_receipt", self.implementation.get_receipt(hash))
			.await
	}
}
