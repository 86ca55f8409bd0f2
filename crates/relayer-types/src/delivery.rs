//! Transaction delivery types for meta-vote submission.
//!
//! This module defines the transaction the relayer signs and the receipt
//! states it can observe while a submission is in flight.

use alloy_primitives::{Address, Bytes, TxHash};
use serde::{Deserialize, Serialize};

/// EIP-1559 fee parameters attached to a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeParams {
	/// Maximum fee per gas unit in wei.
	pub max_fee_per_gas: u128,
	/// Maximum priority fee per gas unit in wei.
	pub max_priority_fee_per_gas: u128,
}

/// A fully specified meta-vote transaction ready to be signed.
///
/// Nonce, gas limit and fees are always set explicitly; nothing is left for
/// the provider to fill in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTransaction {
	/// Voting contract address.
	pub to: Address,
	/// ABI-encoded `metaVote` call.
	pub data: Bytes,
	pub chain_id: u64,
	pub nonce: u64,
	pub gas_limit: u64,
	pub fees: FeeParams,
}

impl VoteTransaction {
	/// Same transaction with different fees, used for replacements that
	/// must keep the original nonce.
	pub fn with_fees(&self, fees: FeeParams) -> Self {
		Self {
			fees,
			..self.clone()
		}
	}
}

/// Receipt lookup outcome for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerReceipt {
	/// Included and executed successfully.
	Confirmed {
		hash: TxHash,
		block_number: u64,
		gas_used: u64,
	},
	/// Included but execution reverted.
	Reverted {
		hash: TxHash,
		block_number: u64,
		gas_used: u64,
	},
	/// Known to the node but not yet included.
	Pending,
	/// Unknown to the node (dropped, or never propagated).
	NotFound,
}
