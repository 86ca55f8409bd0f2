//! Event types emitted by the confirmation monitor.
//!
//! The originating HTTP request has already returned by the time these are
//! produced, so they are the only place terminal outcomes surface.

use alloy_primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal outcome of a tracked submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptOutcome {
	/// A receipt with success status was observed.
	Confirmed {
		tx_hash: TxHash,
		/// True when the fee-bumped replacement won the race.
		via_replacement: bool,
		/// Result of re-reading `hasVoted` after confirmation; `None` when
		/// the ledger could not be reached for the check.
		vote_recorded: Option<bool>,
	},
	/// A receipt with failure status was observed.
	Reverted { tx_hash: TxHash, via_replacement: bool },
	/// No receipt after the full polling ladder; needs operator attention.
	Unresolved { tx_hashes: Vec<TxHash> },
}

impl AttemptOutcome {
	/// Whether this outcome should be raised to an operator.
	pub fn is_anomaly(&self) -> bool {
		match self {
			Self::Confirmed { vote_recorded, .. } => *vote_recorded == Some(false),
			Self::Reverted { .. } => false,
			Self::Unresolved { .. } => true,
		}
	}
}

/// Published once per attempt when it reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorEvent {
	pub attempt_id: Uuid,
	pub poll_id: u64,
	pub voter: Address,
	pub nonce: u64,
	pub outcome: AttemptOutcome,
}
