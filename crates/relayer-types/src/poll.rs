//! Poll state as observed on the ledger.
//!
//! Snapshots are never cached beyond a single eligibility check: poll state
//! only moves forward, but the relayer must never act on a view that lags
//! a concurrently confirmed vote.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Read-only view of a poll fetched at check time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSnapshot {
	/// Poll identifier.
	pub poll_id: u64,
	/// Human-readable title.
	pub title: String,
	/// Account that created and funds the poll.
	pub creator: Address,
	/// Unix timestamp (seconds) after which votes are refused.
	pub end_time: u64,
	/// Number of candidates; valid candidate ids are `0..candidate_count`.
	pub candidate_count: u64,
	/// Public polls need no whitelist proof.
	pub is_public: bool,
	/// Votes recorded so far.
	pub voter_count: u64,
	/// Cap on the number of votes.
	pub max_voters: u64,
}

impl PollSnapshot {
	/// Whether the poll has passed its end time at `now` (unix seconds).
	pub fn has_ended(&self, now: u64) -> bool {
		now > self.end_time
	}

	/// Whether `candidate_id` indexes into the candidate list.
	pub fn is_valid_candidate(&self, candidate_id: u16) -> bool {
		u64::from(candidate_id) < self.candidate_count
	}

	/// Whether the poll has reached its voter cap.
	pub fn is_full(&self) -> bool {
		self.voter_count >= self.max_voters
	}
}

/// Funds a poll creator has set aside to reimburse relayer gas.
///
/// The ledger keeps a general pool per creator plus optional per-relayer
/// sub-allocations; either one being non-zero lets the relayer proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreatorAllowance {
	/// General reimbursement pool in wei.
	pub general: U256,
	/// Amount earmarked for this relayer in wei.
	pub relayer: U256,
}

impl CreatorAllowance {
	pub fn is_funded(&self) -> bool {
		!self.general.is_zero() || !self.relayer.is_zero()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::utils::builders::PollSnapshotBuilder;

	#[test]
	fn test_poll_end_is_inclusive() {
		let poll = PollSnapshotBuilder::new().with_end_time(1_000).build();

		assert!(!poll.has_ended(999));
		assert!(!poll.has_ended(1_000));
		assert!(poll.has_ended(1_001));
	}

	#[test]
	fn test_candidate_bounds() {
		let poll = PollSnapshotBuilder::new().with_candidate_count(3).build();

		assert!(poll.is_valid_candidate(0));
		assert!(poll.is_valid_candidate(2));
		assert!(!poll.is_valid_candidate(3));
	}

	#[test]
	fn test_poll_full() {
		let poll = PollSnapshotBuilder::new()
			.with_voter_count(10)
			.with_max_voters(10)
			.build();
		assert!(poll.is_full());

		let poll = PollSnapshotBuilder::new()
			.with_voter_count(9)
			.with_max_voters(10)
			.build();
		assert!(!poll.is_full());
	}

	#[test]
	fn test_allowance_funded_by_either_pool() {
		assert!(!CreatorAllowance::default().is_funded());
		assert!(CreatorAllowance {
			general: U256::from(1u64),
			relayer: U256::ZERO,
		}
		.is_funded());
		assert!(CreatorAllowance {
			general: U256::ZERO,
			relayer: U256::from(1u64),
		}
		.is_funded());
	}
}
