//! Vote intents and the closed rejection taxonomy.

use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Off-chain authorization a voter produces for the relayer.
///
/// The signature covers `{pollId, candidateId, voter}` under an EIP-712
/// domain bound to one contract deployment and one chain, so an intent is
/// only meaningful for the deployment the relayer is configured for.
/// Intents are ephemeral: the relayer never persists them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteIntent {
	pub poll_id: u64,
	pub candidate_id: u16,
	pub voter: Address,
	pub signature: Bytes,
	/// Empty for public polls.
	#[serde(default)]
	pub merkle_proof: Vec<B256>,
}

/// Why a vote attempt was refused, either by the eligibility pre-check or
/// by the ledger itself.
///
/// The set is closed so callers can tell "retry is pointless" apart from
/// "retry might help" without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
	PollNotFound,
	PollEnded,
	InvalidCandidate,
	AlreadyVoted,
	PollFull,
	/// The voter address is the relayer's own signing address.
	RelayerSelfVote,
	RelayerNotAuthorized,
	RelayerUnderfunded,
	CreatorUnderfunded,
	NotWhitelisted,
	BadSignature,
	NonceConflict,
	GasError,
	Unknown,
}

impl RejectionReason {
	/// Stable machine-readable code.
	pub fn code(&self) -> &'static str {
		match self {
			Self::PollNotFound => "poll_not_found",
			Self::PollEnded => "poll_ended",
			Self::InvalidCandidate => "invalid_candidate",
			Self::AlreadyVoted => "already_voted",
			Self::PollFull => "poll_full",
			Self::RelayerSelfVote => "relayer_self_vote",
			Self::RelayerNotAuthorized => "relayer_not_authorized",
			Self::RelayerUnderfunded => "relayer_underfunded",
			Self::CreatorUnderfunded => "creator_underfunded",
			Self::NotWhitelisted => "not_whitelisted",
			Self::BadSignature => "bad_signature",
			Self::NonceConflict => "nonce_conflict",
			Self::GasError => "gas_error",
			Self::Unknown => "unknown",
		}
	}

	/// Default human-readable message when the ledger gave no better text.
	pub fn message(&self) -> &'static str {
		match self {
			Self::PollNotFound => "Poll does not exist",
			Self::PollEnded => "Poll ended",
			Self::InvalidCandidate => "Invalid candidate",
			Self::AlreadyVoted => "Already voted",
			Self::PollFull => "Poll full",
			Self::RelayerSelfVote => "Relayer cannot vote for itself",
			Self::RelayerNotAuthorized => "Relayer is not authorized on the voting contract",
			Self::RelayerUnderfunded => "Relayer underfunded",
			Self::CreatorUnderfunded => "Creator underfunded",
			Self::NotWhitelisted => "Voter is not whitelisted for this poll",
			Self::BadSignature => "Bad signature",
			Self::NonceConflict => "Nonce conflict",
			Self::GasError => "Gas error",
			Self::Unknown => "Vote submission failed",
		}
	}

	/// Operator-side problems: the voter did nothing wrong and the caller
	/// should see "service unavailable" rather than a rejection.
	pub fn is_infrastructure(&self) -> bool {
		matches!(
			self,
			Self::RelayerNotAuthorized
				| Self::RelayerUnderfunded
				| Self::NonceConflict
				| Self::GasError
		)
	}

	/// Whether retrying the same signed intent later could succeed.
	///
	/// `AlreadyVoted` and `BadSignature` are permanent for a given intent.
	pub fn is_retryable(&self) -> bool {
		matches!(
			self,
			Self::RelayerNotAuthorized
				| Self::RelayerUnderfunded
				| Self::CreatorUnderfunded
				| Self::NonceConflict
				| Self::GasError
				| Self::Unknown
		)
	}
}

impl fmt::Display for RejectionReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.code())
	}
}
