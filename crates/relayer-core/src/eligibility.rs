//! Read-only eligibility pre-check for vote intents.
//!
//! The checks are advisory: they save the relayer from paying for
//! transactions that would obviously revert, but the ledger's own execution
//! remains the final word. Every input is read fresh for each intent.

use crate::submitter::FeePolicy;
use relayer_ledger::{LedgerError, LedgerService};
use relayer_types::{
	current_timestamp, PollSnapshot, RejectionReason, RelayerAccount, VoteIntent,
};
use std::sync::Arc;
use tracing::instrument;

/// Verdict of an eligibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
	/// All checks passed; carries the state they were evaluated against.
	Eligible {
		snapshot: PollSnapshot,
		relayer: RelayerAccount,
	},
	Ineligible(RejectionReason),
}

impl Eligibility {
	pub fn is_eligible(&self) -> bool {
		matches!(self, Eligibility::Eligible { .. })
	}
}

/// Evaluates vote intents against current ledger state.
pub struct EligibilityChecker {
	ledger: Arc<LedgerService>,
	fees: FeePolicy,
}

impl EligibilityChecker {
	pub fn new(ledger: Arc<LedgerService>, fees: FeePolicy) -> Self {
		Self { ledger, fees }
	}

	/// Checks `intent` against the ledger as of now.
	pub async fn check_eligibility(&self, intent: &VoteIntent) -> Result<Eligibility, LedgerError> {
		self.check_at(intent, current_timestamp()).await
	}

	/// Checks `intent` against the ledger as of `now` (unix seconds).
	///
	/// Checks run in a fixed order and stop at the first failure:
	/// poll exists, poll still open, candidate in range, voter has not
	/// voted, poll not full, voter is not the relayer, a private poll has a
	/// proof, relayer authorized and funded, creator funded.
	#[instrument(skip_all, fields(poll_id = intent.poll_id, voter = %intent.voter))]
	pub async fn check_at(
		&self,
		intent: &VoteIntent,
		now: u64,
	) -> Result<Eligibility, LedgerError> {
		use RejectionReason::*;

		let snapshot = match self.ledger.get_poll_snapshot(intent.poll_id).await {
			Ok(snapshot) => snapshot,
			Err(LedgerError::NotFound(_)) => return Ok(Eligibility::Ineligible(PollNotFound)),
			Err(e) => return Err(e),
		};

		if snapshot.has_ended(now) {
			return Ok(Eligibility::Ineligible(PollEnded));
		}
		if !snapshot.is_valid_candidate(intent.candidate_id) {
			return Ok(Eligibility::Ineligible(InvalidCandidate));
		}
		if self.ledger.has_voted(intent.poll_id, intent.voter).await? {
			return Ok(Eligibility::Ineligible(AlreadyVoted));
		}
		if snapshot.is_full() {
			return Ok(Eligibility::Ineligible(PollFull));
		}
		if intent.voter == self.ledger.relayer_address() {
			return Ok(Eligibility::Ineligible(RelayerSelfVote));
		}
		// Membership itself is verified on-chain; only a missing proof is
		// certain to fail.
		if !snapshot.is_public && intent.merkle_proof.is_empty() {
			return Ok(Eligibility::Ineligible(NotWhitelisted));
		}

		let relayer = self.ledger.get_relayer_state().await?;
		if !relayer.authorized {
			tracing::warn!(relayer = %relayer.address, "Relayer is not authorized on the contract");
			return Ok(Eligibility::Ineligible(RelayerNotAuthorized));
		}
		let required = self.fees.worst_case_cost();
		if relayer.balance < required {
			tracing::warn!(
				balance = %relayer.balance,
				required = %required,
				"Relayer balance below worst-case submission cost"
			);
			return Ok(Eligibility::Ineligible(RelayerUnderfunded));
		}

		let allowance = self.ledger.get_creator_allowance(snapshot.creator).await?;
		if !allowance.is_funded() {
			return Ok(Eligibility::Ineligible(CreatorUnderfunded));
		}

		Ok(Eligibility::Eligible { snapshot, relayer })
	}
}
