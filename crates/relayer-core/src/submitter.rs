//! Meta-vote transaction construction and submission.
//!
//! The submitter never estimates gas and never asks the network for fee
//! suggestions. A fixed limit and capped fees keep the worst-case cost of a
//! vote known up front; the ledger reimburses the relayer a fixed notional
//! amount from creator funds regardless of what a vote actually consumed.

use crate::nonce::NonceManager;
use alloy_primitives::{Bytes, TxHash, U256};
use alloy_sol_types::SolCall;
use relayer_config::GasConfig;
use relayer_ledger::{LedgerError, LedgerService};
use relayer_types::{
	contracts::IGaslessVoting, truncate_id, FeeParams, RejectionReason, VoteIntent,
	VoteTransaction,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Errors that can occur while submitting a vote.
#[derive(Debug, Error)]
pub enum SubmissionError {
	/// The node or contract refused the transaction.
	#[error("{reason}: {detail}")]
	Rejected {
		reason: RejectionReason,
		/// Raw text reported by the ledger.
		detail: String,
	},
	/// The ledger gave no verdict.
	#[error(transparent)]
	Ledger(#[from] LedgerError),
}

/// Fixed fee policy applied to every submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
	pub gas_limit: u64,
	pub base: FeeParams,
	pub replacement_bump_pct: u32,
}

impl FeePolicy {
	pub fn from_config(gas: &GasConfig) -> Self {
		Self {
			gas_limit: gas.gas_limit,
			base: FeeParams {
				max_fee_per_gas: u128::from(gas.max_fee_per_gas_wei),
				max_priority_fee_per_gas: u128::from(gas.max_priority_fee_per_gas_wei),
			},
			replacement_bump_pct: gas.replacement_bump_pct,
		}
	}

	/// Fees for a first submission.
	pub fn initial(&self) -> FeeParams {
		self.base
	}

	/// Most a single submission can cost the relayer: the full gas limit at
	/// the capped fee.
	pub fn worst_case_cost(&self) -> U256 {
		U256::from(self.gas_limit) * U256::from(self.base.max_fee_per_gas)
	}

	/// Fees for a replacement of a transaction priced at `fees`.
	///
	/// Both components always strictly increase, even for tiny values where
	/// the percentage rounds to zero.
	pub fn bumped(&self, fees: FeeParams) -> FeeParams {
		let bump = |value: u128| {
			let raised = value.saturating_mul(100 + u128::from(self.replacement_bump_pct)) / 100;
			raised.max(value.saturating_add(1))
		};
		FeeParams {
			max_fee_per_gas: bump(fees.max_fee_per_gas),
			max_priority_fee_per_gas: bump(fees.max_priority_fee_per_gas),
		}
	}
}

/// Maps a ledger rejection message onto the closed reason taxonomy.
///
/// Matching is by substring on the lowercased text, most specific first:
/// contract revert strings are checked before generic node errors so a
/// revert that happens to mention funds is not mistaken for the relayer's
/// own balance problem.
pub fn classify_rejection(message: &str) -> RejectionReason {
	let msg = message.to_ascii_lowercase();
	let has = |needles: &[&str]| needles.iter().any(|n| msg.contains(n));

	if has(&["bad signature", "invalid signature", "ecdsa"]) {
		RejectionReason::BadSignature
	} else if has(&["already voted"]) {
		RejectionReason::AlreadyVoted
	} else if has(&["poll ended", "voting ended", "poll has ended"]) {
		RejectionReason::PollEnded
	} else if has(&["poll full", "max voters"]) {
		RejectionReason::PollFull
	} else if has(&["invalid candidate"]) {
		RejectionReason::InvalidCandidate
	} else if has(&["not whitelisted", "invalid proof", "merkle"]) {
		RejectionReason::NotWhitelisted
	} else if has(&["does not exist", "invalid poll"]) {
		RejectionReason::PollNotFound
	} else if has(&["not authorized", "unauthorized"]) {
		RejectionReason::RelayerNotAuthorized
	} else if has(&["creator", "insufficient allowance", "no funds"]) {
		RejectionReason::CreatorUnderfunded
	} else if has(&["insufficient funds"]) {
		RejectionReason::RelayerUnderfunded
	} else if has(&[
		"nonce too low",
		"nonce too high",
		"replacement transaction underpriced",
		"invalid nonce",
	]) {
		RejectionReason::NonceConflict
	} else if has(&[
		"intrinsic gas",
		"out of gas",
		"gas limit",
		"fee cap",
		"base fee",
		"underpriced",
	]) {
		RejectionReason::GasError
	} else {
		RejectionReason::Unknown
	}
}

/// A transaction the node has accepted into its pending pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedVote {
	pub tx_hash: TxHash,
	pub transaction: VoteTransaction,
}

impl SubmittedVote {
	pub fn nonce(&self) -> u64 {
		self.transaction.nonce
	}

	pub fn fees(&self) -> FeeParams {
		self.transaction.fees
	}
}

/// Builds and broadcasts meta-vote transactions.
pub struct VoteSubmitter {
	ledger: Arc<LedgerService>,
	nonces: NonceManager,
	policy: FeePolicy,
	max_nonce_retries: u32,
}

impl VoteSubmitter {
	pub fn new(
		ledger: Arc<LedgerService>,
		nonces: NonceManager,
		policy: FeePolicy,
		max_nonce_retries: u32,
	) -> Self {
		Self {
			ledger,
			nonces,
			policy,
			max_nonce_retries,
		}
	}

	pub fn policy(&self) -> &FeePolicy {
		&self.policy
	}

	/// Encodes the `metaVote` call for `intent` with explicit nonce and fees.
	pub fn build_transaction(
		&self,
		intent: &VoteIntent,
		nonce: u64,
		fees: FeeParams,
	) -> VoteTransaction {
		let call = IGaslessVoting::metaVoteCall {
			pollId: U256::from(intent.poll_id),
			candidateId: intent.candidate_id,
			voter: intent.voter,
			signature: intent.signature.clone(),
			merkleProof: intent.merkle_proof.clone(),
		};

		VoteTransaction {
			to: self.ledger.contract_address(),
			data: Bytes::from(call.abi_encode()),
			chain_id: self.ledger.chain_id(),
			nonce,
			gas_limit: self.policy.gas_limit,
			fees,
		}
	}

	pub fn nonces(&self) -> &NonceManager {
		&self.nonces
	}

	/// Submits a vote and returns once the node has accepted it.
	///
	/// Nonce conflicts are retried with a freshly read nonce up to the
	/// configured limit; every other rejection is returned to the caller.
	#[instrument(skip_all, fields(poll_id = intent.poll_id, voter = %intent.voter))]
	pub async fn submit_vote(&self, intent: &VoteIntent) -> Result<SubmittedVote, SubmissionError> {
		let mut retries = 0;
		loop {
			let lease = self.nonces.acquire(&self.ledger).await?;
			let transaction = self.build_transaction(intent, lease.nonce(), self.policy.initial());

			match self.ledger.submit(transaction.clone()).await {
				Ok(tx_hash) => {
					lease.commit();
					tracing::info!(
						tx_hash = %truncate_id(&tx_hash.to_string()),
						nonce = transaction.nonce,
						"Vote submitted"
					);
					return Ok(SubmittedVote {
						tx_hash,
						transaction,
					});
				},
				Err(LedgerError::Rejected(detail)) => {
					lease.invalidate();
					let reason = classify_rejection(&detail);
					if reason == RejectionReason::NonceConflict && retries < self.max_nonce_retries {
						retries += 1;
						tracing::warn!(
							nonce = transaction.nonce,
							retries,
							error = %detail,
							"Nonce conflict, retrying with a fresh nonce"
						);
						continue;
					}
					tracing::warn!(reason = %reason, error = %detail, "Submission rejected");
					return Err(SubmissionError::Rejected { reason, detail });
				},
				Err(e) => {
					lease.invalidate();
					tracing::error!(error = %e, "Submission failed");
					return Err(e.into());
				},
			}
		}
	}

	/// Re-broadcasts `original` with bumped fees and the same nonce.
	///
	/// Does not touch the nonce manager: the sequence number was already
	/// consumed by the original, and whichever of the two is mined first
	/// invalidates the other.
	#[instrument(skip_all, fields(nonce = original.nonce))]
	pub async fn replace(&self, original: &VoteTransaction) -> Result<SubmittedVote, SubmissionError> {
		let transaction = original.with_fees(self.policy.bumped(original.fees));

		match self.ledger.submit(transaction.clone()).await {
			Ok(tx_hash) => {
				tracing::info!(
					tx_hash = %truncate_id(&tx_hash.to_string()),
					max_fee_per_gas = transaction.fees.max_fee_per_gas,
					"Replacement submitted"
				);
				Ok(SubmittedVote {
					tx_hash,
					transaction,
				})
			},
			Err(LedgerError::Rejected(detail)) => Err(SubmissionError::Rejected {
				reason: classify_rejection(&detail),
				detail,
			}),
			Err(e) => Err(e.into()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use mockall::Sequence;
	use relayer_ledger::MockLedgerInterface;
	use relayer_types::utils::builders::VoteIntentBuilder;
	use std::time::Duration;

	fn policy() -> FeePolicy {
		FeePolicy {
			gas_limit: 500_000,
			base: FeeParams {
				max_fee_per_gas: 50_000_000_000,
				max_priority_fee_per_gas: 2_000_000_000,
			},
			replacement_bump_pct: 25,
		}
	}

	fn mock_with_identity() -> MockLedgerInterface {
		let mut mock = MockLedgerInterface::new();
		mock.expect_contract_address()
			.return_const(alloy_primitives::Address::repeat_byte(0xcc));
		mock.expect_chain_id().return_const(31337u64);
		mock
	}

	fn submitter(mock: MockLedgerInterface) -> VoteSubmitter {
		let ledger = Arc::new(LedgerService::new(Arc::new(mock), Duration::from_secs(1)));
		VoteSubmitter::new(ledger, NonceManager::new(), policy(), 3)
	}

	#[test]
	fn test_worst_case_cost() {
		assert_eq!(
			policy().worst_case_cost(),
			U256::from(25_000_000_000_000_000u64)
		);
	}

	#[test]
	fn test_bump_is_strictly_higher() {
		let bumped = policy().bumped(policy().base);
		assert_eq!(bumped.max_fee_per_gas, 62_500_000_000);
		assert_eq!(bumped.max_priority_fee_per_gas, 2_500_000_000);

		let tiny = policy().bumped(FeeParams {
			max_fee_per_gas: 1,
			max_priority_fee_per_gas: 0,
		});
		assert_eq!(tiny.max_fee_per_gas, 2);
		assert_eq!(tiny.max_priority_fee_per_gas, 1);
	}

	#[test]
	fn test_classify_rejection() {
		let cases = [
			("execution reverted: Bad signature", RejectionReason::BadSignature),
			("execution reverted: Already voted", RejectionReason::AlreadyVoted),
			("execution reverted: Poll ended", RejectionReason::PollEnded),
			("execution reverted: Poll full", RejectionReason::PollFull),
			("execution reverted: Not whitelisted", RejectionReason::NotWhitelisted),
			(
				"execution reverted: Insufficient creator funds",
				RejectionReason::CreatorUnderfunded,
			),
			(
				"insufficient funds for gas * price + value",
				RejectionReason::RelayerUnderfunded,
			),
			("nonce too low", RejectionReason::NonceConflict),
			("replacement transaction underpriced", RejectionReason::NonceConflict),
			("intrinsic gas too low", RejectionReason::GasError),
			("execution reverted: Relayer not authorized", RejectionReason::RelayerNotAuthorized),
			("something odd", RejectionReason::Unknown),
		];
		for (message, expected) in cases {
			assert_eq!(classify_rejection(message), expected, "{message}");
		}
	}

	#[test]
	fn test_build_transaction_encodes_meta_vote() {
		let submitter = submitter(mock_with_identity());
		let intent = VoteIntentBuilder::new().with_poll_id(7).with_candidate_id(2).build();

		let tx = submitter.build_transaction(&intent, 11, policy().initial());
		assert_eq!(tx.nonce, 11);
		assert_eq!(tx.chain_id, 31337);
		assert_eq!(tx.gas_limit, 500_000);

		let call = IGaslessVoting::metaVoteCall::abi_decode(&tx.data).unwrap();
		assert_eq!(call.pollId, U256::from(7u64));
		assert_eq!(call.candidateId, 2);
		assert_eq!(call.voter, intent.voter);
	}

	#[tokio::test]
	async fn test_nonce_conflict_retried_transparently() {
		let mut mock = mock_with_identity();
		let mut seq = Sequence::new();
		mock.expect_get_pending_nonce()
			.times(1)
			.in_sequence(&mut seq)
			.returning(|| Box::pin(async { Ok(4) }));
		mock.expect_submit()
			.times(1)
			.in_sequence(&mut seq)
			.returning(|_| Box::pin(async { Err(LedgerError::Rejected("nonce too low".into())) }));
		mock.expect_get_pending_nonce()
			.times(1)
			.in_sequence(&mut seq)
			.returning(|| Box::pin(async { Ok(5) }));
		mock.expect_submit()
			.times(1)
			.in_sequence(&mut seq)
			.withf(|tx| tx.nonce == 5)
			.returning(|_| Box::pin(async { Ok(TxHash::repeat_byte(0x55)) }));

		let submitted = submitter(mock)
			.submit_vote(&VoteIntentBuilder::new().build())
			.await
			.unwrap();
		assert_eq!(submitted.nonce(), 5);
		assert_eq!(submitted.tx_hash, TxHash::repeat_byte(0x55));
	}

	#[tokio::test]
	async fn test_nonce_retries_are_bounded() {
		let mut mock = mock_with_identity();
		mock.expect_get_pending_nonce()
			.times(4)
			.returning(|| Box::pin(async { Ok(1) }));
		mock.expect_submit()
			.times(4)
			.returning(|_| Box::pin(async { Err(LedgerError::Rejected("nonce too low".into())) }));

		let err = submitter(mock)
			.submit_vote(&VoteIntentBuilder::new().build())
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			SubmissionError::Rejected {
				reason: RejectionReason::NonceConflict,
				..
			}
		));
	}

	#[tokio::test]
	async fn test_bad_signature_is_not_retried() {
		let mut mock = mock_with_identity();
		mock.expect_get_pending_nonce()
			.times(1)
			.returning(|| Box::pin(async { Ok(0) }));
		mock.expect_submit().times(1).returning(|_| {
			Box::pin(async {
				Err(LedgerError::Rejected(
					"execution reverted: Bad signature".into(),
				))
			})
		});

		let err = submitter(mock)
			.submit_vote(&VoteIntentBuilder::new().build())
			.await
			.unwrap_err();
		match err {
			SubmissionError::Rejected { reason, detail } => {
				assert_eq!(reason, RejectionReason::BadSignature);
				assert!(detail.contains("Bad signature"));
			},
			other => panic!("unexpected {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_replacement_keeps_nonce_and_raises_fees() {
		let mut mock = mock_with_identity();
		mock.expect_get_pending_nonce().never();
		mock.expect_submit()
			.times(1)
			.withf(|tx| tx.nonce == 9 && tx.fees.max_fee_per_gas == 62_500_000_000)
			.returning(|_| Box::pin(async { Ok(TxHash::repeat_byte(0x99)) }));

		let submitter = submitter(mock);
		let original =
			submitter.build_transaction(&VoteIntentBuilder::new().build(), 9, policy().initial());
		let replacement = submitter.replace(&original).await.unwrap();

		assert_eq!(replacement.nonce(), 9);
		assert!(replacement.fees().max_fee_per_gas > original.fees.max_fee_per_gas);
	}
}
