//! Submission attempts and their confirmation state machine.
//!
//! [`transition`] is a pure function of the attempt, what the latest
//! receipt check observed, and the monitoring policy. All I/O and timing
//! lives in the scheduler, so the table below can be tested without a
//! network or a clock.
//!
//! | observation            | condition                              | transition      |
//! |------------------------|----------------------------------------|-----------------|
//! | receipt, success       |                                        | Finish(Confirmed) |
//! | receipt, failure       |                                        | Finish(Reverted)  |
//! | no receipt             | checks exhausted                       | Finish(Unresolved)|
//! | no receipt             | replacement not yet tried, due         | Replace         |
//! | no receipt             | otherwise                              | Wait(next delay)|

use crate::submitter::SubmittedVote;
use alloy_primitives::{Address, TxHash};
use relayer_config::MonitorConfig;
use relayer_types::AttemptOutcome;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Timing of the receipt-check ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorPolicy {
	/// Delay between submission and the first check.
	pub initial_delay: Duration,
	/// Delay before each subsequent check.
	pub backoff: Vec<Duration>,
	/// Receipt-less checks after which the replacement is sent.
	pub replace_after_checks: u32,
}

impl MonitorPolicy {
	pub fn from_config(config: &MonitorConfig) -> Self {
		Self {
			initial_delay: config.initial_delay(),
			backoff: config
				.backoff_seconds
				.iter()
				.map(|s| Duration::from_secs(*s))
				.collect(),
			replace_after_checks: config.replace_after_checks,
		}
	}

	/// Total number of receipt checks before an attempt is abandoned.
	pub fn max_checks(&self) -> u32 {
		1 + self.backoff.len() as u32
	}

	/// Delay to wait after the `checks`-th check.
	pub fn delay_after(&self, checks: u32) -> Duration {
		let index = checks.saturating_sub(1) as usize;
		self.backoff
			.get(index)
			.or_else(|| self.backoff.last())
			.copied()
			.unwrap_or(self.initial_delay)
	}
}

impl Default for MonitorPolicy {
	fn default() -> Self {
		Self::from_config(&MonitorConfig::default())
	}
}

/// Where an attempt currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
	/// Broadcast, no receipt yet.
	Pending,
	/// A fee-bumped replacement with the same nonce is racing the original.
	Replaced,
	Confirmed,
	Reverted,
	Unresolved,
}

impl AttemptState {
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Confirmed | Self::Reverted | Self::Unresolved)
	}
}

/// In-flight bookkeeping for one vote submission.
///
/// Owned by exactly one task at a time: the scheduler while it waits,
/// a step task while it is being checked.
#[derive(Debug, Clone)]
pub struct SubmissionAttempt {
	pub id: Uuid,
	pub poll_id: u64,
	pub voter: Address,
	pub original: SubmittedVote,
	/// The one replacement this attempt may issue, linked explicitly to the
	/// original it supersedes.
	pub replacement: Option<SubmittedVote>,
	/// Set once a replacement was tried, even if the node refused it.
	pub replacement_tried: bool,
	pub state: AttemptState,
	/// Receipt checks performed so far.
	pub checks: u32,
	pub submitted_at: Instant,
	pub last_checked_at: Option<Instant>,
}

impl SubmissionAttempt {
	pub fn new(id: Uuid, poll_id: u64, voter: Address, original: SubmittedVote) -> Self {
		Self {
			id,
			poll_id,
			voter,
			original,
			replacement: None,
			replacement_tried: false,
			state: AttemptState::Pending,
			checks: 0,
			submitted_at: Instant::now(),
			last_checked_at: None,
		}
	}

	pub fn nonce(&self) -> u64 {
		self.original.nonce()
	}

	/// Every hash broadcast for this attempt, original first.
	pub fn tx_hashes(&self) -> Vec<TxHash> {
		std::iter::once(self.original.tx_hash)
			.chain(self.replacement.as_ref().map(|r| r.tx_hash))
			.collect()
	}

	/// Records a successful replacement broadcast.
	pub fn record_replacement(&mut self, replacement: SubmittedVote) {
		self.replacement = Some(replacement);
		self.replacement_tried = true;
		self.state = AttemptState::Replaced;
	}
}

/// What a single receipt check found across all of an attempt's hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
	/// One of the hashes was included in a block.
	Included {
		tx_hash: TxHash,
		success: bool,
		via_replacement: bool,
	},
	/// No hash has a receipt yet (pending, dropped or unreachable).
	NoReceipt,
}

/// Next step for an attempt after a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
	/// Check again after the delay.
	Wait(Duration),
	/// Broadcast the fee-bumped replacement, then keep checking.
	Replace,
	Finish(AttemptOutcome),
}

/// Decides what follows the `attempt.checks`-th check.
pub fn transition(
	attempt: &SubmissionAttempt,
	observation: &Observation,
	policy: &MonitorPolicy,
) -> Transition {
	match *observation {
		Observation::Included {
			tx_hash,
			success: true,
			via_replacement,
		} => Transition::Finish(AttemptOutcome::Confirmed {
			tx_hash,
			via_replacement,
			vote_recorded: None,
		}),
		Observation::Included {
			tx_hash,
			success: false,
			via_replacement,
		} => Transition::Finish(AttemptOutcome::Reverted {
			tx_hash,
			via_replacement,
		}),
		Observation::NoReceipt if attempt.checks >= policy.max_checks() => {
			Transition::Finish(AttemptOutcome::Unresolved {
				tx_hashes: attempt.tx_hashes(),
			})
		},
		Observation::NoReceipt
			if !attempt.replacement_tried && attempt.checks >= policy.replace_after_checks =>
		{
			Transition::Replace
		},
		Observation::NoReceipt => Transition::Wait(policy.delay_after(attempt.checks)),
	}
}

/// State an attempt ends in for a given outcome.
pub fn terminal_state(outcome: &AttemptOutcome) -> AttemptState {
	match outcome {
		AttemptOutcome::Confirmed { .. } => AttemptState::Confirmed,
		AttemptOutcome::Reverted { .. } => AttemptState::Reverted,
		AttemptOutcome::Unresolved { .. } => AttemptState::Unresolved,
	}
}
