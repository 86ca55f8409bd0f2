//! Scheduler driving submission attempts through the confirmation ladder.
//!
//! A single task owns every waiting attempt in a queue ordered by due time.
//! When an attempt comes due it is moved into its own step task, which
//! checks receipts, possibly broadcasts the replacement, and either hands
//! the attempt back with its next delay or publishes the terminal outcome.
//! Attempts never share mutable state, so one slow node call cannot delay
//! the others.

use super::attempt::{
	terminal_state, transition, MonitorPolicy, Observation, SubmissionAttempt, Transition,
};
use crate::engine::event_bus::EventBus;
use crate::submitter::VoteSubmitter;
use relayer_ledger::LedgerService;
use relayer_types::{truncate_id, AttemptOutcome, LedgerReceipt, MonitorEvent};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::instrument;

enum Command {
	/// Schedule a new attempt for its first check.
	Track(SubmissionAttempt),
	/// A step finished without reaching a terminal state.
	Reschedule(SubmissionAttempt, Duration),
	Shutdown,
}

/// Handle to the background confirmation monitor.
#[derive(Clone)]
pub struct ConfirmationMonitor {
	commands: mpsc::UnboundedSender<Command>,
	in_flight: Arc<AtomicUsize>,
}

/// Everything a step task needs.
struct StepContext {
	ledger: Arc<LedgerService>,
	submitter: Arc<VoteSubmitter>,
	event_bus: EventBus,
	policy: MonitorPolicy,
}

struct Scheduled {
	due: Instant,
	seq: u64,
	attempt: SubmissionAttempt,
}

impl PartialEq for Scheduled {
	fn eq(&self, other: &Self) -> bool {
		(self.due, self.seq) == (other.due, other.seq)
	}
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Scheduled {
	fn cmp(&self, other: &Self) -> Ordering {
		(self.due, self.seq).cmp(&(other.due, other.seq))
	}
}

impl ConfirmationMonitor {
	/// Starts the scheduler task and returns a handle to it.
	///
	/// Must be called from within a tokio runtime.
	pub fn spawn(
		ledger: Arc<LedgerService>,
		submitter: Arc<VoteSubmitter>,
		event_bus: EventBus,
		policy: MonitorPolicy,
	) -> Self {
		let (sender, receiver) = mpsc::unbounded_channel();
		let in_flight = Arc::new(AtomicUsize::new(0));

		let context = Arc::new(StepContext {
			ledger,
			submitter,
			event_bus,
			policy,
		});
		tokio::spawn(run_scheduler(
			context,
			receiver,
			sender.downgrade(),
			in_flight.clone(),
		));

		Self {
			commands: sender,
			in_flight,
		}
	}

	/// Hands a freshly submitted attempt to the monitor.
	///
	/// Returns false if the monitor has already shut down.
	pub fn track(&self, attempt: SubmissionAttempt) -> bool {
		tracing::debug!(
			attempt_id = %attempt.id,
			tx_hash = %truncate_id(&attempt.original.tx_hash.to_string()),
			nonce = attempt.nonce(),
			"Tracking submission"
		);
		self.in_flight.fetch_add(1, AtomicOrdering::SeqCst);
		if self.commands.send(Command::Track(attempt)).is_err() {
			self.in_flight.fetch_sub(1, AtomicOrdering::SeqCst);
			tracing::warn!("Confirmation monitor is stopped; attempt will not be tracked");
			return false;
		}
		true
	}

	/// Number of attempts that have not reached a terminal state.
	pub fn in_flight(&self) -> usize {
		self.in_flight.load(AtomicOrdering::SeqCst)
	}

	/// Stops scheduling further checks. Attempts still in flight are
	/// abandoned; the ledger remains the record of what happened to them.
	///
	/// Dropping the last handle has the same effect.
	pub fn shutdown(&self) {
		let _ = self.commands.send(Command::Shutdown);
	}
}

async fn run_scheduler(
	context: Arc<StepContext>,
	mut commands: mpsc::UnboundedReceiver<Command>,
	feedback: mpsc::WeakUnboundedSender<Command>,
	in_flight: Arc<AtomicUsize>,
) {
	let mut queue: BinaryHeap<Reverse<Scheduled>> = BinaryHeap::new();
	let mut seq: u64 = 0;

	loop {
		// Far-future placeholder keeps the sleep branch valid when the queue is empty.
		let next_due = queue
			.peek()
			.map(|Reverse(s)| s.due)
			.unwrap_or_else(|| Instant::now() + Duration::from_secs(86_400));
		let has_due = !queue.is_empty();

		tokio::select! {
			command = commands.recv() => match command {
				Some(Command::Track(attempt)) => {
					seq += 1;
					let due = Instant::now() + context.policy.initial_delay;
					queue.push(Reverse(Scheduled { due, seq, attempt }));
				},
				Some(Command::Reschedule(attempt, delay)) => {
					seq += 1;
					let due = Instant::now() + delay;
					queue.push(Reverse(Scheduled { due, seq, attempt }));
				},
				Some(Command::Shutdown) | None => break,
			},
			_ = tokio::time::sleep_until(next_due), if has_due => {
				let now = Instant::now();
				while queue.peek().is_some_and(|Reverse(s)| s.due <= now) {
					let Some(Reverse(scheduled)) = queue.pop() else {
						break;
					};
					let context = context.clone();
					let feedback = feedback.clone();
					let in_flight = in_flight.clone();
					tokio::spawn(async move {
						let rescheduled = match step(&context, scheduled.attempt).await {
							Some((attempt, delay)) => feedback.upgrade().is_some_and(|sender| {
								sender.send(Command::Reschedule(attempt, delay)).is_ok()
							}),
							None => false,
						};
						if !rescheduled {
							in_flight.fetch_sub(1, AtomicOrdering::SeqCst);
						}
					});
				}
			},
		}
	}

	let abandoned = in_flight.load(AtomicOrdering::SeqCst);
	if abandoned > 0 {
		tracing::warn!(abandoned, "Confirmation monitor stopped with attempts in flight");
	} else {
		tracing::info!("Confirmation monitor stopped");
	}
}

/// Performs one receipt check and acts on the resulting transition.
///
/// Returns the attempt and its next delay, or `None` once terminal.
#[instrument(skip_all, fields(attempt_id = %attempt.id, nonce = attempt.nonce(), check = attempt.checks + 1))]
async fn step(
	context: &StepContext,
	mut attempt: SubmissionAttempt,
) -> Option<(SubmissionAttempt, Duration)> {
	attempt.checks += 1;
	attempt.last_checked_at = Some(Instant::now());

	let (observation, unknown_to_node) = observe(&context.ledger, &attempt).await;
	match transition(&attempt, &observation, &context.policy) {
		Transition::Wait(delay) => {
			tracing::debug!(delay_secs = delay.as_secs(), "No receipt yet");
			Some((attempt, delay))
		},
		Transition::Replace => {
			attempt.replacement_tried = true;
			match context.submitter.replace(&attempt.original.transaction).await {
				Ok(replacement) => {
					tracing::warn!(
						original = %truncate_id(&attempt.original.tx_hash.to_string()),
						replacement = %truncate_id(&replacement.tx_hash.to_string()),
						max_fee_per_gas = replacement.fees().max_fee_per_gas,
						"Transaction stuck, replacement broadcast"
					);
					attempt.record_replacement(replacement);
				},
				Err(e) => {
					// Typically the original was mined in the meantime.
					tracing::warn!(error = %e, "Replacement refused");
				},
			}
			let delay = context.policy.delay_after(attempt.checks);
			Some((attempt, delay))
		},
		Transition::Finish(outcome) => {
			let outcome = verify_outcome(context, &attempt, outcome).await;
			if unknown_to_node && matches!(outcome, AttemptOutcome::Unresolved { .. }) {
				// The node forgot the nonce; later votes must not be built past the gap.
				tracing::warn!("Node no longer knows this attempt; resyncing nonce from the ledger");
				context.submitter.nonces().reset().await;
			}
			attempt.state = terminal_state(&outcome);
			report(&attempt, &outcome);

			let event = MonitorEvent {
				attempt_id: attempt.id,
				poll_id: attempt.poll_id,
				voter: attempt.voter,
				nonce: attempt.nonce(),
				outcome,
			};
			if context.event_bus.publish(event).is_err() {
				tracing::trace!("No subscribers for monitor event");
			}
			None
		},
	}
}

/// Looks up every hash of the attempt, replacement first since once it
/// exists it is the one priced to win. At most one can ever be included.
///
/// The flag is set when the node answered `NotFound` for every hash.
async fn observe(ledger: &LedgerService, attempt: &SubmissionAttempt) -> (Observation, bool) {
	let candidates = attempt
		.replacement
		.iter()
		.map(|r| (r.tx_hash, true))
		.chain(std::iter::once((attempt.original.tx_hash, false)));

	let mut unknown_to_node = true;
	for (hash, via_replacement) in candidates {
		match ledger.get_receipt(&hash).await {
			Ok(LedgerReceipt::Confirmed { hash, .. }) => {
				let included = Observation::Included {
					tx_hash: hash,
					success: true,
					via_replacement,
				};
				return (included, false);
			},
			Ok(LedgerReceipt::Reverted { hash, .. }) => {
				let included = Observation::Included {
					tx_hash: hash,
					success: false,
					via_replacement,
				};
				return (included, false);
			},
			Ok(LedgerReceipt::NotFound) => {},
			Ok(LedgerReceipt::Pending) => unknown_to_node = false,
			Err(e) => {
				unknown_to_node = false;
				tracing::debug!(error = %e, "Receipt lookup failed, counting as no receipt");
			},
		}
	}
	(Observation::NoReceipt, unknown_to_node)
}

/// A successful receipt and a recorded vote are distinct facts; re-read
/// the vote bitmap to confirm they coincide.
async fn verify_outcome(
	context: &StepContext,
	attempt: &SubmissionAttempt,
	outcome: AttemptOutcome,
) -> AttemptOutcome {
	match outcome {
		AttemptOutcome::Confirmed {
			tx_hash,
			via_replacement,
			..
		} => {
			let vote_recorded = match context
				.ledger
				.has_voted(attempt.poll_id, attempt.voter)
				.await
			{
				Ok(recorded) => Some(recorded),
				Err(e) => {
					tracing::warn!(error = %e, "Could not verify vote after confirmation");
					None
				},
			};
			AttemptOutcome::Confirmed {
				tx_hash,
				via_replacement,
				vote_recorded,
			}
		},
		other => other,
	}
}

fn report(attempt: &SubmissionAttempt, outcome: &AttemptOutcome) {
	let elapsed_secs = attempt.submitted_at.elapsed().as_secs();
	match outcome {
		AttemptOutcome::Confirmed {
			tx_hash,
			via_replacement,
			vote_recorded: Some(false),
		} => tracing::error!(
			tx_hash = %truncate_id(&tx_hash.to_string()),
			poll_id = attempt.poll_id,
			voter = %attempt.voter,
			via_replacement,
			"Transaction confirmed but the vote is not recorded on the ledger"
		),
		AttemptOutcome::Confirmed {
			tx_hash,
			via_replacement,
			..
		} => tracing::info!(
			tx_hash = %truncate_id(&tx_hash.to_string()),
			via_replacement,
			elapsed_secs,
			"Vote confirmed"
		),
		AttemptOutcome::Reverted {
			tx_hash,
			via_replacement,
		} => tracing::warn!(
			tx_hash = %truncate_id(&tx_hash.to_string()),
			via_replacement,
			"Vote transaction reverted; the voter must sign and submit again"
		),
		AttemptOutcome::Unresolved { tx_hashes } => tracing::error!(
			tx_hashes = ?tx_hashes,
			checks = attempt.checks,
			elapsed_secs,
			"Vote transaction unresolved after all checks; manual inspection required"
		),
	}
}
