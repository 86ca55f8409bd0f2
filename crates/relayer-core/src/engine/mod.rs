//! Relayer engine that orchestrates a vote from intent to background
//! confirmation.
//!
//! The engine wires the eligibility checker, the submitter and the
//! confirmation monitor together and turns their results into the small
//! fixed set of outcomes the API layer reports.

pub mod event_bus;

use crate::eligibility::{Eligibility, EligibilityChecker};
use crate::monitoring::{ConfirmationMonitor, MonitorPolicy, SubmissionAttempt};
use crate::nonce::NonceManager;
use crate::submitter::{FeePolicy, SubmissionError, VoteSubmitter};
use alloy_primitives::TxHash;
use relayer_config::Config;
use relayer_ledger::{LedgerError, LedgerService};
use relayer_types::{RejectionReason, RelayerAccount, VoteIntent};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error(transparent)]
	Ledger(#[from] LedgerError),
}

/// Outcome of a vote submission request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
	/// Broadcast succeeded; confirmation continues in the background.
	Accepted { tx_hash: TxHash, attempt_id: Uuid },
	/// The request budget ran out before the broadcast finished. The
	/// submission continues and is monitored if it goes through.
	InProgress { attempt_id: Uuid },
	/// The eligibility check or the ledger refused the vote.
	Rejected {
		reason: RejectionReason,
		message: String,
	},
	/// The relayer cannot serve votes right now.
	ServiceUnavailable {
		reason: Option<RejectionReason>,
		message: String,
	},
}

/// Snapshot of the relayer account for the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayerStatus {
	pub account: RelayerAccount,
	pub chain_id: u64,
	pub low_balance: bool,
}

/// Main relayer engine.
#[derive(Clone)]
pub struct RelayerEngine {
	config: Arc<Config>,
	ledger: Arc<LedgerService>,
	eligibility: Arc<EligibilityChecker>,
	submitter: Arc<VoteSubmitter>,
	monitor: ConfirmationMonitor,
	event_bus: event_bus::EventBus,
}

/// Capacity of the monitor event channel.
const EVENT_BUS_CAPACITY: usize = 1000;

impl RelayerEngine {
	/// Creates the engine and starts its confirmation monitor.
	///
	/// Must be called from within a tokio runtime.
	pub fn new(config: Config, ledger: Arc<LedgerService>) -> Self {
		let fees = FeePolicy::from_config(&config.gas);
		let event_bus = event_bus::EventBus::new(EVENT_BUS_CAPACITY);

		let eligibility = Arc::new(EligibilityChecker::new(ledger.clone(), fees));
		let submitter = Arc::new(VoteSubmitter::new(
			ledger.clone(),
			NonceManager::new(),
			fees,
			config.gas.max_nonce_retries,
		));
		let monitor = ConfirmationMonitor::spawn(
			ledger.clone(),
			submitter.clone(),
			event_bus.clone(),
			MonitorPolicy::from_config(&config.monitor),
		);

		Self {
			config: Arc::new(config),
			ledger,
			eligibility,
			submitter,
			monitor,
			event_bus,
		}
	}

	/// Startup check against the live ledger.
	///
	/// Fails if the ledger cannot be read. An unauthorized or low-funded
	/// relayer only produces warnings, since both can be fixed while the
	/// service runs.
	pub async fn initialize(&self) -> Result<RelayerStatus, EngineError> {
		if self.ledger.chain_id() != self.config.ledger.chain_id {
			return Err(EngineError::Config(format!(
				"Ledger chain id {} does not match configured {}",
				self.ledger.chain_id(),
				self.config.ledger.chain_id
			)));
		}

		let status = self.status().await?;
		tracing::info!(
			relayer = %status.account.address,
			balance = %status.account.balance_ether(),
			authorized = status.account.authorized,
			nonce = status.account.nonce,
			"Relayer account loaded"
		);
		if !status.account.authorized {
			tracing::warn!("Relayer is not authorized on the voting contract; votes will be refused");
		}
		Ok(status)
	}

	/// Reads the relayer account fresh from the ledger.
	pub async fn status(&self) -> Result<RelayerStatus, LedgerError> {
		let account = self.ledger.get_relayer_state().await?;
		let low_balance = account.is_low_balance(self.config.relayer.min_balance_warning_wei);
		if low_balance {
			tracing::warn!(
				balance = %account.balance_ether(),
				threshold_wei = %self.config.relayer.min_balance_warning_wei,
				"Relayer balance is low"
			);
		}
		Ok(RelayerStatus {
			account,
			chain_id: self.ledger.chain_id(),
			low_balance,
		})
	}

	/// Runs eligibility and submission for `intent` within the request budget.
	///
	/// The work runs on its own task so that running out of budget never
	/// cancels a broadcast halfway; the caller just stops waiting for it.
	#[instrument(skip_all, fields(poll_id = intent.poll_id, voter = %intent.voter))]
	pub async fn submit_vote(&self, intent: VoteIntent) -> SubmissionResult {
		let attempt_id = Uuid::new_v4();
		let engine = self.clone();
		let task = tokio::spawn(async move { engine.process(intent, attempt_id).await });

		match tokio::time::timeout(self.config.request_budget(), task).await {
			Ok(Ok(result)) => result,
			Ok(Err(e)) => {
				tracing::error!(error = %e, %attempt_id, "Submission task failed");
				SubmissionResult::ServiceUnavailable {
					reason: None,
					message: "Vote submission could not be completed".to_string(),
				}
			},
			Err(_) => {
				tracing::warn!(
					%attempt_id,
					budget_ms = self.config.relayer.request_budget_ms,
					"Request budget elapsed; submission continues in the background"
				);
				SubmissionResult::InProgress { attempt_id }
			},
		}
	}

	async fn process(&self, intent: VoteIntent, attempt_id: Uuid) -> SubmissionResult {
		match self.eligibility.check_eligibility(&intent).await {
			Ok(Eligibility::Eligible { .. }) => {},
			Ok(Eligibility::Ineligible(reason)) => {
				tracing::info!(%reason, "Vote ineligible");
				return rejection(reason, reason.message().to_string());
			},
			Err(e) => {
				tracing::warn!(error = %e, "Eligibility check could not reach the ledger");
				return unavailable();
			},
		}

		match self.submitter.submit_vote(&intent).await {
			Ok(submitted) => {
				let tx_hash = submitted.tx_hash;
				let attempt =
					SubmissionAttempt::new(attempt_id, intent.poll_id, intent.voter, submitted);
				self.monitor.track(attempt);
				SubmissionResult::Accepted {
					tx_hash,
					attempt_id,
				}
			},
			Err(SubmissionError::Rejected { reason, detail }) => {
				let message = match reason {
					RejectionReason::Unknown => format!("{}: {}", reason.message(), detail),
					_ => reason.message().to_string(),
				};
				rejection(reason, message)
			},
			Err(SubmissionError::Ledger(_)) => unavailable(),
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn ledger(&self) -> &Arc<LedgerService> {
		&self.ledger
	}

	pub fn event_bus(&self) -> &event_bus::EventBus {
		&self.event_bus
	}

	/// Stops background monitoring.
	pub fn shutdown(&self) {
		self.monitor.shutdown();
	}
}

fn rejection(reason: RejectionReason, message: String) -> SubmissionResult {
	if reason.is_infrastructure() {
		SubmissionResult::ServiceUnavailable {
			reason: Some(reason),
			message,
		}
	} else {
		SubmissionResult::Rejected { reason, message }
	}
}

fn unavailable() -> SubmissionResult {
	SubmissionResult::ServiceUnavailable {
		reason: None,
		message: "Ledger unavailable, please retry later".to_string(),
	}
}
