//! Core of the gasless voting relayer.
//!
//! Takes a signed vote intent through the eligibility pre-check, submits it
//! on the voter's behalf with serialized nonce assignment, and follows the
//! transaction to a terminal state in the background.

pub mod eligibility;
pub mod engine;
pub mod monitoring;
pub mod nonce;
pub mod submitter;

#[cfg(test)]
pub(crate) mod test_support;

pub use eligibility::{Eligibility, EligibilityChecker};
pub use engine::{event_bus::EventBus, EngineError, RelayerEngine, RelayerStatus, SubmissionResult};
pub use monitoring::{ConfirmationMonitor, MonitorPolicy, SubmissionAttempt};
pub use nonce::{NonceLease, NonceManager};
pub use submitter::{classify_rejection, FeePolicy, SubmissionError, SubmittedVote, VoteSubmitter};
