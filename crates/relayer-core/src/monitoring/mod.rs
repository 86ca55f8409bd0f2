//! Confirmation monitoring for submitted meta-votes.
//!
//! Tracks every submission to a terminal state in the background so the
//! request path never waits for inclusion.

pub mod attempt;
pub mod confirmation;

pub use attempt::{
	transition, AttemptState, MonitorPolicy, Observation, SubmissionAttempt, Transition,
};
pub use confirmation::ConfirmationMonitor;
