//! Builders for domain types, used by tests across the workspace.

pub mod poll_snapshot;
pub mod vote_intent;

pub use poll_snapshot::PollSnapshotBuilder;
pub use vote_intent::VoteIntentBuilder;
