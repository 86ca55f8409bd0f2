//! Utility functions for common formatting and typed-data hashing.

pub mod builders;
pub mod eip712;
pub mod formatting;

pub use eip712::{recover_vote_signer, vote_domain, vote_signing_hash, Vote, VoteSignatureError};
pub use formatting::{truncate_id, without_0x_prefix};

/// Current unix time in seconds.
pub fn current_timestamp() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}
