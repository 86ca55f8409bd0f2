//! Builder for VoteIntent

use crate::vote::VoteIntent;
use alloy_primitives::{Address, Bytes, B256};

/// Builder for creating `VoteIntent` instances with a fluent API.
///
/// The default signature is 65 placeholder bytes: well-formed in length but
/// not produced by any key.
#[derive(Debug, Clone)]
pub struct VoteIntentBuilder {
	intent: VoteIntent,
}

impl Default for VoteIntentBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl VoteIntentBuilder {
	pub fn new() -> Self {
		Self {
			intent: VoteIntent {
				poll_id: 1,
				candidate_id: 0,
				voter: Address::repeat_byte(0x11),
				signature: Bytes::from(vec![0x1b; 65]),
				merkle_proof: Vec::new(),
			},
		}
	}

	pub fn with_poll_id(mut self, poll_id: u64) -> Self {
		self.intent.poll_id = poll_id;
		self
	}

	pub fn with_candidate_id(mut self, candidate_id: u16) -> Self {
		self.intent.candidate_id = candidate_id;
		self
	}

	pub fn with_voter(mut self, voter: Address) -> Self {
		self.intent.voter = voter;
		self
	}

	pub fn with_signature(mut self, signature: Bytes) -> Self {
		self.intent.signature = signature;
		self
	}

	pub fn with_merkle_proof(mut self, proof: Vec<B256>) -> Self {
		self.intent.merkle_proof = proof;
		self
	}

	pub fn build(self) -> VoteIntent {
		self.intent
	}
}
