//! Builder for PollSnapshot

use crate::poll::PollSnapshot;
use alloy_primitives::Address;

/// Builder for creating `PollSnapshot` instances with a fluent API.
///
/// Defaults describe an open public poll that ends far in the future and
/// has room for more voters.
#[derive(Debug, Clone)]
pub struct PollSnapshotBuilder {
	snapshot: PollSnapshot,
}

impl Default for PollSnapshotBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl PollSnapshotBuilder {
	pub fn new() -> Self {
		Self {
			snapshot: PollSnapshot {
				poll_id: 1,
				title: "Test poll".to_string(),
				creator: Address::repeat_byte(0xC0),
				end_time: u64::MAX / 2,
				candidate_count: 3,
				is_public: true,
				voter_count: 0,
				max_voters: 100,
			},
		}
	}

	pub fn with_poll_id(mut self, poll_id: u64) -> Self {
		self.snapshot.poll_id = poll_id;
		self
	}

	pub fn with_title(mut self, title: &str) -> Self {
		self.snapshot.title = title.to_string();
		self
	}

	pub fn with_creator(mut self, creator: Address) -> Self {
		self.snapshot.creator = creator;
		self
	}

	pub fn with_end_time(mut self, end_time: u64) -> Self {
		self.snapshot.end_time = end_time;
		self
	}

	pub fn with_candidate_count(mut self, count: u64) -> Self {
		self.snapshot.candidate_count = count;
		self
	}

	pub fn with_public(mut self, is_public: bool) -> Self {
		self.snapshot.is_public = is_public;
		self
	}

	pub fn with_voter_count(mut self, count: u64) -> Self {
		self.snapshot.voter_count = count;
		self
	}

	pub fn with_max_voters(mut self, max: u64) -> Self {
		self.snapshot.max_voters = max;
		self
	}

	pub fn build(self) -> PollSnapshot {
		self.snapshot
	}
}
