//! Serialized sequence-number assignment for the relayer account.
//!
//! Every submission holds the nonce lock from the moment it reads the next
//! nonce until the node has accepted (or refused) the transaction. Two
//! concurrent submissions therefore can never be built from the same value.

use relayer_ledger::{LedgerError, LedgerService};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Hands out nonces one submission at a time.
///
/// The cached value is only a lower bound: each acquisition re-reads the
/// node's pending count and takes the larger of the two, which covers both
/// a node that lags behind our own broadcasts and transactions sent by
/// another process with the same key.
#[derive(Debug, Clone, Default)]
pub struct NonceManager {
	next: Arc<Mutex<Option<u64>>>,
}

impl NonceManager {
	pub fn new() -> Self {
		Self::default()
	}

	/// Locks the sequence space and resolves the nonce for one submission.
	///
	/// The lock is released when the returned lease is committed,
	/// invalidated or dropped.
	pub async fn acquire(&self, ledger: &LedgerService) -> Result<NonceLease, LedgerError> {
		let guard = self.next.clone().lock_owned().await;
		let fresh = ledger.get_pending_nonce().await?;
		let nonce = match *guard {
			Some(cached) => cached.max(fresh),
			None => fresh,
		};

		tracing::trace!(fresh, cached = ?*guard, nonce, "Nonce acquired");

		Ok(NonceLease {
			guard,
			nonce,
			settled: false,
		})
	}

	/// Drops the cached value so the next acquisition trusts the node.
	///
	/// For when a transaction the cache counted has vanished from the node,
	/// leaving a gap no later transaction can be mined over. Waits for any
	/// submission currently holding the lease.
	pub async fn reset(&self) {
		let mut next = self.next.lock().await;
		if let Some(cached) = next.take() {
			tracing::debug!(cached, "Nonce cache reset");
		}
	}

	/// Next nonce this manager expects to hand out, if it has one cached.
	pub async fn peek(&self) -> Option<u64> {
		*self.next.lock().await
	}
}

/// Exclusive claim on the relayer's next sequence number.
#[derive(Debug)]
pub struct NonceLease {
	guard: OwnedMutexGuard<Option<u64>>,
	nonce: u64,
	settled: bool,
}

impl NonceLease {
	pub fn nonce(&self) -> u64 {
		self.nonce
	}

	/// Records that the node accepted a transaction with this nonce.
	pub fn commit(mut self) {
		*self.guard = Some(self.nonce + 1);
		self.settled = true;
	}

	/// Forgets the cached value so the next acquisition trusts the node.
	///
	/// Used whenever it is unclear whether the nonce was consumed.
	pub fn invalidate(mut self) {
		*self.guard = None;
		self.settled = true;
	}
}

impl Drop for NonceLease {
	fn drop(&mut self) {
		// A lease abandoned mid-submission may or may not have reached the node.
		if !self.settled {
			*self.guard = None;
		}
	}
}
