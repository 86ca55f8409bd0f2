//! In-memory ledger used by the engine and monitor tests.
//!
//! Unlike the mockall mock it keeps state across calls: a pending pool
//! keyed by nonce that refuses duplicate sequence numbers, a vote bitmap,
//! and receipts produced according to a configurable mining mode.

use alloy_primitives::{keccak256, Address, TxHash, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use relayer_ledger::{LedgerError, LedgerInterface, LedgerService};
use relayer_types::{
	contracts::IGaslessVoting, CreatorAllowance, LedgerReceipt, PollSnapshot, RelayerAccount,
	VoteTransaction,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const RELAYER: Address = Address::new([0xaa; 20]);
pub(crate) const CONTRACT: Address = Address::new([0xcc; 20]);
pub(crate) const CHAIN_ID: u64 = 31337;

/// What happens to a transaction once it is in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MiningMode {
	/// Stays pending forever.
	Never,
	/// Mined successfully as soon as it is accepted.
	Immediately,
	/// Mined as soon as it is accepted, but execution reverts.
	Revert,
}

struct FakeState {
	polls: HashMap<u64, PollSnapshot>,
	voted: HashSet<(u64, Address)>,
	balance: U256,
	authorized: bool,
	allowance: CreatorAllowance,
	next_nonce: u64,
	stale_nonce: bool,
	unreachable: bool,
	mode: MiningMode,
	submit_error: Option<String>,
	submit_delay: Option<Duration>,
	submit_outages: usize,
	pool: HashMap<u64, (TxHash, VoteTransaction)>,
	receipts: HashMap<TxHash, LedgerReceipt>,
	accepted: Vec<VoteTransaction>,
	duplicate_rejections: usize,
}

pub(crate) struct FakeLedger {
	state: Mutex<FakeState>,
}

impl FakeLedger {
	pub(crate) fn new() -> Self {
		Self {
			state: Mutex::new(FakeState {
				polls: HashMap::new(),
				voted: HashSet::new(),
				balance: U256::from(10u64).pow(U256::from(18u64)),
				authorized: true,
				allowance: CreatorAllowance {
					general: U256::from(10u64).pow(U256::from(17u64)),
					relayer: U256::ZERO,
				},
				next_nonce: 0,
				stale_nonce: false,
				unreachable: false,
				submit_outages: 0,
				mode: MiningMode::Immediately,
				submit_error: None,
				submit_delay: None,
				pool: HashMap::new(),
				receipts: HashMap::new(),
				accepted: Vec::new(),
				duplicate_rejections: 0,
			}),
		}
	}

	fn with_state(self, f: impl FnOnce(&mut FakeState)) -> Self {
		if let Ok(mut state) = self.state.lock() {
			f(&mut state);
		}
		self
	}

	pub(crate) fn with_poll(self, snapshot: PollSnapshot) -> Self {
		self.with_state(|s| {
			s.polls.insert(snapshot.poll_id, snapshot);
		})
	}

	pub(crate) fn with_mode(self, mode: MiningMode) -> Self {
		self.with_state(|s| s.mode = mode)
	}

	pub(crate) fn with_balance(self, balance: U256) -> Self {
		self.with_state(|s| s.balance = balance)
	}

	/// Node keeps reporting pending nonce 0, as a lagging replica would.
	pub(crate) fn with_stale_nonce(self) -> Self {
		self.with_state(|s| s.stale_nonce = true)
	}

	pub(crate) fn with_submit_error(self, message: &str) -> Self {
		let message = message.to_string();
		self.with_state(|s| s.submit_error = Some(message))
	}

	pub(crate) fn with_submit_delay(self, delay: Duration) -> Self {
		self.with_state(|s| s.submit_delay = Some(delay))
	}

	pub(crate) fn unreachable(self) -> Self {
		self.with_state(|s| s.unreachable = true)
	}

	pub(crate) fn into_service(self, timeout: Duration) -> (Arc<Self>, Arc<LedgerService>) {
		let fake = Arc::new(self);
		let service = Arc::new(LedgerService::new(fake.clone(), timeout));
		(fake, service)
	}

	/// Every transaction the pool accepted, in order.
	pub(crate) fn accepted(&self) -> Vec<VoteTransaction> {
		self.state
			.lock()
			.map(|s| s.accepted.clone())
			.unwrap_or_default()
	}

	/// The next `count` broadcasts fail at the transport level.
	pub(crate) fn fail_next_submits(&self, count: usize) {
		if let Ok(mut state) = self.state.lock() {
			state.submit_outages = count;
		}
	}

	/// Submissions refused because their nonce was already taken.
	pub(crate) fn duplicate_rejections(&self) -> usize {
		self.state
			.lock()
			.map(|s| s.duplicate_rejections)
			.unwrap_or_default()
	}

	fn read<T>(&self, f: impl FnOnce(&FakeState) -> T) -> Result<T, LedgerError> {
		let state = self
			.state
			.lock()
			.map_err(|_| LedgerError::Unreachable("poisoned".into()))?;
		if state.unreachable {
			return Err(LedgerError::Unreachable("connection refused".into()));
		}
		Ok(f(&state))
	}
}

fn tx_hash(tx: &VoteTransaction) -> TxHash {
	let mut preimage = tx.data.to_vec();
	preimage.extend_from_slice(&tx.nonce.to_be_bytes());
	preimage.extend_from_slice(&tx.fees.max_fee_per_gas.to_be_bytes());
	keccak256(preimage)
}

#[async_trait]
impl LedgerInterface for FakeLedger {
	fn relayer_address(&self) -> Address {
		RELAYER
	}

	fn contract_address(&self) -> Address {
		CONTRACT
	}

	fn chain_id(&self) -> u64 {
		CHAIN_ID
	}

	async fn get_poll_snapshot(&self, poll_id: u64) -> Result<PollSnapshot, LedgerError> {
		self.read(|s| s.polls.get(&poll_id).cloned())?
			.ok_or_else(|| LedgerError::NotFound(format!("Poll {poll_id} does not exist")))
	}

	async fn has_voted(&self, poll_id: u64, voter: Address) -> Result<bool, LedgerError> {
		self.read(|s| s.voted.contains(&(poll_id, voter)))
	}

	async fn get_creator_allowance(
		&self,
		_creator: Address,
	) -> Result<CreatorAllowance, LedgerError> {
		self.read(|s| s.allowance)
	}

	async fn get_relayer_state(&self) -> Result<RelayerAccount, LedgerError> {
		self.read(|s| RelayerAccount {
			address: RELAYER,
			balance: s.balance,
			authorized: s.authorized,
			nonce: if s.stale_nonce { 0 } else { s.next_nonce },
		})
	}

	async fn get_pending_nonce(&self) -> Result<u64, LedgerError> {
		self.read(|s| if s.stale_nonce { 0 } else { s.next_nonce })
	}

	async fn submit(&self, tx: VoteTransaction) -> Result<TxHash, LedgerError> {
		let delay = self.read(|s| s.submit_delay)?;
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		// Let concurrent submitters interleave.
		tokio::task::yield_now().await;

		let mut state = self
			.state
			.lock()
			.map_err(|_| LedgerError::Unreachable("poisoned".into()))?;
		if state.submit_outages > 0 {
			state.submit_outages -= 1;
			return Err(LedgerError::Unreachable("connection reset by peer".into()));
		}
		if let Some(message) = &state.submit_error {
			return Err(LedgerError::Rejected(message.clone()));
		}

		if let Some((_, existing)) = state.pool.get(&tx.nonce) {
			if tx.fees.max_fee_per_gas <= existing.fees.max_fee_per_gas {
				state.duplicate_rejections += 1;
				return Err(LedgerError::Rejected(
					"replacement transaction underpriced".into(),
				));
			}
		} else if tx.nonce < state.next_nonce {
			state.duplicate_rejections += 1;
			return Err(LedgerError::Rejected("nonce too low".into()));
		} else if tx.nonce > state.next_nonce {
			return Err(LedgerError::Rejected("nonce too high".into()));
		}

		let hash = tx_hash(&tx);
		state.next_nonce = state.next_nonce.max(tx.nonce + 1);
		state.pool.insert(tx.nonce, (hash, tx.clone()));
		state.accepted.push(tx.clone());

		let receipt = match state.mode {
			MiningMode::Never => None,
			MiningMode::Immediately => {
				if let Ok(call) = IGaslessVoting::metaVoteCall::abi_decode(&tx.data) {
					state.voted.insert((call.pollId.saturating_to(), call.voter));
				}
				Some(LedgerReceipt::Confirmed {
					hash,
					block_number: 1,
					gas_used: 90_000,
				})
			},
			MiningMode::Revert => Some(LedgerReceipt::Reverted {
				hash,
				block_number: 1,
				gas_used: 40_000,
			}),
		};
		if let Some(receipt) = receipt {
			state.receipts.insert(hash, receipt);
		}

		Ok(hash)
	}

	async fn get_receipt(&self, hash: &TxHash) -> Result<LedgerReceipt, LedgerError> {
		self.read(|s| {
			if let Some(receipt) = s.receipts.get(hash) {
				receipt.clone()
			} else if s.pool.values().any(|(h, _)| h == hash) {
				LedgerReceipt::Pending
			} else {
				LedgerReceipt::NotFound
			}
		})
	}
}
