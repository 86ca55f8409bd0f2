//! Relayer account types.

use alloy_primitives::{utils::format_ether, Address, U256};
use serde::{Deserialize, Serialize};

/// The relayer's own signing identity, read fresh from the ledger.
///
/// Concurrent submissions mutate both the balance and the nonce, so a
/// value of this type is only meaningful for the request that fetched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayerAccount {
	/// Address the relayer signs transactions with.
	pub address: Address,
	/// Native balance in wei.
	pub balance: U256,
	/// Whether the contract accepts meta-votes from this address.
	pub authorized: bool,
	/// Next pending sequence number reported by the node.
	pub nonce: u64,
}

impl RelayerAccount {
	/// Balance formatted in ether for display.
	pub fn balance_ether(&self) -> String {
		format_ether(self.balance)
	}

	/// Whether the balance sits below the operator's warning threshold.
	pub fn is_low_balance(&self, threshold: U256) -> bool {
		self.balance < threshold
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_balance_ether_formatting() {
		let account = RelayerAccount {
			address: Address::repeat_byte(0x11),
			balance: U256::from(1_500_000_000_000_000_000u128),
			authorized: true,
			nonce: 7,
		};

		assert_eq!(account.balance_ether(), "1.500000000000000000");
	}

	#[test]
	fn test_low_balance_threshold() {
		let account = RelayerAccount {
			address: Address::repeat_byte(0x11),
			balance: U256::from(99u64),
			authorized: true,
			nonce: 0,
		};

		assert!(account.is_low_balance(U256::from(100u64)));
		assert!(!account.is_low_balance(U256::from(99u64)));
	}
}
