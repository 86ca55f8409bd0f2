//! EIP-712 typed data for vote authorizations.
//!
//! Voters sign `Vote{uint256 pollId,uint16 candidateId,address voter}` under
//! a domain bound to one contract deployment and one chain id. The contract
//! performs the authoritative recovery; the relayer recomputes the digest
//! only to reject obviously bad signatures before spending a transaction.

use crate::vote::VoteIntent;
use alloy_primitives::{Address, Signature, B256, U256};
use alloy_sol_types::{sol, Eip712Domain, SolStruct};
use std::borrow::Cow;
use thiserror::Error;

sol! {
	/// Typed payload the voter signs.
	#[derive(Debug, PartialEq, Eq)]
	struct Vote {
		uint256 pollId;
		uint16 candidateId;
		address voter;
	}
}

/// Errors that can occur while recovering a vote signer.
#[derive(Debug, Error)]
pub enum VoteSignatureError {
	#[error("Invalid signature length: expected 65 bytes, got {0}")]
	InvalidLength(usize),
	#[error("Malformed signature: {0}")]
	Malformed(String),
	#[error("Signer recovery failed: {0}")]
	Recovery(String),
}

/// Builds the EIP-712 domain for a voting contract deployment.
pub fn vote_domain(
	name: &str,
	version: &str,
	chain_id: u64,
	verifying_contract: Address,
) -> Eip712Domain {
	Eip712Domain::new(
		Some(Cow::Owned(name.to_string())),
		Some(Cow::Owned(version.to_string())),
		Some(U256::from(chain_id)),
		Some(verifying_contract),
		None,
	)
}

/// Computes the final `0x1901 || domainSeparator || structHash` digest.
pub fn vote_signing_hash(domain: &Eip712Domain, intent: &VoteIntent) -> B256 {
	let vote = Vote {
		pollId: U256::from(intent.poll_id),
		candidateId: intent.candidate_id,
		voter: intent.voter,
	};
	vote.eip712_signing_hash(domain)
}

/// Recovers the address that signed `intent` under `domain`.
pub fn recover_vote_signer(
	domain: &Eip712Domain,
	intent: &VoteIntent,
) -> Result<Address, VoteSignatureError> {
	if intent.signature.len() != 65 {
		return Err(VoteSignatureError::InvalidLength(intent.signature.len()));
	}

	let signature = Signature::from_raw(&intent.signature)
		.map_err(|e| VoteSignatureError::Malformed(e.to_string()))?;

	let digest = vote_signing_hash(domain, intent);
	signature
		.recover_address_from_prehash(&digest)
		.map_err(|e| VoteSignatureError::Recovery(e.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::utils::builders::VoteIntentBuilder;
	use alloy_primitives::Bytes;
	use alloy_signer::SignerSync;
	use alloy_signer_local::PrivateKeySigner;

	fn test_domain() -> Eip712Domain {
		vote_domain("GaslessVoting", "1", 31337, Address::repeat_byte(0xCC))
	}

	fn signed_intent(signer: &PrivateKeySigner, domain: &Eip712Domain) -> VoteIntent {
		let mut intent = VoteIntentBuilder::new()
			.with_poll_id(9)
			.with_candidate_id(1)
			.with_voter(signer.address())
			.build();
		let digest = vote_signing_hash(domain, &intent);
		let signature = signer.sign_hash_sync(&digest).unwrap();
		intent.signature = Bytes::from(signature.as_bytes().to_vec());
		intent
	}

	#[test]
	fn test_recovers_voter_from_valid_signature() {
		let signer = PrivateKeySigner::random();
		let domain = test_domain();
		let intent = signed_intent(&signer, &domain);

		let recovered = recover_vote_signer(&domain, &intent).unwrap();
		assert_eq!(recovered, signer.address());
	}

	#[test]
	fn test_signature_is_bound_to_chain_id() {
		let signer = PrivateKeySigner::random();
		let intent = signed_intent(&signer, &test_domain());

		let other_chain = vote_domain("GaslessVoting", "1", 1, Address::repeat_byte(0xCC));
		let recovered = recover_vote_signer(&other_chain, &intent).unwrap();
		assert_ne!(recovered, signer.address());
	}

	#[test]
	fn test_signature_is_bound_to_candidate() {
		let signer = PrivateKeySigner::random();
		let domain = test_domain();
		let mut intent = signed_intent(&signer, &domain);
		intent.candidate_id = 0;

		let recovered = recover_vote_signer(&domain, &intent).unwrap();
		assert_ne!(recovered, signer.address());
	}

	#[test]
	fn test_rejects_short_signature() {
		let intent = VoteIntentBuilder::new()
			.with_signature(Bytes::from(vec![0u8; 64]))
			.build();

		let result = recover_vote_signer(&test_domain(), &intent);
		assert!(matches!(result, Err(VoteSignatureError::InvalidLength(64))));
	}
}
