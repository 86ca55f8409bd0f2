//! Solidity bindings for the gasless voting contract.
//!
//! Only the functions the relayer touches are declared: the read side used
//! by the eligibility check and the `metaVote` entry point it submits to.

use alloy_sol_types::sol;

sol! {
	/// Poll details as returned by `getPollDetails`.
	#[derive(Debug, PartialEq, Eq)]
	struct PollView {
		string title;
		address creator;
		uint256 endTime;
		uint256 candidateCount;
		bool isPublic;
		uint256 voterCount;
		uint256 maxVoters;
	}

	#[derive(Debug, PartialEq, Eq)]
	interface IGaslessVoting {
		function getPollDetails(uint256 pollId) external view returns (PollView memory);
		function hasVoted(uint256 pollId, address voter) external view returns (bool);
		function authorizedRelayers(address relayer) external view returns (bool);
		function creatorFunds(address creator) external view returns (uint256);
		function relayerAllowance(address creator, address relayer) external view returns (uint256);
		function metaVote(
			uint256 pollId,
			uint16 candidateId,
			address voter,
			bytes signature,
			bytes32[] merkleProof
		) external;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{Address, Bytes, B256, U256};
	use alloy_sol_types::SolCall;

	#[test]
	fn test_meta_vote_round_trip() {
		let call = IGaslessVoting::metaVoteCall {
			pollId: U256::from(3u64),
			candidateId: 2,
			voter: Address::repeat_byte(0x42),
			signature: Bytes::from(vec![0x01; 65]),
			merkleProof: vec![B256::repeat_byte(0x07)],
		};

		let encoded = call.abi_encode();
		assert_eq!(&encoded[..4], IGaslessVoting::metaVoteCall::SELECTOR.as_slice());

		let decoded = IGaslessVoting::metaVoteCall::abi_decode(&encoded).unwrap();
		assert_eq!(decoded.candidateId, 2);
		assert_eq!(decoded.merkleProof.len(), 1);
	}
}
