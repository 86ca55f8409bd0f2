//! Common types module for the gasless voting relayer.
//!
//! This module defines the core data types shared by the ledger client,
//! the relayer core and the HTTP service. Keeping them in one crate ensures
//! that every component speaks about polls, votes and transactions in the
//! same vocabulary.

/// Relayer signing identity as observed on the ledger.
pub mod account;
/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Solidity bindings for the voting contract.
pub mod contracts;
/// Transaction and receipt types for submitted meta-votes.
pub mod delivery;
/// Event types emitted by the confirmation monitor.
pub mod events;
/// Poll and creator funding snapshots read from the ledger.
pub mod poll;
/// Secure string type for handling sensitive data.
pub mod secret_string;
/// Utility functions for formatting and typed-data hashing.
pub mod utils;
/// Vote intents and the rejection taxonomy.
pub mod vote;

pub use account::RelayerAccount;
pub use api::*;
pub use delivery::*;
pub use events::*;
pub use poll::{CreatorAllowance, PollSnapshot};
pub use secret_string::SecretString;
pub use utils::{
	current_timestamp, recover_vote_signer, truncate_id, vote_domain, vote_signing_hash,
	without_0x_prefix, VoteSignatureError,
};
pub use vote::{RejectionReason, VoteIntent};
