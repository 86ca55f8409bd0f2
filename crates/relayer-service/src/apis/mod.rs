//! HTTP endpoint handlers for the relayer.

pub mod status;
pub mod vote;
