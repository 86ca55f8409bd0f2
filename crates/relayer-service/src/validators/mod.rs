//! Request validators for the relayer API.

pub mod vote;
