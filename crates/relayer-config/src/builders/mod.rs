//! Builders for constructing configuration objects.

pub mod config;
