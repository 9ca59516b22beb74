//! Side-effecting helpers.
//!
//! Everything that touches the filesystem lives here so the core stays pure.

pub mod config;
