//! Subcommand implementations.

pub mod common;
pub mod downloads;
pub mod publish;
