//! CLI subcommands.

pub mod common;
pub mod config;
pub mod estimate;
pub mod simulate;
pub mod strategy;
