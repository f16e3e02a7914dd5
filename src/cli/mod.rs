//! Command-line interface for task-forge.
//!
//! Provides commands for checking prompt identifiers, rendering prompts,
//! validating run records and checking fine-tune parameters.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
