//! Command-line interface for sas-subset.
//!
//! Provides commands for augmentation similarity selection and random
//! baseline subsets.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli};
