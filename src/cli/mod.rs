//! CLI module for the Aegis deployment tool.
//!
//! This module provides the command-line interface for resolving and
//! inspecting deployment configuration.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
