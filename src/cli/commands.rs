//! CLI command definitions.
//!
//! This module defines the CLI flags and subcommands using clap. The
//! credential and region flags become the highest-precedence layer of
//! configuration resolution.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Overrides, DEFAULT_CONFIG_NAME};

/// Aegis - Deploy RESTful serverless APIs.
#[derive(Parser, Debug)]
#[command(name = "aegis")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file base name or path (tries .yaml, .yml, .json).
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_NAME)]
    pub config: String,

    /// AWS region to use.
    #[arg(short, long, global = true)]
    pub region: Option<String>,

    /// AWS access key id.
    #[arg(short = 'k', long = "keyId", global = true)]
    pub key_id: Option<String>,

    /// AWS secret access key.
    #[arg(short = 's', long = "secretKey", global = true)]
    pub secret_key: Option<String>,

    /// AWS credentials profile to use.
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter aegis.yaml.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Resolve and validate the deployment configuration.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Print the fully resolved deployment descriptor.
    Show,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the flags that override configured values.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            region: self.region.clone(),
            access_key_id: self.key_id.clone(),
            secret_access_key: self.secret_key.clone(),
            profile: self.profile.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "aegis", "validate", "-r", "eu-west-1", "--keyId", "AKIA123", "-s", "secret", "-p",
            "deploy",
        ])
        .unwrap();

        assert_eq!(
            cli.overrides(),
            Overrides {
                region: Some(String::from("eu-west-1")),
                access_key_id: Some(String::from("AKIA123")),
                secret_access_key: Some(String::from("secret")),
                profile: Some(String::from("deploy")),
            }
        );
        assert_eq!(cli.config, "aegis");
    }

    #[test]
    fn test_unset_flags_do_not_override() {
        let cli = Cli::try_parse_from(["aegis", "show", "-c", "staging"]).unwrap();
        assert_eq!(cli.overrides(), Overrides::default());
        assert_eq!(cli.config, "staging");
        assert!(matches!(cli.command, Commands::Show));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
