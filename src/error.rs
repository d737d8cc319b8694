//! Error types for the Aegis configuration engine.
//!
//! Lower layers (defaults, name derivation, merging, stage normalization)
//! never fail. Only loading a malformed source and validating the resolved
//! descriptor can produce errors.

use thiserror::Error;

use crate::config::ValidationError;

/// The main error type for the Aegis deployment tool.
#[derive(Debug, Error)]
pub enum AegisError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration source was present but could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// File path or environment variable the error came from.
        location: Option<String>,
    },

    /// The resolved descriptor violates one or more provider constraints.
    #[error("Configuration validation failed with {} error(s):\n{}", .errors.len(), format_violations(.errors))]
    ValidationFailed {
        /// Every violation found, in check order.
        errors: Vec<ValidationError>,
    },

    /// A command-line flag carried an unusable value.
    #[error("Invalid value for --{flag}: {message}")]
    InvalidFlag {
        /// Long name of the flag.
        flag: String,
        /// Why the value was rejected.
        message: String,
    },
}

/// Result type alias for Aegis operations.
pub type Result<T> = std::result::Result<T, AegisError>;

impl AegisError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the validation violations carried by this error, if any.
    #[must_use]
    pub fn violations(&self) -> &[ValidationError] {
        match self {
            Self::Config(ConfigError::ValidationFailed { errors }) => errors,
            _ => &[],
        }
    }
}

impl ConfigError {
    /// Creates a parse error attributed to a source location.
    #[must_use]
    pub fn parse(message: impl Into<String>, location: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            location: Some(location.into()),
        }
    }
}

fn format_violations(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}
