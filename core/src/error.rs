//! Error types for routing, argument conversion and configuration.
//!
//! Each stage has its own error enum so callers can match on exactly what
//! they handle; [`Error`] wraps them all for callers that just propagate.

use thiserror::Error;

use crate::args::ArgError;
use crate::tokenize::TokenizeError;
use crate::validate::ValidationError;

/// Configuration loading and saving failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Any failure raised by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed command line.
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    /// Argument conversion failure.
    #[error(transparent)]
    Args(#[from] ArgError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A command tree or schema failed validation.
    #[error("{} validation error(s), first: {}", .0.len(), .0.first().map(ToString::to_string).unwrap_or_default())]
    Invalid(Vec<ValidationError>),
}

/// Convenience alias for results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
