//! Error types for inbox-sort.

use std::path::PathBuf;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Classification error: {0}")]
    Classify(#[from] ClassifyError),
}

/// Errors raised while loading or validating rule tables and tunables.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read rule file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse rule table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("No categories available: {0}")]
    Empty(String),
}

/// Malformed configuration discovered while classifying a single email.
///
/// Never escapes `engine::classify`; it is folded into the fallback decision.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("Category {category} has unusable weight {weight}")]
    InvalidCategoryWeight { category: String, weight: f64 },

    #[error("Content weight {field} is unusable: {weight}")]
    InvalidContentWeight { field: &'static str, weight: f64 },

    #[error("Fallback category name is empty")]
    EmptyFallback,
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
