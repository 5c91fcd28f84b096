//! Error types for the ovzoo-core crate.

use thiserror::Error;

/// Top-level error type for model zoo operations.
#[derive(Debug, Error)]
pub enum ZooError {
    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Checksum mismatch for '{file}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("Size mismatch for '{file}': expected {expected} bytes, got {actual}")]
    SizeMismatch {
        file: String,
        expected: u64,
        actual: u64,
    },

    #[error("Postprocessing error: {0}")]
    Postprocess(String),

    #[error("Pattern '{pattern}' matched nothing in '{file}' (stale patch?)")]
    PatternNotFound { file: String, pattern: String },

    #[error("Unresolved variable '${var}' in argument '{arg}'")]
    UnresolvedVariable { arg: String, var: String },

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] fancy_regex::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl ZooError {
    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::Manifest(msg.into())
    }

    pub fn download(msg: impl Into<String>) -> Self {
        Self::Download(msg.into())
    }

    pub fn postprocess(msg: impl Into<String>) -> Self {
        Self::Postprocess(msg.into())
    }

    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
