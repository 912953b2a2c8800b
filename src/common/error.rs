//! Error types for the conformance harness
//!
//! Messages name the manifest URL and line (or the file and setting) that
//! caused the failure.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Manifest Errors ===
    #[error("bad option in {url}:{line}: {reason}")]
    ManifestParse {
        url: String,
        line: usize,
        reason: String,
    },

    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    // === Fetch Errors ===
    #[error("Failed to load '{url}': {reason}")]
    Fetch { url: String, reason: String },

    // === Run Errors ===
    #[error("Unable to load tests from '{0}'")]
    SuiteUnavailable(String),

    #[error("{failed} of {total} pages did not pass")]
    RunFailed { failed: usize, total: usize },

    // === Page Errors ===
    #[error("Failed to launch page runner '{command}': {reason}")]
    PageLaunch { command: String, reason: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a manifest parse error pointing at a 1-based line
    pub fn manifest_parse(url: &str, line: usize, reason: impl Into<String>) -> Self {
        Self::ManifestParse {
            url: url.to_string(),
            line,
            reason: reason.into(),
        }
    }

    /// Create an invalid version error
    pub fn invalid_version(version: &str, reason: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a fetch error
    pub fn fetch(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a page launch error
    pub fn page_launch(command: &str, reason: impl std::fmt::Display) -> Self {
        Self::PageLaunch {
            command: command.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_parse_message_names_location() {
        let err = Error::manifest_parse("suite/00_list.txt", 7, "unknown option '--fats'");
        assert_eq!(
            err.to_string(),
            "bad option in suite/00_list.txt:7: unknown option '--fats'"
        );
    }
}
