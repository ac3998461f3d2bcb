// src/error.rs

use std::path::PathBuf;

/// Failures that end an invocation: writing artifacts or config files,
/// and malformed `config --set` input.
#[derive(Debug, thiserror::Error)]
pub enum ScortonError {
    #[error("Failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown config key '{0}'")]
    UnknownConfigKey(String),

    #[error("Expected key=value, got '{0}'")]
    MalformedAssignment(String),
}

impl ScortonError {
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScortonError::Io { operation, path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, ScortonError>;
