//! Core Error Types
//!
//! Failure modes of the core layer: configuration files that cannot be read
//! or parsed. Kept deliberately small; collaborator and pipeline failures
//! live in their own crates' error types.

use thiserror::Error;

/// Errors produced while loading core configuration and data files.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A configuration value or file is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON document did not parse or did not match the expected shape.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for core errors.
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = CoreError::config("mandatory epics path does not exist");
        assert_eq!(
            err.to_string(),
            "Configuration error: mandatory epics path does not exist"
        );
    }

    #[test]
    fn io_error_converts_via_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: CoreError = io_err.into();
        assert!(matches!(err, CoreError::Io(_)));
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn serde_error_converts_via_from() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{broken").unwrap_err();
        let err: CoreError = parse_err.into();
        assert!(matches!(err, CoreError::Serialization(_)));
    }
}
