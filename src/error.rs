//! Application Error Types
//!
//! Aggregates the workspace error types into the single error the estimation
//! pipeline and CLI surface to callers.

use thiserror::Error;

use scopecast_core::{CoreError, PipelineState};
use scopecast_providers::ProviderError;

/// Top-level error for the estimation application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Errors from the core data model and I/O.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Errors from an external collaborator (analysis, embedding,
    /// generation, candidate store).
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A pipeline run aborted before producing an estimate.
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// An estimation run aborted mid-flight. Carries the run's state ledger
    /// so callers can report which stage failed and why.
    #[error("Estimation run failed: {message}")]
    RunFailed {
        message: String,
        state: Box<PipelineState>,
    },

    /// Configuration errors specific to the application layer.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a pipeline error
    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a run failure carrying the pipeline's state ledger
    pub fn run_failed(msg: impl Into<String>, state: PipelineState) -> Self {
        Self::RunFailed {
            message: msg.into(),
            state: Box::new(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_display() {
        let err = AppError::pipeline("no epics available for estimation");
        assert_eq!(
            err.to_string(),
            "Pipeline error: no epics available for estimation"
        );
    }

    #[test]
    fn test_core_error_passthrough() {
        let core = CoreError::config("mandatory epics file is not valid JSON");
        let err: AppError = core.into();
        assert!(matches!(err, AppError::Core(_)));
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn test_run_failure_carries_state() {
        let mut state = PipelineState::new();
        state.fail("Failed to analyze requirements: model unavailable");

        let err = AppError::run_failed("Failed to analyze requirements", state);
        assert!(err.to_string().contains("Failed to analyze requirements"));
        let AppError::RunFailed { state, .. } = err else {
            panic!("expected a run failure");
        };
        assert!(state.is_failed());
    }

    #[test]
    fn test_provider_error_conversion() {
        let provider = ProviderError::parse("bad JSON");
        let err: AppError = provider.into();
        assert!(matches!(err, AppError::Provider(_)));
    }
}
