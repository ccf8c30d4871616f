//! Pipeline State
//!
//! Per-run execution state for the estimation pipeline. Every run owns its
//! own `PipelineState`; nothing here is shared or global.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The stage a pipeline run has most recently completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Run created, nothing executed yet.
    Init,
    /// Requirement analysis complete.
    Analyzed,
    /// Candidate retrieval complete.
    Retrieved,
    /// Epic generation complete.
    Generated,
    /// Final estimate assembled.
    Aggregated,
    /// Validation passed; run is finished.
    Validated,
    /// Run aborted; see `errors`.
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Init => "init",
            PipelineStage::Analyzed => "analyzed",
            PipelineStage::Retrieved => "retrieved",
            PipelineStage::Generated => "generated",
            PipelineStage::Aggregated => "aggregated",
            PipelineStage::Validated => "validated",
            PipelineStage::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Mutable state threaded through a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Most recently completed stage.
    pub stage: PipelineStage,
    /// How many validation-driven regeneration retries have run.
    pub retry_count: u32,
    /// Fatal errors accumulated before failing.
    pub errors: Vec<String>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self {
            stage: PipelineStage::Init,
            retry_count: 0,
            errors: Vec::new(),
        }
    }

    /// Mark a stage as completed.
    pub fn advance(&mut self, stage: PipelineStage) {
        self.stage = stage;
    }

    /// Record a fatal error and move to the failed stage.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.stage = PipelineStage::Failed;
    }

    pub fn is_failed(&self) -> bool {
        self.stage == PipelineStage::Failed
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_starts_at_init() {
        let state = PipelineState::new();
        assert_eq!(state.stage, PipelineStage::Init);
        assert_eq!(state.retry_count, 0);
        assert!(state.errors.is_empty());
    }

    #[test]
    fn fail_records_error_and_stage() {
        let mut state = PipelineState::new();
        state.advance(PipelineStage::Analyzed);
        state.fail("generation produced no epics");

        assert!(state.is_failed());
        assert_eq!(state.errors, vec!["generation produced no epics"]);
    }

    #[test]
    fn stage_display_names() {
        assert_eq!(PipelineStage::Retrieved.to_string(), "retrieved");
        assert_eq!(PipelineStage::Failed.to_string(), "failed");
    }
}
