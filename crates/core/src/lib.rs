//! # Scopecast Core
//!
//! Core crate for the Scopecast workspace: the estimation data model,
//! requirement types, pipeline state, and foundational error types.
//!
//! This crate is intentionally dependency-light (serde, chrono, thiserror)
//! so every other workspace crate can build on it without pulling in the
//! async or HTTP stacks.

pub mod error;
pub mod model;
pub mod requirement;
pub mod state;

pub use error::{CoreError, CoreResult};
pub use model::{
    CandidateRecord, EffortMap, Epic, Platform, ProjectEstimate, Task, GENERATED_SOURCE,
    MANDATORY_SOURCE,
};
pub use requirement::{
    correct_web_misclassification, ensure_api_platform, resolve_platforms, AnalyzedRequirement,
    ProjectRequirement,
};
pub use state::{PipelineStage, PipelineState};
