//! # Scopecast
//!
//! Similarity-driven project effort estimation: a free-text requirement goes
//! through analysis, retrieval over a pool of historical epics, generation of
//! project-specific epics, aggregation into per-platform hours, and
//! rule-based validation with a bounded regeneration retry.
//!
//! The workspace splits into three layers:
//!
//! - `scopecast-core`: the data model (platforms, efforts, tasks, epics,
//!   estimates) and requirement analysis types.
//! - `scopecast-providers`: async traits for the external collaborators and
//!   their OpenAI-backed implementation.
//! - this crate: the pipeline services, validation, the comparison engine,
//!   and the CLI.

pub mod comparison;
pub mod config;
pub mod error;
pub mod services;

pub use comparison::{compare_documents, MatchReport, DEFAULT_MATCH_THRESHOLD};
pub use config::EstimatorConfig;
pub use error::{AppError, AppResult};
pub use services::pipeline::{EstimationOutcome, EstimationPipeline};
pub use services::validation::ValidationReport;

// Re-export the workspace layers so binary and test code needs one import
// root.
pub use scopecast_core as core;
pub use scopecast_providers as providers;
