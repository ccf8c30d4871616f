//! Estimate Comparison
//!
//! Offline scoring of a generated estimate against a known-actual one.

pub mod engine;
pub mod report;

pub use engine::{compare_documents, fuzzy_ratio, DEFAULT_MATCH_THRESHOLD};
pub use report::{
    CoverageComparison, EpicSummary, Granularity, HoursComparison, HoursStatus, MatchReport,
    MatchType, MatchedPair, TaskComparison, TaskStats,
};
