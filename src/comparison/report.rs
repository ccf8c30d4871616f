//! Comparison Report Types
//!
//! Typed output of the estimate comparison engine: matched epic pairs,
//! coverage numbers, task-granularity classification, and the hours,
//! platform, and user-role deltas.

use serde::{Deserialize, Serialize};

/// How a matched epic pair was paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    /// Case-insensitive exact name match.
    Exact,
    /// Character-sequence similarity at or above the threshold.
    Fuzzy,
}

/// Epic as seen by the comparison engine: name plus task count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpicSummary {
    pub name: String,
    pub task_count: usize,
}

/// One matched (actual, predicted) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedPair {
    pub actual: EpicSummary,
    pub predicted: EpicSummary,
    /// 1.0 for exact matches, the fuzzy ratio otherwise.
    pub similarity: f64,
    pub match_type: MatchType,
}

/// Task-count granularity of a matched pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    /// Predicted task count within ±30% of actual.
    Similar,
    /// Predicted below 70% of actual.
    LessGranular,
    /// Predicted above 130% of actual.
    MoreGranular,
}

/// Per-pair task-count comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskComparison {
    pub epic_name: String,
    pub actual_task_count: usize,
    pub predicted_task_count: usize,
    pub coverage_percentage: f64,
    pub granularity: Granularity,
}

/// Aggregate task statistics over all matched pairs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskStats {
    pub avg_actual_tasks: f64,
    pub avg_predicted_tasks: f64,
    pub granularity_difference_percentage: f64,
    pub overall_task_coverage: f64,
    pub details: Vec<TaskComparison>,
}

/// Direction of the total-hours delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoursStatus {
    Underestimated,
    Overestimated,
    Accurate,
}

/// Total-hours comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoursComparison {
    pub actual_hours: i64,
    pub predicted_hours: i64,
    pub difference: i64,
    pub difference_percentage: f64,
    pub status: HoursStatus,
}

/// Set coverage of named items (platforms, user roles).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageComparison {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub extra: Vec<String>,
    pub coverage_percentage: f64,
}

/// Full output of one estimate comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub matched: Vec<MatchedPair>,
    /// Actual epics with no counterpart in the prediction.
    pub missing: Vec<EpicSummary>,
    /// Predicted epics with no counterpart in the actual set.
    pub extra: Vec<EpicSummary>,
    pub exact_matches: usize,
    pub fuzzy_matches: usize,
    /// matched / actual × 100.
    pub coverage_percentage: f64,
    pub tasks: TaskStats,
    pub hours: HoursComparison,
    pub platforms: CoverageComparison,
    pub user_roles: CoverageComparison,
}
