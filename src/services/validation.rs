//! Estimate Validation
//!
//! Rule-based sanity checks over the aggregated estimate. Two rules are hard
//! failures that make a run eligible for a regeneration retry; everything
//! else is a warning surfaced to the caller alongside the estimate.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use scopecast_core::{Platform, ProjectEstimate};

use crate::config::EstimatorConfig;

/// Outcome of validating an estimate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Hard failures; a non-empty list makes the run eligible for retry.
    pub errors: Vec<String>,
    /// Soft quality warnings; never block completion.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate an aggregated estimate against the quality rules.
///
/// Hard failures: total hours below the floor, or zero target platforms.
/// Everything else (epic counts, platform coverage, sparse epics, the hours
/// ceiling, missing mandatory epics) is warning-only.
pub fn validate_estimate(
    estimate: &ProjectEstimate,
    features_count: usize,
    mandatory_names: &[String],
    config: &EstimatorConfig,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    let total_hours = estimate.total_hours();
    if total_hours < config.min_total_hours {
        report
            .errors
            .push(format!("Total effort too low: {} hours", total_hours));
    } else if total_hours > config.max_total_hours {
        report
            .warnings
            .push(format!("Total effort very high: {} hours", total_hours));
    }

    if estimate.target_platforms.is_empty() {
        report.errors.push("No target platforms specified".to_string());
    }

    let epic_names: BTreeSet<&str> = estimate.epics.iter().map(|e| e.name.as_str()).collect();
    let missing_mandatory: Vec<&str> = mandatory_names
        .iter()
        .map(String::as_str)
        .filter(|name| !epic_names.contains(name))
        .collect();
    if !missing_mandatory.is_empty() {
        report.warnings.push(format!(
            "Missing mandatory epics: {}",
            missing_mandatory.join(", ")
        ));
    }

    let empty_epics: Vec<&str> = estimate
        .epics
        .iter()
        .filter(|e| e.tasks.is_empty())
        .map(|e| e.name.as_str())
        .collect();
    if !empty_epics.is_empty() {
        report
            .warnings
            .push(format!("Epics with no tasks: {}", empty_epics.join(", ")));
    }

    let total_epics = estimate.epics.len();
    let expected_min = config.expected_min_epics(features_count);
    if total_epics < expected_min {
        report.warnings.push(format!(
            "Low epic count: {} epics for {} features, expected at least {}",
            total_epics, features_count, expected_min
        ));
    }

    let generated_count = estimate.epics.iter().filter(|e| e.is_generated()).count();
    if generated_count < config.min_generated_epics {
        report.warnings.push(format!(
            "Low custom epic generation: only {} generated epics, expected at least {}",
            generated_count, config.min_generated_epics
        ));
    }

    let covered_platforms: BTreeSet<Platform> = estimate
        .epics
        .iter()
        .flat_map(|e| e.tasks.iter())
        .flat_map(|t| t.efforts.iter().map(|(p, _)| p))
        .collect();
    let uncovered: Vec<String> = estimate
        .target_platforms
        .iter()
        .filter(|p| !covered_platforms.contains(p))
        .map(|p| p.to_string())
        .collect();
    if !uncovered.is_empty() {
        report.warnings.push(format!(
            "Missing platform coverage: {} have no tasks assigned",
            uncovered.join(", ")
        ));
    }

    let sparse = estimate.epics.iter().filter(|e| e.tasks.len() < 2).count();
    if total_epics > 0 && (sparse as f64) > (total_epics as f64) * config.sparse_epic_ratio {
        report.warnings.push(format!(
            "Many small epics: {} of {} epics have fewer than 2 tasks",
            sparse, total_epics
        ));
    }

    if report.passed() {
        info!(warnings = report.warnings.len(), "validation passed");
    } else {
        warn!(errors = ?report.errors, "validation failed");
    }
    report
}
