//! Estimator Configuration
//!
//! Tuning knobs for retrieval, retry, and validation. Every field has a
//! default so a config file only needs to name what it overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use scopecast_core::CoreError;

use crate::error::{AppError, AppResult};

/// Configuration for the estimation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Candidates returned per category-scoped retrieval query.
    #[serde(default = "default_category_top_k")]
    pub category_top_k: usize,

    /// Minimum cosine similarity for a candidate to be considered at all.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    /// Candidates returned by the combined fallback query when the analysis
    /// produced no epic categories.
    #[serde(default = "default_fallback_top_k")]
    pub fallback_top_k: usize,

    /// Maximum validation-driven regeneration retries per run.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Hard floor: a total below this many hours fails validation.
    #[serde(default = "default_min_total_hours")]
    pub min_total_hours: u32,

    /// Soft ceiling: a total above this many hours draws a warning.
    #[serde(default = "default_max_total_hours")]
    pub max_total_hours: u32,

    /// Minimum newly generated epics before a warning is raised.
    #[serde(default = "default_min_generated_epics")]
    pub min_generated_epics: usize,

    /// Absolute floor for the expected-epic-count warning; the effective
    /// floor is `max(min_epic_count, features / 2)`.
    #[serde(default = "default_min_epic_count")]
    pub min_epic_count: usize,

    /// Epics with fewer than two tasks draw a warning once their share of
    /// the estimate exceeds this ratio.
    #[serde(default = "default_sparse_epic_ratio")]
    pub sparse_epic_ratio: f64,

    /// Path to the mandatory-epic baseline file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandatory_epics_path: Option<PathBuf>,
}

fn default_category_top_k() -> usize {
    5
}

fn default_min_similarity() -> f32 {
    0.4
}

fn default_fallback_top_k() -> usize {
    25
}

fn default_max_retries() -> u32 {
    2
}

fn default_min_total_hours() -> u32 {
    10
}

fn default_max_total_hours() -> u32 {
    20_000
}

fn default_min_generated_epics() -> usize {
    15
}

fn default_min_epic_count() -> usize {
    15
}

fn default_sparse_epic_ratio() -> f64 {
    0.3
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            category_top_k: default_category_top_k(),
            min_similarity: default_min_similarity(),
            fallback_top_k: default_fallback_top_k(),
            max_retries: default_max_retries(),
            min_total_hours: default_min_total_hours(),
            max_total_hours: default_max_total_hours(),
            min_generated_epics: default_min_generated_epics(),
            min_epic_count: default_min_epic_count(),
            sparse_epic_ratio: default_sparse_epic_ratio(),
            mandatory_epics_path: None,
        }
    }
}

impl EstimatorConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CoreError::config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            CoreError::config(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> AppResult<()> {
        if self.category_top_k == 0 {
            return Err(AppError::config("category_top_k must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(AppError::config("min_similarity must be within 0.0..=1.0"));
        }
        if self.min_total_hours >= self.max_total_hours {
            return Err(AppError::config(
                "min_total_hours must be below max_total_hours",
            ));
        }
        Ok(())
    }

    /// Expected minimum epic count for a project with this many features.
    pub fn expected_min_epics(&self, features_count: usize) -> usize {
        self.min_epic_count.max(features_count / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_tuned_values() {
        let config = EstimatorConfig::default();
        assert_eq!(config.category_top_k, 5);
        assert!((config.min_similarity - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.fallback_top_k, 25);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.min_total_hours, 10);
        assert_eq!(config.max_total_hours, 20_000);
    }

    #[test]
    fn expected_min_epics_uses_feature_count() {
        let config = EstimatorConfig::default();
        assert_eq!(config.expected_min_epics(10), 15);
        assert_eq!(config.expected_min_epics(20), 15);
        assert_eq!(config.expected_min_epics(40), 20);
    }

    #[test]
    fn validate_rejects_out_of_range_similarity() {
        let config = EstimatorConfig {
            min_similarity: 1.5,
            ..EstimatorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_partial_config_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"category_top_k": 3, "max_retries": 1}}"#).unwrap();

        let config = EstimatorConfig::load(file.path()).unwrap();
        assert_eq!(config.category_top_k, 3);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.fallback_top_k, 25);
    }

    #[test]
    fn load_missing_file_errors() {
        let result = EstimatorConfig::load(Path::new("/nonexistent/scopecast.json"));
        let err = result.unwrap_err();
        assert!(matches!(err, AppError::Core(CoreError::Config(_))));
        assert!(err.to_string().contains("/nonexistent/scopecast.json"));
    }

    #[test]
    fn load_malformed_json_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        let result = EstimatorConfig::load(file.path());
        assert!(matches!(
            result.unwrap_err(),
            AppError::Core(CoreError::Config(_))
        ));
    }
}
