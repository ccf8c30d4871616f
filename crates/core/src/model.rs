//! Estimation Data Model
//!
//! Strongly-typed model for effort estimates: delivery platforms, per-platform
//! effort maps, tasks, epics, and the final project estimate with its derived
//! rollups.
//!
//! ## Invariants
//!
//! - An `EffortMap` never holds a zero-hour entry: a platform with zero hours
//!   is absent, not zero.
//! - Rollups (`total_hours`, `hours_by_platform`, epic counts) are always
//!   recomputed from the current epic list, never cached.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Source label for epics loaded from the mandatory baseline configuration.
pub const MANDATORY_SOURCE: &str = "mandatory_config";

/// Source label for epics newly produced by the generation collaborator.
pub const GENERATED_SOURCE: &str = "AI Generated";

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// A target delivery surface for estimated work.
///
/// Closed enumeration used as effort-map keys. Historical estimate data uses
/// older surface names (`Flutter`, `Web App`, `CMS`); those are accepted as
/// deserialization aliases so legacy records still load.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Platform {
    /// Mobile application (legacy name: Flutter).
    #[serde(alias = "Flutter")]
    Mobile,
    /// End-user web application (legacy name: Web App).
    #[serde(alias = "Web App")]
    Web,
    /// Backend API (legacy name: Web Service).
    #[serde(rename = "API", alias = "Web Service")]
    Api,
    /// Administrative console (legacy names: CMS, Designer).
    #[serde(alias = "CMS", alias = "Designer")]
    Admin,
}

impl Platform {
    /// All platform variants, in canonical order.
    pub fn all() -> &'static [Platform] {
        &[
            Platform::Mobile,
            Platform::Web,
            Platform::Api,
            Platform::Admin,
        ]
    }

    /// Parse a free-form platform name as produced by collaborators.
    ///
    /// Accepts the canonical names, the legacy source names, and the common
    /// descriptive variants seen in requirement analyses ("mobile app",
    /// "admin dashboard", "backend", ...). Returns `None` for anything else;
    /// callers drop unknown platforms at the field level.
    pub fn parse_flexible(name: &str) -> Option<Platform> {
        let normalized = name.trim().to_lowercase();
        match normalized.as_str() {
            "mobile" | "mobile app" | "mobile application" | "flutter" | "android" | "ios" => {
                Some(Platform::Mobile)
            }
            "web" | "webapp" | "web app" | "web application" | "web based app" => {
                Some(Platform::Web)
            }
            "api" | "backend" | "web service" | "webservice" => Some(Platform::Api),
            "admin" | "cms" | "designer" | "admin panel" | "admin dashboard" | "admin portal"
            | "management console" | "web dashboard" | "web-based dashboard" => {
                Some(Platform::Admin)
            }
            _ => None,
        }
    }

    /// Whether this platform is a user-facing front end.
    ///
    /// Used by the auto-add rule: any front-end surface implies a backend API.
    pub fn is_frontend(&self) -> bool {
        matches!(self, Platform::Mobile | Platform::Web | Platform::Admin)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Mobile => write!(f, "Mobile"),
            Platform::Web => write!(f, "Web"),
            Platform::Api => write!(f, "API"),
            Platform::Admin => write!(f, "Admin"),
        }
    }
}

// ---------------------------------------------------------------------------
// EffortMap
// ---------------------------------------------------------------------------

/// Per-platform effort hours for a single task.
///
/// Zero-hour entries are rejected on insert, so an `EffortMap` either has a
/// positive entry for a platform or no entry at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffortMap(BTreeMap<Platform, u32>);

impl EffortMap {
    /// Create an empty effort map.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert hours for a platform. Zero hours are ignored (absent, not zero).
    pub fn insert(&mut self, platform: Platform, hours: u32) {
        if hours > 0 {
            self.0.insert(platform, hours);
        }
    }

    /// Hours for a platform, if present.
    pub fn get(&self, platform: Platform) -> Option<u32> {
        self.0.get(&platform).copied()
    }

    /// Total hours across all platforms.
    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of platform entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over `(platform, hours)` pairs in canonical platform order.
    pub fn iter(&self) -> impl Iterator<Item = (Platform, u32)> + '_ {
        self.0.iter().map(|(p, h)| (*p, *h))
    }

    /// A copy restricted to the given platform set.
    ///
    /// The result may be empty; callers decide whether an empty map means the
    /// owning task is dropped.
    pub fn restricted_to(&self, allowed: &BTreeSet<Platform>) -> EffortMap {
        EffortMap(
            self.0
                .iter()
                .filter(|(p, _)| allowed.contains(p))
                .map(|(p, h)| (*p, *h))
                .collect(),
        )
    }

    /// Drop any zero-hour entries that arrived through deserialization.
    pub fn prune_zeroes(&mut self) {
        self.0.retain(|_, hours| *hours > 0);
    }
}

impl FromIterator<(Platform, u32)> for EffortMap {
    fn from_iter<I: IntoIterator<Item = (Platform, u32)>>(iter: I) -> Self {
        let mut map = EffortMap::new();
        for (platform, hours) in iter {
            map.insert(platform, hours);
        }
        map
    }
}

// ---------------------------------------------------------------------------
// Task & Epic
// ---------------------------------------------------------------------------

/// One deliverable unit of work with an effort map keyed by platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task description (kept verbatim from its source).
    pub description: String,
    /// Effort hours per platform.
    pub efforts: EffortMap,
    /// Source template or project this task came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Whether the task was newly generated rather than retrieved.
    #[serde(default)]
    pub is_custom: bool,
}

impl Task {
    /// Create a task, pruning any zero-hour entries.
    pub fn new(description: impl Into<String>, mut efforts: EffortMap) -> Self {
        efforts.prune_zeroes();
        Self {
            description: description.into(),
            efforts,
            source: None,
            is_custom: false,
        }
    }

    /// Builder-style setter for the source label.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Builder-style setter for the custom flag.
    pub fn with_custom(mut self, is_custom: bool) -> Self {
        self.is_custom = is_custom;
        self
    }
}

/// A named group of related tasks with per-platform effort estimates.
///
/// Epic names may carry a user-type suffix ("Profile Management - Customer").
/// Name uniqueness within an estimate is semantic, enforced by the
/// deduplication policies, not by exact string comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epic {
    /// Epic name.
    pub name: String,
    /// Epic description.
    #[serde(default)]
    pub description: String,
    /// Tasks in source order.
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Whether this epic comes from the fixed mandatory baseline.
    #[serde(default)]
    pub is_mandatory: bool,
    /// Source template name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_template: Option<String>,
}

impl Epic {
    /// Create an epic with the given name and tasks.
    pub fn new(name: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            tasks,
            is_mandatory: false,
            source_template: None,
        }
    }

    /// Builder-style setter for the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder-style setter for the mandatory flag.
    pub fn with_mandatory(mut self, is_mandatory: bool) -> Self {
        self.is_mandatory = is_mandatory;
        self
    }

    /// Builder-style setter for the source template.
    pub fn with_source_template(mut self, source: impl Into<String>) -> Self {
        self.source_template = Some(source.into());
        self
    }

    /// Total hours across all tasks and platforms.
    pub fn total_hours(&self) -> u32 {
        self.tasks.iter().map(|t| t.efforts.total()).sum()
    }

    /// Hours per platform across all tasks.
    pub fn hours_by_platform(&self) -> BTreeMap<Platform, u32> {
        let mut totals: BTreeMap<Platform, u32> = BTreeMap::new();
        for task in &self.tasks {
            for (platform, hours) in task.efforts.iter() {
                *totals.entry(platform).or_insert(0) += hours;
            }
        }
        totals
    }

    /// Whether this epic was newly produced by the generation collaborator.
    pub fn is_generated(&self) -> bool {
        self.source_template.as_deref() == Some(GENERATED_SOURCE)
    }
}

// ---------------------------------------------------------------------------
// ProjectEstimate
// ---------------------------------------------------------------------------

/// The final estimate: epics plus the target platform set.
///
/// All rollups are derived properties computed over the current epic list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEstimate {
    /// Project name.
    pub project_name: String,
    /// Raw project description.
    pub description: String,
    /// Target delivery platforms.
    pub target_platforms: BTreeSet<Platform>,
    /// All epics (mandatory + retrieved + generated).
    pub epics: Vec<Epic>,
    /// When the estimate was produced.
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
}

impl ProjectEstimate {
    /// Create an estimate.
    pub fn new(
        project_name: impl Into<String>,
        description: impl Into<String>,
        target_platforms: BTreeSet<Platform>,
        epics: Vec<Epic>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            description: description.into(),
            target_platforms,
            epics,
            generated_at: Utc::now(),
        }
    }

    /// Total hours across all epics, tasks, and platforms.
    pub fn total_hours(&self) -> u32 {
        self.epics.iter().map(|e| e.total_hours()).sum()
    }

    /// Total hours per platform across all epics.
    pub fn hours_by_platform(&self) -> BTreeMap<Platform, u32> {
        let mut totals: BTreeMap<Platform, u32> = BTreeMap::new();
        for epic in &self.epics {
            for (platform, hours) in epic.hours_by_platform() {
                *totals.entry(platform).or_insert(0) += hours;
            }
        }
        totals
    }

    /// Number of mandatory epics.
    pub fn mandatory_count(&self) -> usize {
        self.epics.iter().filter(|e| e.is_mandatory).count()
    }

    /// Number of non-mandatory (retrieved or generated) epics.
    pub fn custom_count(&self) -> usize {
        self.epics.iter().filter(|e| !e.is_mandatory).count()
    }
}

// ---------------------------------------------------------------------------
// CandidateRecord
// ---------------------------------------------------------------------------

/// One historical work item in the retrieval pool: a named epic with its
/// embedding vector and task breakdown.
///
/// Produced by the external candidate store; read-only to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Epic name as recorded historically.
    pub name: String,
    /// Embedding vector for the epic name.
    pub embedding: Vec<f32>,
    /// Source estimation or template label.
    pub source_label: String,
    /// Historical task breakdown.
    pub tasks: Vec<Task>,
}

impl CandidateRecord {
    /// Materialize this candidate into an epic carrying its provenance.
    pub fn to_epic(&self) -> Epic {
        Epic {
            name: self.name.clone(),
            description: format!("From {}", self.source_label),
            tasks: self.tasks.clone(),
            is_mandatory: false,
            source_template: Some(self.source_label.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
