//! Mandatory Epic Baseline
//!
//! Loads the fixed, always-included epics from a JSON configuration file.
//! Mandatory epics carry fixed tasks and hours; they are never reduced by
//! deduplication or retry. Loading errors are the caller's decision: the
//! pipeline degrades to an empty baseline rather than failing the run.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use scopecast_core::{CoreResult, Epic, Task, MANDATORY_SOURCE};

use crate::services::intake::parse_efforts;

#[derive(Debug, Deserialize)]
struct MandatoryConfig {
    #[serde(default)]
    mandatory_epics: Vec<Value>,
}

/// Load the mandatory epic baseline from a JSON config file.
///
/// File shape: `{"mandatory_epics": [{"name", "description", "tasks":
/// [{"description", "efforts": {platform: hours}}]}]}`. An unreadable file or
/// broken top-level JSON is an error; within the document, unknown platform
/// names are dropped per entry, tasks left without efforts are dropped, and
/// epics keep loading past individually malformed entries.
pub fn load_mandatory_epics(path: &Path) -> CoreResult<Vec<Epic>> {
    let contents = std::fs::read_to_string(path)?;
    let config: MandatoryConfig = serde_json::from_str(&contents)?;

    let mut epics = Vec::new();
    for epic_value in &config.mandatory_epics {
        let Some(name) = epic_value.get("name").and_then(Value::as_str) else {
            warn!("skipping mandatory epic without a name");
            continue;
        };

        let tasks: Vec<Task> = epic_value
            .get("tasks")
            .and_then(Value::as_array)
            .map(|tasks| {
                tasks
                    .iter()
                    .filter_map(|t| {
                        let description = t.get("description")?.as_str()?;
                        let efforts = parse_efforts(t.get("efforts")?, None);
                        if efforts.is_empty() {
                            return None;
                        }
                        Some(Task::new(description, efforts).with_source(MANDATORY_SOURCE))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let description = epic_value
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default();

        epics.push(
            Epic::new(name, tasks)
                .with_description(description)
                .with_mandatory(true)
                .with_source_template(MANDATORY_SOURCE),
        );
    }

    info!(count = epics.len(), "loaded mandatory epics from config");
    Ok(epics)
}
