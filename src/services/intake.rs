//! Generation Intake
//!
//! Converts the generation collaborator's untyped JSON into typed epics.
//! Nothing in the response is trusted: platform names must parse into the
//! closed platform set, hours must be numeric, and every field is validated
//! individually. Malformed entries are dropped at the narrowest possible
//! level (one platform entry, one task, one epic) and never abort the run.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, warn};

use scopecast_core::{EffortMap, Epic, Platform, Task, GENERATED_SOURCE};

use crate::services::dedup::NameRegistry;

/// Parse an efforts object into an effort map.
///
/// Unknown platform names and non-numeric or non-positive hours are dropped
/// entry by entry. When `allowed` is given, platforms outside it are dropped
/// too.
pub fn parse_efforts(value: &Value, allowed: Option<&BTreeSet<Platform>>) -> EffortMap {
    let mut efforts = EffortMap::new();
    let Some(entries) = value.as_object() else {
        return efforts;
    };

    for (platform_name, hours_value) in entries {
        let Ok(platform) = serde_json::from_value::<Platform>(Value::String(platform_name.clone()))
        else {
            warn!(platform = %platform_name, "unknown platform in efforts, dropping entry");
            continue;
        };

        if let Some(allowed) = allowed {
            if !allowed.contains(&platform) {
                debug!(platform = %platform, "platform outside target set, dropping entry");
                continue;
            }
        }

        let Some(hours) = as_hours(hours_value) else {
            warn!(platform = %platform, value = %hours_value, "non-numeric hours, dropping entry");
            continue;
        };

        efforts.insert(platform, hours);
    }
    efforts
}

fn as_hours(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    // Collaborators occasionally emit hours as floats ("12.0").
    value.as_f64().and_then(|f| {
        if f.is_finite() && f >= 0.0 && f <= u32::MAX as f64 {
            Some(f as u32)
        } else {
            None
        }
    })
}

fn parse_task(
    value: &Value,
    allowed: &BTreeSet<Platform>,
    source: &str,
    is_custom: bool,
) -> Option<Task> {
    let description = value.get("description")?.as_str()?.to_string();
    if description.is_empty() {
        return None;
    }

    let efforts = value
        .get("efforts")
        .map(|e| parse_efforts(e, Some(allowed)))
        .unwrap_or_default();

    if efforts.is_empty() {
        return None;
    }

    Some(
        Task::new(description, efforts)
            .with_source(source)
            .with_custom(is_custom),
    )
}

fn parse_epic(
    value: &Value,
    allowed: &BTreeSet<Platform>,
    default_source: &str,
    is_custom: bool,
) -> Option<Epic> {
    let name = value.get("name")?.as_str()?.trim().to_string();
    if name.is_empty() {
        return None;
    }

    let source = value
        .get("source_template")
        .and_then(Value::as_str)
        .unwrap_or(default_source)
        .to_string();

    let tasks: Vec<Task> = value
        .get("tasks")
        .and_then(Value::as_array)
        .map(|tasks| {
            tasks
                .iter()
                .filter_map(|t| parse_task(t, allowed, &source, is_custom))
                .collect()
        })
        .unwrap_or_default();

    if tasks.is_empty() {
        warn!(epic = %name, "skipping generated epic with no valid tasks");
        return None;
    }

    let description = value
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(
        Epic::new(name, tasks)
            .with_description(description)
            .with_source_template(source),
    )
}

/// Ingest a generation response into typed epics.
///
/// `modified_epics` are the retrieved epics adapted by the collaborator;
/// their names were deduplicated when first retrieved, so they are recorded
/// without a fresh check. `custom_epics` are brand new and pass the
/// exact-match intake policy against the run's registry.
pub fn ingest_generated(
    response: &Value,
    allowed: &BTreeSet<Platform>,
    registry: &mut NameRegistry,
) -> Vec<Epic> {
    let mut epics = Vec::new();

    for value in response
        .get("modified_epics")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        if let Some(epic) = parse_epic(value, allowed, "Modified", false) {
            registry.record(&epic.name);
            epics.push(epic);
        }
    }

    for value in response
        .get("custom_epics")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        if let Some(epic) = parse_epic(value, allowed, GENERATED_SOURCE, true) {
            if registry.admit_generated(&epic.name).is_ok() {
                epics.push(epic.with_source_template(GENERATED_SOURCE));
            }
        }
    }

    epics
}
