//! Platform Filtering
//!
//! Restricts task effort maps to the run's target platform set. A task whose
//! efforts are entirely outside the target set is dropped; an epic whose
//! tasks are all dropped is dropped with it. Order is preserved throughout.

use std::collections::BTreeSet;

use tracing::debug;

use scopecast_core::{Epic, Platform, Task};

/// Restrict a task's efforts to the allowed platform set.
///
/// Returns `None` when no effort entry survives, never a task with an empty
/// effort map.
pub fn filter_task(task: &Task, allowed: &BTreeSet<Platform>) -> Option<Task> {
    let efforts = task.efforts.restricted_to(allowed);
    if efforts.is_empty() {
        return None;
    }
    Some(Task {
        description: task.description.clone(),
        efforts,
        source: task.source.clone(),
        is_custom: task.is_custom,
    })
}

/// Filter every task of every epic; drop epics left without tasks.
pub fn filter_epics(epics: Vec<Epic>, allowed: &BTreeSet<Platform>) -> Vec<Epic> {
    let mut kept = Vec::new();
    for mut epic in epics {
        let tasks: Vec<Task> = epic
            .tasks
            .iter()
            .filter_map(|t| filter_task(t, allowed))
            .collect();

        if tasks.is_empty() {
            debug!(epic = %epic.name, "dropped epic with no tasks for target platforms");
            continue;
        }
        epic.tasks = tasks;
        kept.push(epic);
    }
    kept
}
