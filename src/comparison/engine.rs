//! Estimate Comparison Engine
//!
//! Compares a predicted estimate against a known-actual one: two-phase epic
//! matching (case-insensitive exact, then character-sequence fuzzy), epic,
//! platform, and user-role coverage percentages, task-granularity
//! classification, and the total-hours delta.
//!
//! Inputs are raw `serde_json::Value` documents so both the current epic-list
//! shape and the legacy map shape (`{"epics": {"Name": {"Task": {"Platform":
//! hours}}}}`) can be compared without a schema migration.

use std::collections::BTreeSet;

use serde_json::Value;
use similar::TextDiff;
use tracing::debug;

use crate::comparison::report::{
    CoverageComparison, EpicSummary, Granularity, HoursComparison, HoursStatus, MatchReport,
    MatchType, MatchedPair, TaskComparison, TaskStats,
};

/// Default minimum similarity for a fuzzy epic match.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Character-sequence similarity between two strings, case-insensitive and
/// whitespace-trimmed. Returns a score in `[0.0, 1.0]`.
pub fn fuzzy_ratio(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    f64::from(TextDiff::from_chars(a.as_str(), b.as_str()).ratio())
}

// ---- document extraction ----

fn effort_hours(efforts: &Value) -> i64 {
    efforts
        .as_object()
        .map(|map| {
            map.values()
                .filter_map(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f.round() as i64)))
                .sum()
        })
        .unwrap_or(0)
}

/// Pull epic name + task count pairs out of an estimate document.
///
/// Supports the epic-list shape (`{"epics": [{"name", "tasks": [..]}]}`) and
/// the legacy map shape keyed by epic name. Unrecognized shapes yield an
/// empty list rather than an error.
pub fn epic_summaries(doc: &Value) -> Vec<EpicSummary> {
    let epics = &doc["epics"];

    if let Some(map) = epics.as_object() {
        return map
            .iter()
            .map(|(name, tasks)| EpicSummary {
                name: name.clone(),
                task_count: tasks.as_object().map_or(0, |t| t.len()),
            })
            .collect();
    }

    let Some(list) = epics.as_array() else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|epic| epic.as_object())
        .map(|epic| EpicSummary {
            name: epic
                .get("name")
                .or_else(|| epic.get("epic_name"))
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string(),
            task_count: epic
                .get("tasks")
                .and_then(Value::as_array)
                .map_or(0, Vec::len),
        })
        .collect()
}

/// All platform names that carry effort anywhere in the document.
pub fn platform_names(doc: &Value) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let epics = &doc["epics"];

    if let Some(map) = epics.as_object() {
        for tasks in map.values() {
            let Some(tasks) = tasks.as_object() else {
                continue;
            };
            for efforts in tasks.values() {
                if let Some(efforts) = efforts.as_object() {
                    names.extend(efforts.keys().cloned());
                }
            }
        }
        return names;
    }

    let Some(list) = epics.as_array() else {
        return names;
    };
    for epic in list {
        let Some(tasks) = epic["tasks"].as_array() else {
            continue;
        };
        for task in tasks {
            if let Some(efforts) = task["efforts"].as_object() {
                names.extend(efforts.keys().cloned());
            }
        }
    }
    names
}

/// All user-role names declared in the document, at the epic level or on
/// individual tasks. The legacy map shape has nowhere to carry roles and
/// yields an empty set.
pub fn user_role_names(doc: &Value) -> BTreeSet<String> {
    let mut roles = BTreeSet::new();
    let Some(list) = doc["epics"].as_array() else {
        return roles;
    };
    for epic in list {
        if let Some(types) = epic["user_types"].as_array() {
            roles.extend(types.iter().filter_map(Value::as_str).map(String::from));
        }
        let Some(tasks) = epic["tasks"].as_array() else {
            continue;
        };
        for task in tasks {
            if let Some(types) = task["user_types"].as_array() {
                roles.extend(types.iter().filter_map(Value::as_str).map(String::from));
            }
        }
    }
    roles
}

/// Sum of all effort hours in the document, either shape.
pub fn total_hours(doc: &Value) -> i64 {
    let epics = &doc["epics"];

    if let Some(map) = epics.as_object() {
        return map
            .values()
            .filter_map(|tasks| tasks.as_object())
            .flat_map(|tasks| tasks.values())
            .map(effort_hours)
            .sum();
    }

    let Some(list) = epics.as_array() else {
        return 0;
    };
    list.iter()
        .filter_map(|epic| epic["tasks"].as_array())
        .flatten()
        .map(|task| effort_hours(&task["efforts"]))
        .sum()
}

// ---- matching ----

/// Two-phase epic matching.
///
/// Phase one pairs case-insensitive exact name matches at similarity 1.0.
/// Phase two takes each remaining actual epic and pairs it with the
/// highest-scoring unused predicted epic at or above `threshold`; ties keep
/// the first encountered. Each predicted epic is used at most once.
pub fn match_epics(
    actual: &[EpicSummary],
    predicted: &[EpicSummary],
    threshold: f64,
) -> (Vec<MatchedPair>, Vec<EpicSummary>, Vec<EpicSummary>) {
    let mut matched = Vec::new();
    let mut used_predicted = vec![false; predicted.len()];
    let mut matched_actual = vec![false; actual.len()];

    for (ai, actual_epic) in actual.iter().enumerate() {
        let wanted = actual_epic.name.trim().to_lowercase();
        for (pi, predicted_epic) in predicted.iter().enumerate() {
            if used_predicted[pi] {
                continue;
            }
            if predicted_epic.name.trim().to_lowercase() == wanted {
                matched.push(MatchedPair {
                    actual: actual_epic.clone(),
                    predicted: predicted_epic.clone(),
                    similarity: 1.0,
                    match_type: MatchType::Exact,
                });
                used_predicted[pi] = true;
                matched_actual[ai] = true;
                break;
            }
        }
    }

    for (ai, actual_epic) in actual.iter().enumerate() {
        if matched_actual[ai] {
            continue;
        }
        let mut best: Option<(usize, f64)> = None;
        for (pi, predicted_epic) in predicted.iter().enumerate() {
            if used_predicted[pi] {
                continue;
            }
            let score = fuzzy_ratio(&actual_epic.name, &predicted_epic.name);
            if score >= threshold && best.map_or(true, |(_, prev)| score > prev) {
                best = Some((pi, score));
            }
        }
        if let Some((pi, score)) = best {
            debug!(
                actual = %actual_epic.name,
                predicted = %predicted[pi].name,
                score,
                "fuzzy epic match"
            );
            matched.push(MatchedPair {
                actual: actual_epic.clone(),
                predicted: predicted[pi].clone(),
                similarity: score,
                match_type: MatchType::Fuzzy,
            });
            used_predicted[pi] = true;
            matched_actual[ai] = true;
        }
    }

    let missing = actual
        .iter()
        .enumerate()
        .filter(|(ai, _)| !matched_actual[*ai])
        .map(|(_, e)| e.clone())
        .collect();
    let extra = predicted
        .iter()
        .enumerate()
        .filter(|(pi, _)| !used_predicted[*pi])
        .map(|(_, e)| e.clone())
        .collect();

    (matched, missing, extra)
}

// ---- per-dimension comparisons ----

/// Task-count statistics over the matched pairs plus both full epic lists.
pub fn compare_task_counts(
    actual: &[EpicSummary],
    predicted: &[EpicSummary],
    matched: &[MatchedPair],
) -> TaskStats {
    let avg = |epics: &[EpicSummary]| {
        if epics.is_empty() {
            0.0
        } else {
            epics.iter().map(|e| e.task_count as f64).sum::<f64>() / epics.len() as f64
        }
    };
    let avg_actual = avg(actual);
    let avg_predicted = avg(predicted);

    let details: Vec<TaskComparison> = matched
        .iter()
        .map(|pair| {
            let actual_count = pair.actual.task_count;
            let predicted_count = pair.predicted.task_count;
            let coverage = if actual_count > 0 {
                (predicted_count.min(actual_count) as f64 / actual_count as f64) * 100.0
            } else if predicted_count == 0 {
                100.0
            } else {
                0.0
            };
            let granularity = if (predicted_count as f64) < actual_count as f64 * 0.7 {
                Granularity::LessGranular
            } else if (predicted_count as f64) > actual_count as f64 * 1.3 {
                Granularity::MoreGranular
            } else {
                Granularity::Similar
            };
            TaskComparison {
                epic_name: pair.actual.name.clone(),
                actual_task_count: actual_count,
                predicted_task_count: predicted_count,
                coverage_percentage: round2(coverage),
                granularity,
            }
        })
        .collect();

    let overall = if details.is_empty() {
        0.0
    } else {
        details.iter().map(|d| d.coverage_percentage).sum::<f64>() / details.len() as f64
    };
    let granularity_diff = if avg_actual > 0.0 {
        ((avg_predicted - avg_actual) / avg_actual) * 100.0
    } else {
        0.0
    };

    TaskStats {
        avg_actual_tasks: round2(avg_actual),
        avg_predicted_tasks: round2(avg_predicted),
        granularity_difference_percentage: round2(granularity_diff),
        overall_task_coverage: round2(overall),
        details,
    }
}

/// Total-hours delta with its direction.
pub fn compare_hours(actual_hours: i64, predicted_hours: i64) -> HoursComparison {
    let difference = predicted_hours - actual_hours;
    let difference_percentage = if actual_hours > 0 {
        (difference as f64 / actual_hours as f64) * 100.0
    } else {
        0.0
    };
    let status = match difference.cmp(&0) {
        std::cmp::Ordering::Less => HoursStatus::Underestimated,
        std::cmp::Ordering::Greater => HoursStatus::Overestimated,
        std::cmp::Ordering::Equal => HoursStatus::Accurate,
    };
    HoursComparison {
        actual_hours,
        predicted_hours,
        difference,
        difference_percentage: round2(difference_percentage),
        status,
    }
}

/// Set arithmetic over a dimension of names (platforms, user roles);
/// coverage is matched / actual.
pub fn compare_name_sets(
    actual: &BTreeSet<String>,
    predicted: &BTreeSet<String>,
) -> CoverageComparison {
    let matched: Vec<String> = actual.intersection(predicted).cloned().collect();
    let missing: Vec<String> = actual.difference(predicted).cloned().collect();
    let extra: Vec<String> = predicted.difference(actual).cloned().collect();
    let coverage = if actual.is_empty() {
        0.0
    } else {
        (matched.len() as f64 / actual.len() as f64) * 100.0
    };
    CoverageComparison {
        matched,
        missing,
        extra,
        coverage_percentage: round2(coverage),
    }
}

/// Compare two estimate documents end to end.
pub fn compare_documents(actual: &Value, predicted: &Value, threshold: f64) -> MatchReport {
    let actual_epics = epic_summaries(actual);
    let predicted_epics = epic_summaries(predicted);

    let (matched, missing, extra) = match_epics(&actual_epics, &predicted_epics, threshold);
    let exact_matches = matched
        .iter()
        .filter(|m| m.match_type == MatchType::Exact)
        .count();
    let fuzzy_matches = matched.len() - exact_matches;
    let coverage_percentage = if actual_epics.is_empty() {
        0.0
    } else {
        round2((matched.len() as f64 / actual_epics.len() as f64) * 100.0)
    };

    let tasks = compare_task_counts(&actual_epics, &predicted_epics, &matched);
    let hours = compare_hours(total_hours(actual), total_hours(predicted));
    let platforms = compare_name_sets(&platform_names(actual), &platform_names(predicted));
    let user_roles = compare_name_sets(&user_role_names(actual), &user_role_names(predicted));

    MatchReport {
        matched,
        missing,
        extra,
        exact_matches,
        fuzzy_matches,
        coverage_percentage,
        tasks,
        hours,
        platforms,
        user_roles,
    }
}

// ==== tests ====

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary(name: &str, task_count: usize) -> EpicSummary {
        EpicSummary {
            name: name.to_string(),
            task_count,
        }
    }

    // ---- fuzzy ratio ----

    #[test]
    fn ratio_is_case_and_whitespace_insensitive() {
        assert_eq!(fuzzy_ratio("Authentication", "  AUTHENTICATION "), 1.0);
    }

    #[test]
    fn ratio_is_symmetric() {
        let pairs = [
            ("Authentication", "User Authentication"),
            ("Order Management", "Inventory Management"),
            ("Payments", "Checkout & Payments"),
            ("", "Notifications"),
        ];
        for (a, b) in pairs {
            assert_eq!(fuzzy_ratio(a, b), fuzzy_ratio(b, a), "pair ({a}, {b})");
        }
    }

    #[test]
    fn ratio_clears_threshold_for_related_names() {
        let score = fuzzy_ratio("Authentication", "User Authentication");
        assert!(score >= DEFAULT_MATCH_THRESHOLD, "score was {score}");
        assert!(score < 1.0);
    }

    #[test]
    fn ratio_stays_low_for_unrelated_names() {
        assert!(fuzzy_ratio("Payment Gateway", "Push Notifications") < 0.6);
    }

    // ---- matching ----

    #[test]
    fn exact_phase_wins_over_fuzzy() {
        let actual = vec![summary("Authentication", 5)];
        let predicted = vec![
            summary("User Authentication", 4),
            summary("authentication", 6),
        ];
        let (matched, missing, extra) =
            match_epics(&actual, &predicted, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].match_type, MatchType::Exact);
        assert_eq!(matched[0].predicted.name, "authentication");
        assert_eq!(matched[0].similarity, 1.0);
        assert!(missing.is_empty());
        assert_eq!(extra.len(), 1);
    }

    #[test]
    fn fuzzy_phase_matches_related_names() {
        let actual = vec![summary("Authentication", 5)];
        let predicted = vec![summary("User Authentication", 4)];
        let (matched, missing, extra) =
            match_epics(&actual, &predicted, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].match_type, MatchType::Fuzzy);
        assert!(matched[0].similarity >= DEFAULT_MATCH_THRESHOLD);
        assert!(missing.is_empty());
        assert!(extra.is_empty());
    }

    #[test]
    fn each_predicted_epic_used_at_most_once() {
        let actual = vec![
            summary("User Management", 3),
            summary("User Management Portal", 3),
        ];
        let predicted = vec![summary("User Management", 3)];
        let (matched, missing, extra) =
            match_epics(&actual, &predicted, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(matched.len(), 1);
        assert_eq!(missing.len(), 1);
        assert!(extra.is_empty());
    }

    #[test]
    fn unmatched_epics_split_into_missing_and_extra() {
        let actual = vec![summary("Payments", 2), summary("Reporting", 4)];
        let predicted = vec![summary("Payments", 2), summary("Push Notifications", 3)];
        let (matched, missing, extra) =
            match_epics(&actual, &predicted, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(matched.len(), 1);
        assert_eq!(missing, vec![summary("Reporting", 4)]);
        assert_eq!(extra, vec![summary("Push Notifications", 3)]);
    }

    #[test]
    fn fuzzy_keeps_best_scoring_candidate() {
        let actual = vec![summary("Order Management", 3)];
        let predicted = vec![
            summary("Management", 1),
            summary("Order Management System", 5),
        ];
        let (matched, _, _) = match_epics(&actual, &predicted, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].predicted.name, "Order Management System");
    }

    // ---- task statistics ----

    #[test]
    fn granularity_classification_uses_thirty_percent_band() {
        let cases = [
            (10, 7, Granularity::Similar),
            (10, 13, Granularity::Similar),
            (10, 6, Granularity::LessGranular),
            (10, 14, Granularity::MoreGranular),
        ];
        for (actual_count, predicted_count, expected) in cases {
            let matched = vec![MatchedPair {
                actual: summary("E", actual_count),
                predicted: summary("E", predicted_count),
                similarity: 1.0,
                match_type: MatchType::Exact,
            }];
            let stats = compare_task_counts(
                &[summary("E", actual_count)],
                &[summary("E", predicted_count)],
                &matched,
            );
            assert_eq!(
                stats.details[0].granularity, expected,
                "actual {actual_count}, predicted {predicted_count}"
            );
        }
    }

    #[test]
    fn task_coverage_caps_at_hundred() {
        let matched = vec![MatchedPair {
            actual: summary("E", 4),
            predicted: summary("E", 9),
            similarity: 1.0,
            match_type: MatchType::Exact,
        }];
        let stats = compare_task_counts(&[summary("E", 4)], &[summary("E", 9)], &matched);
        assert_eq!(stats.details[0].coverage_percentage, 100.0);
        assert_eq!(stats.overall_task_coverage, 100.0);
    }

    // ---- hours ----

    #[test]
    fn hours_delta_direction() {
        assert_eq!(compare_hours(100, 80).status, HoursStatus::Underestimated);
        assert_eq!(compare_hours(100, 120).status, HoursStatus::Overestimated);
        assert_eq!(compare_hours(100, 100).status, HoursStatus::Accurate);
        assert_eq!(compare_hours(100, 80).difference_percentage, -20.0);
    }

    #[test]
    fn hours_percentage_defined_for_zero_actual() {
        let cmp = compare_hours(0, 50);
        assert_eq!(cmp.difference_percentage, 0.0);
        assert_eq!(cmp.status, HoursStatus::Overestimated);
    }

    // ---- documents ----

    fn doc(epics: Value) -> Value {
        json!({ "project_name": "Test", "epics": epics })
    }

    #[test]
    fn extracts_epic_list_shape() {
        let doc = doc(json!([
            {"name": "Authentication", "tasks": [
                {"description": "Login", "efforts": {"Mobile": 8, "API": 12}},
                {"description": "Logout", "efforts": {"Mobile": 2}}
            ]},
            {"name": "Payments", "tasks": []}
        ]));
        let epics = epic_summaries(&doc);
        assert_eq!(epics, vec![summary("Authentication", 2), summary("Payments", 0)]);
        assert_eq!(total_hours(&doc), 22);
        assert_eq!(
            platform_names(&doc),
            ["API", "Mobile"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn extracts_legacy_map_shape() {
        let doc = doc(json!({
            "Authentication": {
                "Login flow": {"Flutter": 10, "API": 6},
                "Session handling": {"API": 4}
            }
        }));
        let epics = epic_summaries(&doc);
        assert_eq!(epics, vec![summary("Authentication", 2)]);
        assert_eq!(total_hours(&doc), 20);
        assert!(platform_names(&doc).contains("Flutter"));
    }

    #[test]
    fn collects_user_roles_from_epics_and_tasks() {
        let doc = doc(json!([
            {"name": "Authentication", "user_types": ["Student", "Teacher"], "tasks": [
                {"description": "Login", "efforts": {"API": 8}, "user_types": ["Admin"]}
            ]},
            {"name": "Reporting", "tasks": []}
        ]));
        let roles = user_role_names(&doc);
        assert_eq!(
            roles,
            ["Admin", "Student", "Teacher"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        );
    }

    #[test]
    fn legacy_map_shape_has_no_user_roles() {
        let doc = doc(json!({
            "Authentication": {"Login flow": {"API": 6}}
        }));
        assert!(user_role_names(&doc).is_empty());
    }

    #[test]
    fn user_role_coverage_uses_set_arithmetic() {
        let actual = ["Student", "Teacher", "Admin"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let predicted = ["Student", "Parent"].iter().map(|s| s.to_string()).collect();

        let cmp = compare_name_sets(&actual, &predicted);
        assert_eq!(cmp.matched, vec!["Student".to_string()]);
        assert_eq!(cmp.missing, vec!["Admin".to_string(), "Teacher".to_string()]);
        assert_eq!(cmp.extra, vec!["Parent".to_string()]);
        assert_eq!(cmp.coverage_percentage, 33.33);
    }

    #[test]
    fn full_document_comparison() {
        let actual = doc(json!([
            {"name": "Authentication", "user_types": ["Customer", "Admin"], "tasks": [
                {"description": "Login", "efforts": {"API": 40}},
                {"description": "MFA", "efforts": {"API": 30}}
            ]},
            {"name": "Reporting", "tasks": [
                {"description": "Dashboards", "efforts": {"Web": 50}}
            ]}
        ]));
        let predicted = doc(json!([
            {"name": "User Authentication", "user_types": ["Customer"], "tasks": [
                {"description": "Login", "efforts": {"API": 35}},
                {"description": "MFA", "efforts": {"API": 25}}
            ]}
        ]));

        let report = compare_documents(&actual, &predicted, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(report.exact_matches, 0);
        assert_eq!(report.fuzzy_matches, 1);
        assert_eq!(report.coverage_percentage, 50.0);
        assert_eq!(report.missing.len(), 1);
        assert!(report.extra.is_empty());
        assert_eq!(report.hours.status, HoursStatus::Underestimated);
        assert_eq!(report.hours.difference, -60);
        assert_eq!(report.platforms.missing, vec!["Web".to_string()]);
        assert_eq!(report.platforms.coverage_percentage, 50.0);
        assert_eq!(report.user_roles.matched, vec!["Customer".to_string()]);
        assert_eq!(report.user_roles.missing, vec!["Admin".to_string()]);
        assert_eq!(report.user_roles.coverage_percentage, 50.0);
    }
}
