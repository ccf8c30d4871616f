//! Requirement Types
//!
//! Input requirement and the structured analysis derived from it, plus the
//! platform-resolution rules applied to collaborator output: flexible name
//! mapping, the admin-dashboard correction, and the auto-added API platform.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::Platform;

/// Raw project requirement as submitted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRequirement {
    /// Project name.
    pub project_name: String,
    /// Free-text project description.
    pub description: String,
    /// Optional additional context appended to the description for analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

impl ProjectRequirement {
    pub fn new(project_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            description: description.into(),
            additional_context: None,
        }
    }

    /// The combined text handed to the analysis collaborator and used by the
    /// platform-correction keyword checks.
    pub fn combined_text(&self) -> String {
        match &self.additional_context {
            Some(ctx) => format!(
                "Project Name: {}\nDescription: {}\nAdditional Context: {}",
                self.project_name, self.description, ctx
            ),
            None => format!(
                "Project Name: {}\nDescription: {}",
                self.project_name, self.description
            ),
        }
    }
}

/// Structured analysis of a requirement.
///
/// Platforms here are already resolved through [`resolve_platforms`]; unknown
/// names reported by the collaborator have been dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedRequirement {
    pub project_name: String,
    /// Project domain (e-commerce, logistics, ...).
    pub domain: String,
    /// Key features extracted from the description.
    pub features: Vec<String>,
    /// Technologies explicitly mentioned.
    #[serde(default)]
    pub tech_stack: Vec<String>,
    /// Resolved target platforms.
    pub platforms: BTreeSet<Platform>,
    /// Initial epic names identified during analysis.
    #[serde(default)]
    pub initial_epics: Vec<String>,
    /// Epic categories mapped to their related features, for targeted
    /// retrieval. Empty when the collaborator provided none.
    #[serde(default)]
    pub epic_categories: BTreeMap<String, Vec<String>>,
    /// User roles in the system (Buyer, Seller, ...).
    #[serde(default)]
    pub user_types: Vec<String>,
    /// Special requirements called out in the description.
    #[serde(default)]
    pub special_requirements: Vec<String>,
}

/// Resolve free-form platform names into the closed [`Platform`] set.
///
/// Unknown names are dropped, not errors: a requirement analysis that names a
/// platform we do not deliver simply contributes nothing.
pub fn resolve_platforms<S: AsRef<str>>(names: &[S]) -> BTreeSet<Platform> {
    names
        .iter()
        .filter_map(|name| Platform::parse_flexible(name.as_ref()))
        .collect()
}

/// Correct a misclassified user-web platform.
///
/// When the requirement text mentions a mobile app plus an admin dashboard
/// but no user-facing web surface, a reported `Web` platform almost always
/// means the admin console. Swap it.
pub fn correct_web_misclassification(
    requirement_text: &str,
    platforms: &mut BTreeSet<Platform>,
) -> bool {
    const MOBILE_KEYWORDS: &[&str] = &[
        "mobile app",
        "android",
        "ios",
        "mobile application",
        "mobile device",
    ];
    const WEB_USER_KEYWORDS: &[&str] = &[
        "web application for users",
        "web app for users",
        "browser-based app",
        "users access via browser",
        "web-based application for customers",
        "responsive web application",
        "responsive web app",
        "web application enabling users",
        "web app enabling users",
        "across devices",
        "mobile and web",
        "mobile apps as well as",
        "in addition to mobile",
        "along with a web",
    ];
    const ADMIN_KEYWORDS: &[&str] = &[
        "admin dashboard",
        "web-based dashboard",
        "admin panel",
        "management console",
        "admin portal",
        "web dashboard for admin",
        "admins will have access to a web",
    ];

    let text = requirement_text.to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

    if platforms.contains(&Platform::Web)
        && contains_any(MOBILE_KEYWORDS)
        && !contains_any(WEB_USER_KEYWORDS)
        && contains_any(ADMIN_KEYWORDS)
    {
        platforms.remove(&Platform::Web);
        platforms.insert(Platform::Admin);
        return true;
    }
    false
}

/// Any front-end platform implies a backend API; add it if absent.
pub fn ensure_api_platform(platforms: &mut BTreeSet<Platform>) -> bool {
    if !platforms.is_empty()
        && !platforms.contains(&Platform::Api)
        && platforms.iter().any(|p| p.is_frontend())
    {
        platforms.insert(Platform::Api);
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_platforms_maps_variants_and_drops_unknowns() {
        let names = ["Mobile App", "admin panel", "mainframe", "backend"];
        let platforms = resolve_platforms(&names);
        assert_eq!(
            platforms,
            [Platform::Mobile, Platform::Admin, Platform::Api]
                .into_iter()
                .collect()
        );
    }

    #[test]
    fn api_auto_added_for_frontend_platforms() {
        let mut platforms: BTreeSet<Platform> = [Platform::Mobile].into_iter().collect();
        assert!(ensure_api_platform(&mut platforms));
        assert!(platforms.contains(&Platform::Api));
    }

    #[test]
    fn api_not_added_to_empty_set() {
        let mut platforms = BTreeSet::new();
        assert!(!ensure_api_platform(&mut platforms));
        assert!(platforms.is_empty());
    }

    #[test]
    fn web_swapped_for_admin_when_only_dashboard_mentioned() {
        let text = "A mobile app for riders. Admins will have access to a web \
                    admin dashboard for fleet management.";
        let mut platforms: BTreeSet<Platform> =
            [Platform::Mobile, Platform::Web].into_iter().collect();

        assert!(correct_web_misclassification(text, &mut platforms));
        assert!(!platforms.contains(&Platform::Web));
        assert!(platforms.contains(&Platform::Admin));
    }

    #[test]
    fn web_kept_when_user_web_surface_is_real() {
        let text = "Customers use the mobile app and a responsive web \
                    application; staff get an admin panel.";
        let mut platforms: BTreeSet<Platform> =
            [Platform::Mobile, Platform::Web].into_iter().collect();

        assert!(!correct_web_misclassification(text, &mut platforms));
        assert!(platforms.contains(&Platform::Web));
    }

    #[test]
    fn combined_text_includes_additional_context() {
        let mut req = ProjectRequirement::new("Shop", "marketplace");
        assert!(!req.combined_text().contains("Additional Context"));
        req.additional_context = Some("needs admin panel".to_string());
        assert!(req.combined_text().contains("needs admin panel"));
    }
}
