//! Epic Deduplication
//!
//! Two deliberately distinct duplicate-detection policies, applied at
//! different pipeline stages:
//!
//! - **Retrieval policy**: a retrieved candidate is a duplicate if it
//!   exact-matches a mandatory epic name, or is token-overlap similar to any
//!   name already accepted this run.
//! - **Intake policy**: a newly generated epic is a duplicate only on an
//!   exact (case-sensitive) name match against the accepted list.
//!
//! The asymmetry is intentional and load-bearing: unifying the two policies
//! would change which epics survive. Both operate on a per-run registry with
//! no shared state between runs.

use std::collections::BTreeSet;

use tracing::debug;

use crate::services::normalize::is_similar_name;

/// Why a candidate name was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Exact match against a mandatory epic name.
    Mandatory,
    /// Token-overlap similar to an already-accepted name.
    SimilarTo(String),
    /// Exact match against an already-accepted name.
    ExactMatch,
}

/// Per-run registry of accepted epic names.
///
/// The accepted list grows monotonically during a run and is never pruned;
/// names are checked before being added, so each semantic cluster gets at
/// most one representative per run.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    mandatory: BTreeSet<String>,
    accepted: Vec<String>,
}

impl NameRegistry {
    /// Create a registry seeded with the mandatory epic names. Mandatory
    /// names count as already accepted.
    pub fn new<I, S>(mandatory_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mandatory: BTreeSet<String> = mandatory_names.into_iter().map(Into::into).collect();
        let accepted = mandatory.iter().cloned().collect();
        Self { mandatory, accepted }
    }

    /// Names accepted so far, in acceptance order.
    pub fn accepted_names(&self) -> &[String] {
        &self.accepted
    }

    /// Whether a category name is already covered by a mandatory epic,
    /// exactly or by token overlap. Used to skip retrieval for that category.
    pub fn covers_category(&self, category: &str) -> bool {
        self.mandatory.contains(category)
            || self.mandatory.iter().any(|m| is_similar_name(category, m))
    }

    /// Retrieval-stage admission: exact check against mandatory names plus
    /// token-overlap check against every accepted name.
    pub fn admit_retrieved(&mut self, name: &str) -> Result<(), Rejection> {
        if self.mandatory.contains(name) {
            debug!(epic = name, "rejected retrieved epic: mandatory");
            return Err(Rejection::Mandatory);
        }
        if let Some(existing) = self
            .accepted
            .iter()
            .find(|existing| is_similar_name(name, existing))
        {
            debug!(epic = name, similar_to = %existing, "rejected retrieved epic: similar");
            return Err(Rejection::SimilarTo(existing.clone()));
        }
        self.accepted.push(name.to_string());
        Ok(())
    }

    /// Intake-stage admission for generated epics: exact (case-sensitive)
    /// match only.
    pub fn admit_generated(&mut self, name: &str) -> Result<(), Rejection> {
        if self.accepted.iter().any(|existing| existing == name) {
            debug!(epic = name, "rejected generated epic: exact match");
            return Err(Rejection::ExactMatch);
        }
        self.accepted.push(name.to_string());
        Ok(())
    }

    /// Record a name as accepted without any duplicate check. Used for
    /// adapted retrieved epics whose names were fixed earlier in the run.
    pub fn record(&mut self, name: &str) {
        self.accepted.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> NameRegistry {
        NameRegistry::new(["Authentication", "Database Design"])
    }

    #[test]
    fn retrieved_exact_mandatory_rejected() {
        let mut reg = registry();
        assert_eq!(
            reg.admit_retrieved("Authentication").unwrap_err(),
            Rejection::Mandatory
        );
    }

    #[test]
    fn retrieved_similar_to_accepted_rejected() {
        let mut reg = registry();
        reg.admit_retrieved("Payment Gateway").unwrap();
        match reg.admit_retrieved("Payment").unwrap_err() {
            Rejection::SimilarTo(existing) => assert_eq!(existing, "Payment Gateway"),
            other => panic!("unexpected rejection: {other:?}"),
        }
    }

    #[test]
    fn retrieved_similar_to_mandatory_rejected() {
        let mut reg = registry();
        // Not an exact mandatory name, but token-overlap similar to one.
        assert!(reg.admit_retrieved("MT - Authentication").is_err());
    }

    #[test]
    fn retrieved_distinct_name_accepted_once() {
        let mut reg = registry();
        reg.admit_retrieved("Order Management").unwrap();
        assert!(reg.admit_retrieved("Order Management").is_err());
        assert!(reg.accepted_names().contains(&"Order Management".to_string()));
    }

    #[test]
    fn generated_exact_match_only() {
        let mut reg = registry();
        reg.admit_retrieved("Payment Gateway").unwrap();

        // Semantically similar but not exact: the intake policy lets it in.
        reg.admit_generated("Payment").unwrap();
        // Exact repeat is rejected.
        assert_eq!(
            reg.admit_generated("Payment").unwrap_err(),
            Rejection::ExactMatch
        );
        // Case matters at this stage.
        reg.admit_generated("PAYMENT").unwrap();
    }

    #[test]
    fn covers_category_matches_mandatory_variants() {
        let reg = registry();
        assert!(reg.covers_category("Authentication"));
        assert!(reg.covers_category("MT - Database Design"));
        assert!(!reg.covers_category("Payments"));
    }

    #[test]
    fn fresh_registries_do_not_interfere() {
        let mut first = NameRegistry::new(Vec::<String>::new());
        first.admit_retrieved("Order Management").unwrap();

        let mut second = NameRegistry::new(Vec::<String>::new());
        assert!(second.admit_retrieved("Order Management").is_ok());
    }
}
