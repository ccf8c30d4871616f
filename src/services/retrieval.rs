//! Candidate Retrieval
//!
//! Ranks the historical candidate pool against a query embedding by cosine
//! similarity, applies the similarity floor, and keeps the top-K.
//!
//! The scan is brute force over the whole pool on every query. That is a
//! deliberate trade-off: the pool holds hundreds to low thousands of records,
//! so an approximate-nearest-neighbor index would add complexity without a
//! measurable win. The retriever sits behind this module boundary so an index
//! can be substituted later without touching deduplication or aggregation.

use tracing::{debug, warn};

use scopecast_core::CandidateRecord;

use crate::error::{AppError, AppResult};

/// One pool candidate with its similarity to the query.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub record: CandidateRecord,
    pub similarity: f32,
}

/// Cosine similarity between two vectors.
///
/// Returns `None` for mismatched lengths or a zero-norm input; callers decide
/// whether that means skip (candidate) or abort (query).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Rank the pool against a query embedding.
///
/// Candidates below `min_similarity` are discarded, the rest are stable-sorted
/// descending by similarity and truncated to `top_k`. A zero-norm query is an
/// error; a zero-norm or mis-sized candidate embedding is skipped with a
/// warning.
pub fn retrieve(
    query: &[f32],
    pool: &[CandidateRecord],
    top_k: usize,
    min_similarity: f32,
) -> AppResult<Vec<RankedCandidate>> {
    if query.is_empty() || query.iter().all(|x| *x == 0.0) {
        return Err(AppError::pipeline(
            "query embedding has zero norm; cannot rank candidates",
        ));
    }

    let mut ranked: Vec<RankedCandidate> = Vec::new();
    for record in pool {
        match cosine_similarity(query, &record.embedding) {
            Some(similarity) if similarity >= min_similarity => {
                ranked.push(RankedCandidate {
                    record: record.clone(),
                    similarity,
                });
            }
            Some(_) => {}
            None => {
                warn!(candidate = %record.name, "skipping candidate with unusable embedding");
            }
        }
    }

    // Stable sort keeps pool order among equal scores.
    ranked.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(top_k);

    debug!(results = ranked.len(), top_k, min_similarity, "ranked candidate pool");
    Ok(ranked)
}

/// Query text for one epic category: the category name plus its related
/// features.
pub fn build_category_query(category: &str, features: &[String]) -> String {
    format!("Epic: {}. Features: {}", category, features.join(", "))
}

/// Combined fallback query used when the analysis produced no categories.
pub fn build_combined_query(domain: &str, features: &[String], initial_epics: &[String]) -> String {
    format!(
        "Project domain: {}. Features: {}. Initial epics: {}",
        domain,
        features.join(", "),
        initial_epics.join(", ")
    )
}
