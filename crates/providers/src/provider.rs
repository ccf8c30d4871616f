//! Collaborator Abstraction Layer
//!
//! Defines the async traits for the pipeline's external collaborators:
//! requirement analysis, embedding, epic generation, and the candidate
//! store. Each trait is object-safe (`Send + Sync`) so the pipeline can
//! hold them as boxed trait objects across Tokio tasks.
//!
//! The pipeline depends only on these traits; concrete backends (OpenAI,
//! mocks in tests) live behind them.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use scopecast_core::{CandidateRecord, Epic, ProjectRequirement};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while calling an external collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderError {
    /// Authentication failed (invalid or missing API key).
    AuthenticationFailed { message: String },

    /// The provider is not reachable or not running.
    ProviderUnavailable { message: String },

    /// A network or connection error occurred.
    NetworkError { message: String },

    /// The provider returned an unexpected or unparseable response.
    ParseError { message: String },

    /// The provider returned an HTTP error.
    ServerError {
        message: String,
        status: Option<u16>,
    },

    /// Rate limit exceeded.
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },

    /// Configuration is invalid or incomplete.
    InvalidConfig { message: String },

    /// Any other error.
    Other { message: String },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticationFailed { message } => {
                write!(f, "authentication failed: {}", message)
            }
            Self::ProviderUnavailable { message } => {
                write!(f, "provider unavailable: {}", message)
            }
            Self::NetworkError { message } => write!(f, "network error: {}", message),
            Self::ParseError { message } => write!(f, "parse error: {}", message),
            Self::ServerError { message, status } => {
                if let Some(code) = status {
                    write!(f, "server error (HTTP {}): {}", code, message)
                } else {
                    write!(f, "server error: {}", message)
                }
            }
            Self::RateLimited { message, .. } => write!(f, "rate limited: {}", message),
            Self::InvalidConfig { message } => write!(f, "invalid config: {}", message),
            Self::Other { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Whether this error is transient and the operation should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::NetworkError { .. }
                | ProviderError::RateLimited { .. }
                | ProviderError::ServerError { .. }
                | ProviderError::ProviderUnavailable { .. }
        )
    }

    /// For rate-limited errors, the suggested wait time in seconds.
    pub fn retry_after_secs(&self) -> Option<u64> {
        if let ProviderError::RateLimited { retry_after, .. } = self {
            retry_after.map(|s| s as u64)
        } else {
            None
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Convenience alias for collaborator operation results.
pub type ProviderResult<T> = Result<T, ProviderError>;

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Raw structured analysis as reported by the analysis collaborator.
///
/// Platforms are free-form strings at this stage; the pipeline resolves them
/// into the closed `Platform` set afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAnalysis {
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub initial_epics: Vec<String>,
    /// Epic categories mapped to their related features, for targeted
    /// retrieval.
    #[serde(default)]
    pub epic_categories: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub user_types: Vec<String>,
    #[serde(default)]
    pub special_requirements: Vec<String>,
}

fn default_domain() -> String {
    "general".to_string()
}

/// Analyzes a free-text requirement into structured form.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Analyze a requirement into features, platforms, and initial epics.
    async fn analyze(&self, requirement: &ProjectRequirement) -> ProviderResult<RawAnalysis>;
}

// ---------------------------------------------------------------------------
// Embedding
// ---------------------------------------------------------------------------

/// Async trait for embedding backends.
///
/// Implementations produce dense vector representations of text. All vectors
/// from one provider instance have the same dimensionality.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, one vector per input, input order preserved.
    async fn embed_documents(&self, documents: &[&str]) -> ProviderResult<Vec<Vec<f32>>>;

    /// Embed a single query text.
    ///
    /// The default implementation delegates to `embed_documents` with a
    /// single-element slice.
    async fn embed_query(&self, query: &str) -> ProviderResult<Vec<f32>> {
        let results = self.embed_documents(&[query]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::other("embed_documents returned no vector for query"))
    }

    /// Dimensionality of the produced vectors.
    fn dimension(&self) -> usize;
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Context handed to the generation collaborator.
///
/// Carries the already-accepted epic names so the collaborator can avoid
/// producing duplicates; the intake layer still enforces deduplication on
/// whatever comes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationContext {
    pub project_name: String,
    pub domain: String,
    pub features: Vec<String>,
    /// Canonical platform names the generated efforts must target.
    pub platforms: Vec<String>,
    pub user_types: Vec<String>,
    /// Names of epics already in the estimate (mandatory + retrieved).
    pub existing_epic_names: Vec<String>,
    /// Non-mandatory retrieved epics the collaborator should adapt to the
    /// current project.
    pub retrieved_epics: Vec<Epic>,
    /// How many additional epics to aim for.
    pub target_count: usize,
}

/// Adapts retrieved epics and generates new ones for uncovered features.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Produce adapted and new epics as untyped JSON.
    ///
    /// The expected shape is `{"modified_epics": [...], "custom_epics":
    /// [...]}` where each epic is `{"name", "description", "tasks":
    /// [{"description", "efforts": {platform: hours}}]}`. Collaborator
    /// output is never trusted: the intake layer parses defensively and
    /// drops malformed fields.
    async fn generate_epics(&self, context: &GenerationContext)
        -> ProviderResult<serde_json::Value>;
}

// ---------------------------------------------------------------------------
// Candidate store
// ---------------------------------------------------------------------------

/// Read-only access to the historical candidate pool.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Fetch every candidate with its precomputed embedding.
    ///
    /// Ranking happens in-process over the full pool; the store does no
    /// filtering or ordering.
    async fn fetch_all(&self) -> ProviderResult<Vec<CandidateRecord>>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // ProviderError tests
    // =========================================================================

    #[test]
    fn error_is_retryable() {
        assert!(ProviderError::NetworkError {
            message: "timeout".into()
        }
        .is_retryable());
        assert!(ProviderError::RateLimited {
            message: "slow down".into(),
            retry_after: Some(5)
        }
        .is_retryable());
        assert!(ProviderError::ServerError {
            message: "500".into(),
            status: Some(500)
        }
        .is_retryable());

        assert!(!ProviderError::AuthenticationFailed {
            message: "bad key".into()
        }
        .is_retryable());
        assert!(!ProviderError::parse("garbage response").is_retryable());
    }

    #[test]
    fn error_retry_after_secs() {
        let err = ProviderError::RateLimited {
            message: "slow down".into(),
            retry_after: Some(30),
        };
        assert_eq!(err.retry_after_secs(), Some(30));

        let err = ProviderError::NetworkError {
            message: "timeout".into(),
        };
        assert_eq!(err.retry_after_secs(), None);
    }

    #[test]
    fn error_display() {
        let err = ProviderError::ServerError {
            message: "upstream exploded".into(),
            status: Some(502),
        };
        assert_eq!(err.to_string(), "server error (HTTP 502): upstream exploded");
    }

    #[test]
    fn error_serde_roundtrip() {
        let err = ProviderError::RateLimited {
            message: "slow down".into(),
            retry_after: Some(10),
        };
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: ProviderError = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            deserialized,
            ProviderError::RateLimited {
                retry_after: Some(10),
                ..
            }
        ));
    }

    // =========================================================================
    // RawAnalysis tests
    // =========================================================================

    #[test]
    fn raw_analysis_defaults_missing_fields() {
        let analysis: RawAnalysis = serde_json::from_str(
            r#"{"features": ["checkout"], "platforms": ["Mobile App"]}"#,
        )
        .unwrap();

        assert_eq!(analysis.domain, "general");
        assert_eq!(analysis.features, vec!["checkout"]);
        assert_eq!(analysis.platforms, vec!["Mobile App"]);
        assert!(analysis.epic_categories.is_empty());
        assert!(analysis.user_types.is_empty());
    }

    // =========================================================================
    // Trait object safety tests
    // =========================================================================

    #[test]
    fn collaborator_traits_are_object_safe() {
        fn _analysis(_: &dyn AnalysisProvider) {}
        fn _embedding(_: &dyn EmbeddingProvider) {}
        fn _generation(_: &dyn GenerationProvider) {}
        fn _store(_: &dyn CandidateStore) {}
    }

    #[test]
    fn collaborator_trait_objects_are_send_sync() {
        fn _assert_send_sync<T: Send + Sync>() {}
        _assert_send_sync::<Box<dyn AnalysisProvider>>();
        _assert_send_sync::<Box<dyn EmbeddingProvider>>();
        _assert_send_sync::<Box<dyn GenerationProvider>>();
        _assert_send_sync::<Box<dyn CandidateStore>>();
    }
}
