//! # Scopecast Providers
//!
//! External collaborator abstractions for the estimation pipeline: async
//! traits for requirement analysis, embedding, epic generation, and the
//! historical candidate store, plus the OpenAI-backed implementation.
//!
//! The pipeline crate depends only on the traits; tests swap in mocks.

pub mod openai;
pub mod provider;
pub mod store;

pub use openai::{OpenAiClient, OpenAiConfig};
pub use provider::{
    AnalysisProvider, CandidateStore, EmbeddingProvider, GenerationContext, GenerationProvider,
    ProviderError, ProviderResult, RawAnalysis,
};
pub use store::JsonFileStore;
