//! Estimation Pipeline
//!
//! The five-stage state machine that turns a free-text requirement into a
//! validated estimate: analyze, retrieve, generate, aggregate, validate,
//! with a bounded retry edge from a failed validation back into generation.
//!
//! Stages are strictly sequential because each stage's output is the next
//! stage's input. Independent runs share nothing mutable: every run owns its
//! own `PipelineState` and name registry, and treats the candidate pool and
//! mandatory baseline as immutable snapshots.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{error, info, warn};

use scopecast_core::{
    correct_web_misclassification, ensure_api_platform, resolve_platforms, AnalyzedRequirement,
    Epic, Platform, PipelineStage, PipelineState, ProjectEstimate, ProjectRequirement,
};
use scopecast_providers::{
    AnalysisProvider, CandidateStore, EmbeddingProvider, GenerationContext, GenerationProvider,
};

use crate::config::EstimatorConfig;
use crate::error::{AppError, AppResult};
use crate::services::dedup::NameRegistry;
use crate::services::intake::ingest_generated;
use crate::services::mandatory::load_mandatory_epics;
use crate::services::platform_filter::filter_epics;
use crate::services::retrieval::{build_category_query, build_combined_query, retrieve};
use crate::services::validation::{validate_estimate, ValidationReport};

/// Result of a completed estimation run.
#[derive(Debug)]
pub struct EstimationOutcome {
    pub estimate: ProjectEstimate,
    pub analysis: AnalyzedRequirement,
    pub validation: ValidationReport,
    pub state: PipelineState,
}

/// The estimation pipeline, parameterized over its external collaborators.
pub struct EstimationPipeline {
    analysis: Arc<dyn AnalysisProvider>,
    embedding: Arc<dyn EmbeddingProvider>,
    generation: Arc<dyn GenerationProvider>,
    store: Arc<dyn CandidateStore>,
    config: EstimatorConfig,
}

impl EstimationPipeline {
    pub fn new(
        analysis: Arc<dyn AnalysisProvider>,
        embedding: Arc<dyn EmbeddingProvider>,
        generation: Arc<dyn GenerationProvider>,
        store: Arc<dyn CandidateStore>,
        config: EstimatorConfig,
    ) -> Self {
        Self {
            analysis,
            embedding,
            generation,
            store,
            config,
        }
    }

    /// Run the full pipeline for one requirement.
    ///
    /// Returns the estimate together with the validation report; validation
    /// errors that survive the retry budget are surfaced in the report, not
    /// escalated. Only collaborator failures outside the generation stage
    /// and an empty final epic list abort the run; an aborted run returns
    /// its state ledger inside the error.
    pub async fn run(&self, requirement: &ProjectRequirement) -> AppResult<EstimationOutcome> {
        let mut state = PipelineState::new();
        info!(project = %requirement.project_name, "starting estimation run");

        // ---- Stage 1: analyze -------------------------------------------
        let analysis = match self.analyze_stage(requirement).await {
            Ok(analysis) => analysis,
            Err(e) => {
                let message = format!("Failed to analyze requirements: {}", e);
                state.fail(message.clone());
                return Err(AppError::run_failed(message, state));
            }
        };
        state.advance(PipelineStage::Analyzed);
        info!(
            features = analysis.features.len(),
            platforms = analysis.platforms.len(),
            categories = analysis.epic_categories.len(),
            "requirement analyzed"
        );

        // ---- Stage 2: retrieve ------------------------------------------
        let (retrieved, registry) = match self.retrieve_stage(&analysis).await {
            Ok(result) => result,
            Err(e) => {
                let message = format!("Failed to retrieve epics: {}", e);
                state.fail(message.clone());
                return Err(AppError::run_failed(message, state));
            }
        };
        state.advance(PipelineStage::Retrieved);
        info!(epics = retrieved.len(), "retrieval complete");

        let mandatory_names: Vec<String> = retrieved
            .iter()
            .filter(|e| e.is_mandatory)
            .map(|e| e.name.clone())
            .collect();

        // ---- Stages 3-5: generate, aggregate, validate, bounded retry ---
        loop {
            let mut attempt_registry = registry.clone();
            let mut run_warnings = Vec::new();

            let epics = self
                .generate_stage(&analysis, &retrieved, &mut attempt_registry, &mut run_warnings)
                .await;
            state.advance(PipelineStage::Generated);

            if epics.is_empty() {
                state.fail("No epics available for estimation");
                return Err(AppError::run_failed(
                    "no epics available for estimation",
                    state,
                ));
            }

            let estimate = ProjectEstimate::new(
                requirement.project_name.clone(),
                requirement.description.clone(),
                analysis.platforms.clone(),
                epics,
            );
            state.advance(PipelineStage::Aggregated);
            info!(
                total_hours = estimate.total_hours(),
                epics = estimate.epics.len(),
                mandatory = estimate.mandatory_count(),
                custom = estimate.custom_count(),
                "estimate aggregated"
            );

            let mut validation = validate_estimate(
                &estimate,
                analysis.features.len(),
                &mandatory_names,
                &self.config,
            );
            validation.warnings.extend(run_warnings);
            state.advance(PipelineStage::Validated);

            if !validation.passed() && state.retry_count < self.config.max_retries {
                state.retry_count += 1;
                warn!(
                    retry = state.retry_count,
                    errors = ?validation.errors,
                    "validation failed, regenerating"
                );
                continue;
            }

            info!(
                passed = validation.passed(),
                retries = state.retry_count,
                "estimation run finished"
            );
            return Ok(EstimationOutcome {
                estimate,
                analysis,
                validation,
                state,
            });
        }
    }

    async fn analyze_stage(
        &self,
        requirement: &ProjectRequirement,
    ) -> AppResult<AnalyzedRequirement> {
        let raw = self.analysis.analyze(requirement).await?;

        let mut platforms = resolve_platforms(&raw.platforms);
        if correct_web_misclassification(&requirement.combined_text(), &mut platforms) {
            warn!("replaced Web with Admin: requirement describes an admin dashboard");
        }
        if ensure_api_platform(&mut platforms) {
            info!("auto-added API platform for frontend surfaces");
        }

        Ok(AnalyzedRequirement {
            project_name: requirement.project_name.clone(),
            domain: raw.domain,
            features: raw.features,
            tech_stack: raw.tech_stack,
            platforms,
            initial_epics: raw.initial_epics,
            epic_categories: raw.epic_categories,
            user_types: raw.user_types,
            special_requirements: raw.special_requirements,
        })
    }

    /// Load the mandatory baseline, rank the candidate pool per category
    /// (or with one combined fallback query), deduplicate, and platform-
    /// filter the result.
    async fn retrieve_stage(
        &self,
        analysis: &AnalyzedRequirement,
    ) -> AppResult<(Vec<Epic>, NameRegistry)> {
        let mandatory = match &self.config.mandatory_epics_path {
            Some(path) => match load_mandatory_epics(path) {
                Ok(epics) => epics,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "mandatory epics unavailable, continuing without baseline");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        let mut registry = NameRegistry::new(mandatory.iter().map(|e| e.name.clone()));
        let mut retrieved = mandatory;

        let pool = self.store.fetch_all().await?;
        info!(pool = pool.len(), "candidate pool fetched");

        if !analysis.epic_categories.is_empty() {
            for (category, features) in &analysis.epic_categories {
                if registry.covers_category(category) {
                    info!(category = %category, "skipped category already covered by mandatory epics");
                    continue;
                }

                let query = build_category_query(category, features);
                let embedding = self.embedding.embed_query(&query).await?;
                let ranked = retrieve(
                    &embedding,
                    &pool,
                    self.config.category_top_k,
                    self.config.min_similarity,
                )?;

                for candidate in ranked {
                    if registry.admit_retrieved(&candidate.record.name).is_ok() {
                        retrieved.push(candidate.record.to_epic());
                    }
                }
            }
        } else {
            warn!("analysis produced no epic categories, using combined fallback query");
            let query = build_combined_query(
                &analysis.domain,
                &analysis.features,
                &analysis.initial_epics,
            );
            let embedding = self.embedding.embed_query(&query).await?;
            let ranked = retrieve(
                &embedding,
                &pool,
                self.config.fallback_top_k,
                self.config.min_similarity,
            )?;

            for candidate in ranked {
                if registry.admit_retrieved(&candidate.record.name).is_ok() {
                    retrieved.push(candidate.record.to_epic());
                }
            }
        }

        Ok((filter_epics(retrieved, &analysis.platforms), registry))
    }

    /// Ask the generation collaborator to adapt the retrieved epics and add
    /// new ones. On collaborator failure the retrieved set is used as-is:
    /// a degraded estimate with a warning beats a failed run.
    async fn generate_stage(
        &self,
        analysis: &AnalyzedRequirement,
        retrieved: &[Epic],
        registry: &mut NameRegistry,
        run_warnings: &mut Vec<String>,
    ) -> Vec<Epic> {
        let mandatory: Vec<Epic> = retrieved.iter().filter(|e| e.is_mandatory).cloned().collect();
        let adaptable: Vec<Epic> = retrieved
            .iter()
            .filter(|e| !e.is_mandatory)
            .cloned()
            .collect();

        let context = GenerationContext {
            project_name: analysis.project_name.clone(),
            domain: analysis.domain.clone(),
            features: analysis.features.clone(),
            platforms: analysis.platforms.iter().map(Platform::to_string).collect(),
            user_types: analysis.user_types.clone(),
            existing_epic_names: registry.accepted_names().to_vec(),
            retrieved_epics: adaptable,
            target_count: self.config.min_generated_epics,
        };

        match self.generation.generate_epics(&context).await {
            Ok(response) => {
                let mut epics = mandatory;
                epics.extend(ingest_generated(&response, &analysis.platforms, registry));
                info!(epics = epics.len(), "generation complete");
                epics
            }
            Err(e) => {
                warn!(error = %e, "generation failed, falling back to retrieved epics");
                run_warnings.push(format!("Custom epic generation failed: {}", e));
                retrieved.to_vec()
            }
        }
    }
}

/// Standalone platform-set helper for callers that build estimates directly.
pub fn platform_set(platforms: &[Platform]) -> BTreeSet<Platform> {
    platforms.iter().copied().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
