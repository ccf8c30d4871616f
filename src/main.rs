use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scopecast::core::ProjectRequirement;
use scopecast::providers::{JsonFileStore, OpenAiClient, OpenAiConfig};
use scopecast::{
    compare_documents, EstimationPipeline, EstimatorConfig, DEFAULT_MATCH_THRESHOLD,
};

#[derive(Parser)]
#[command(name = "scopecast")]
#[command(about = "Similarity-driven project effort estimation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate a project from a requirement file
    Estimate {
        /// Requirement JSON: {"project_name", "description", "additional_context"?}
        requirement: PathBuf,

        /// Candidate pool JSON (array of records with embeddings)
        #[arg(short, long)]
        pool: PathBuf,

        /// Estimator configuration JSON; defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the estimate to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compare a predicted estimate against a known-actual one
    Compare {
        /// Actual estimate JSON
        actual: PathBuf,

        /// Predicted estimate JSON
        predicted: PathBuf,

        /// Minimum similarity for a fuzzy epic match
        #[arg(short, long, default_value_t = DEFAULT_MATCH_THRESHOLD)]
        threshold: f64,

        /// Write the report to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "scopecast=info".into()),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn read_json(path: &PathBuf) -> anyhow::Result<serde_json::Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn write_json(output: Option<PathBuf>, value: &serde_json::Value) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => std::fs::write(&path, rendered)
            .with_context(|| format!("cannot write {}", path.display()))?,
        None => println!("{}", rendered),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Estimate {
            requirement,
            pool,
            config,
            output,
        } => {
            let requirement: ProjectRequirement = serde_json::from_value(read_json(&requirement)?)
                .context("invalid requirement file")?;
            let config = match config {
                Some(path) => EstimatorConfig::load(&path)?,
                None => EstimatorConfig::default(),
            };

            let openai = Arc::new(OpenAiClient::new(OpenAiConfig {
                api_key: std::env::var("OPENAI_API_KEY").ok(),
                ..OpenAiConfig::default()
            }));
            let store = Arc::new(JsonFileStore::new(pool));

            let pipeline = EstimationPipeline::new(
                openai.clone(),
                openai.clone(),
                openai,
                store,
                config,
            );
            let outcome = pipeline.run(&requirement).await?;

            if !outcome.validation.passed() {
                tracing::warn!(errors = ?outcome.validation.errors, "estimate failed validation");
            }
            for warning in &outcome.validation.warnings {
                tracing::warn!(%warning, "quality warning");
            }

            write_json(
                output,
                &serde_json::json!({
                    "estimate": outcome.estimate,
                    "analysis": outcome.analysis,
                    "validation": outcome.validation,
                    "state": outcome.state,
                }),
            )?;
        }
        Commands::Compare {
            actual,
            predicted,
            threshold,
            output,
        } => {
            let actual = read_json(&actual)?;
            let predicted = read_json(&predicted)?;

            let report = compare_documents(&actual, &predicted, threshold);
            tracing::info!(
                coverage = report.coverage_percentage,
                exact = report.exact_matches,
                fuzzy = report.fuzzy_matches,
                missing = report.missing.len(),
                extra = report.extra.len(),
                "comparison complete"
            );
            write_json(output, &serde_json::to_value(&report)?)?;
        }
    }

    Ok(())
}
