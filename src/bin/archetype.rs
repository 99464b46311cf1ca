#![forbid(unsafe_code)]

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use archetype_harness::axes::{ScoreVector, TypeCode};
use archetype_harness::category::{categorize, Category};
use archetype_harness::gateway::{ChatGateway, MemoryUsageSink, ProviderGateway, UsageSummary};
use archetype_harness::richness::{self, RichnessTier};
use archetype_harness::{
    BatchOptions, BatchReport, Classifier, ClassifierConfig, ModelSource, Subject,
};

#[derive(Parser)]
#[command(name = "archetype", version, about = "Artist archetype classifier")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify subjects from a JSON array or JSONL file
    Classify {
        #[arg(long)]
        input: PathBuf,
        /// Write the report here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Comma-separated OpenRouter model ids (overrides config)
        #[arg(long, value_delimiter = ',')]
        models: Vec<String>,
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Show richness, category and heuristic scores without calling any model
    Inspect {
        #[arg(long)]
        input: PathBuf,
    },
    /// List the sixteen archetypes
    Types,
}

#[derive(Serialize)]
struct ClassifyOutput<'a> {
    #[serde(flatten)]
    report: &'a BatchReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<UsageSummary>,
}

#[derive(Serialize)]
struct InspectRow {
    name: String,
    richness: u8,
    tier: RichnessTier,
    factors: Vec<String>,
    category: Category,
    heuristic_scores: ScoreVector,
    heuristic_type: TypeCode,
    attribution: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify {
            input,
            out,
            config,
            models,
            concurrency,
        } => {
            let mut config = match config {
                Some(path) => ClassifierConfig::load_from_path(path)?,
                None => ClassifierConfig::default(),
            };
            if !models.is_empty() {
                config.models = models;
            }
            if let Some(n) = concurrency {
                config.concurrency = n;
            }
            config.validate()?;

            let subjects = read_subjects(&input)?;
            let usage = Arc::new(MemoryUsageSink::new());
            let mut classifier = Classifier::new(config.clone());
            if !config.models.is_empty() {
                let gateway: Arc<dyn ChatGateway> =
                    Arc::new(ProviderGateway::from_env(usage.clone())?);
                let sources = config
                    .models
                    .iter()
                    .map(|id| {
                        ModelSource::from_gateway(gateway.clone(), id)
                            .with_timeout(config.model_timeout())
                    })
                    .collect();
                classifier = classifier.with_models(sources);
            }

            let cancel = Arc::new(AtomicBool::new(false));
            {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("interrupt received, no further subjects will start");
                        cancel.store(true, AtomicOrdering::Relaxed);
                    }
                });
            }

            let report = classifier
                .classify_batch(&subjects, BatchOptions::default().cancel_flag(cancel))
                .await;
            let output = ClassifyOutput {
                report: &report,
                usage: (!config.models.is_empty()).then(|| usage.summary()),
            };
            write_output(out.as_ref(), &output)?;
            info!(
                results = report.results.len(),
                fallbacks = report.stats.fallback_count,
                "classification written"
            );
        }
        Commands::Inspect { input } => {
            let subjects = read_subjects(&input)?;
            let rows: Vec<InspectRow> = subjects
                .iter()
                .map(|s| {
                    let report = richness::evaluate(s);
                    let category = categorize(s);
                    let profile = category.profile();
                    InspectRow {
                        name: s.name.clone(),
                        richness: report.score,
                        tier: report.tier,
                        factors: report.factors,
                        category,
                        heuristic_scores: profile.scores,
                        heuristic_type: profile.type_code(),
                        attribution: s.is_attribution(),
                    }
                })
                .collect();
            write_output(None, &rows)?;
        }
        Commands::Types => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            for code in TypeCode::ALL {
                let profile = code.profile();
                let c = profile.canonical;
                writeln!(
                    handle,
                    "{code}  {:<22} {:<10} [{}, {}, {}, {}]",
                    profile.title, profile.animal, c[0], c[1], c[2], c[3]
                )?;
            }
        }
    }

    Ok(())
}

/// Subjects from a JSON array, or one JSON object per line.
fn read_subjects(path: &PathBuf) -> Result<Vec<Subject>, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    if raw.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(&raw)?);
    }
    let mut subjects = Vec::new();
    for (i, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let subject: Subject = serde_json::from_str(line)
            .map_err(|e| format!("{}:{}: {e}", path.display(), i + 1))?;
        subjects.push(subject);
    }
    Ok(subjects)
}

fn write_output<T: Serialize>(path: Option<&PathBuf>, value: &T) -> Result<(), io::Error> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    match path {
        Some(path) => std::fs::write(path, json),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{json}")
        }
    }
}
