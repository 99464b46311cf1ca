#![forbid(unsafe_code)]

//! # archetype-harness
//!
//! Classifies artists into one of sixteen four-letter archetypes.
//!
//! Each archetype is the sign pattern of four bipolar axes (L/S, A/R, E/M,
//! F/C) scored in `[-100, 100]`. How much external analysis is spent on a
//! subject depends on how much metadata it carries: rich subjects fan out to
//! every configured model, thin ones fall back to a deterministic category
//! lookup. Scores are merged per axis, a batch-scoped diversity check keeps
//! one default-prone archetype from swamping the output, and every subject
//! gets a result, degraded to a low-confidence fallback when the pipeline
//! cannot finish.

pub mod axes;
pub mod batch;
pub mod category;
pub mod classifier;
pub mod confidence;
pub mod config;
pub mod dispatch;
pub mod diversity;
pub mod fallback;
pub mod gateway;
pub mod merge;
pub mod parser;
pub mod prompts;
pub mod richness;
pub mod sources;
pub mod subject;

pub use axes::{Axis, ScoreVector, TypeCode, TypeCodeError};
pub use batch::{BatchOptions, BatchReport, BatchStats};
pub use category::Category;
pub use classifier::{ClassificationResult, ClassificationSession, Classifier, PipelineError};
pub use config::{ClassifierConfig, ConfigError};
pub use dispatch::Strategy;
pub use gateway::{Attribution, ChatGateway, ProviderGateway, UsageSink};
pub use richness::RichnessTier;
pub use sources::{AnalysisProvider, ModelSource, ScoringSource, SourceError};
pub use subject::Subject;
