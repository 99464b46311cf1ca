//! Orchestrator: one subject in, one [`ClassificationResult`] out.
//!
//! The pipeline runs richness, dispatch, merge, diversity correction and
//! confidence in sequence. Any error or panic inside it is converted into the
//! safety fallback at this boundary; `classify` itself never fails.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::axes::{ScoreVector, TypeCode};
use crate::category::{categorize, Category};
use crate::confidence::{self, ConfidenceInputs};
use crate::config::ClassifierConfig;
use crate::dispatch::{DispatchOutcome, Dispatcher, ProviderHealth, Strategy};
use crate::diversity::{Correction, DistributionState};
use crate::fallback::fallback_result;
use crate::merge::merge;
use crate::richness::{self, RichnessTier};
use crate::sources::{
    EstimateContext, HeuristicSource, ModelSource, ScoringSource, SourceError, SourceKind,
};
use crate::subject::Subject;

/// Final output for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub subject: String,
    pub type_code: TypeCode,
    pub title: String,
    pub animal: String,
    pub scores: ScoreVector,
    /// 0..=95; fallback results are at most 30.
    pub confidence: u8,
    pub alternates: Vec<TypeCode>,
    pub rationale: String,
    pub strategy: Strategy,
    pub adjusted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub richness_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<RichnessTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Ids of the estimates that were merged.
    #[serde(default)]
    pub sources: Vec<String>,
}

impl ClassificationResult {
    pub fn is_fallback(&self) -> bool {
        self.strategy == Strategy::Fallback
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("pipeline panicked: {0}")]
    Panic(String),

    #[error("pipeline invariant violated: {0}")]
    Invariant(String),
}

// =============================================================================
// Session
// =============================================================================

/// Mutable state shared by every classification in one batch.
#[derive(Debug)]
pub struct ClassificationSession {
    batch_id: Uuid,
    distribution: Mutex<DistributionState>,
    health: ProviderHealth,
}

impl ClassificationSession {
    pub fn new(breaker_threshold: u32) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            distribution: Mutex::new(DistributionState::new()),
            health: ProviderHealth::new(breaker_threshold),
        }
    }

    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    pub fn health(&self) -> &ProviderHealth {
        &self.health
    }

    fn with_distribution<T>(&self, f: impl FnOnce(&mut DistributionState) -> T) -> T {
        match self.distribution.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    pub fn distribution(&self) -> DistributionState {
        self.with_distribution(|d| d.clone())
    }

    /// Clear assignment counts; provider health is kept.
    pub fn reset_distribution(&self) {
        self.with_distribution(DistributionState::reset);
    }
}

// =============================================================================
// Classifier
// =============================================================================

pub struct Classifier {
    dispatcher: Dispatcher,
    config: ClassifierConfig,
}

impl Classifier {
    /// Heuristic-only classifier; add models with [`Classifier::with_models`].
    pub fn new(config: ClassifierConfig) -> Self {
        let dispatcher = Dispatcher::new(
            Arc::new(HeuristicSource::new()),
            Vec::new(),
            config.dispatch.clone(),
        );
        Self { dispatcher, config }
    }

    pub fn with_models(mut self, models: Vec<ModelSource>) -> Self {
        self.dispatcher = self.dispatcher.with_models(models);
        self
    }

    pub fn with_heuristic(mut self, heuristic: Arc<dyn ScoringSource>) -> Self {
        self.dispatcher = self.dispatcher.with_heuristic(heuristic);
        self
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn model_ids(&self) -> Vec<String> {
        self.dispatcher.models().iter().map(|m| m.id().to_string()).collect()
    }

    pub fn session(&self) -> ClassificationSession {
        ClassificationSession::new(self.config.dispatch.breaker_threshold)
    }

    /// Classify one subject. Always returns a result.
    pub async fn classify(
        &self,
        subject: &Subject,
        session: &ClassificationSession,
    ) -> ClassificationResult {
        let run = AssertUnwindSafe(self.run_pipeline(subject, session))
            .catch_unwind()
            .await;
        let err = match run {
            Ok(Ok(result)) => return result,
            Ok(Err(err)) => err,
            Err(payload) => PipelineError::Panic(panic_message(payload.as_ref())),
        };
        warn!(subject = %subject.name, error = %err, "classification fell back");
        fallback_result(subject, &err.to_string())
    }

    async fn run_pipeline(
        &self,
        subject: &Subject,
        session: &ClassificationSession,
    ) -> Result<ClassificationResult, PipelineError> {
        let report = richness::evaluate(subject);
        let category = categorize(subject);
        debug!(
            subject = %subject.name,
            richness = report.score,
            tier = %report.tier,
            category = %category,
            "evaluated subject"
        );

        let ctx = EstimateContext::new(report.tier, Some(session.batch_id));
        let outcome = self
            .dispatcher
            .dispatch(subject, report.tier, &ctx, &session.health)
            .await?;

        let merged = merge(&outcome.weighted);
        if merged.sources_used() == 0 {
            return Err(PipelineError::Invariant(
                "no estimate contributed to the merge".to_string(),
            ));
        }

        // Read-then-increment under one lock.
        let correction = session.with_distribution(|d| {
            d.correct_and_record(&self.config.diversity, merged.scores, category)
        });

        let confidence = confidence::score(&ConfidenceInputs {
            richness: report.score,
            sources_merged: merged.sources_used(),
            scores: merged.scores,
            validation: outcome.validation,
            diversity_penalty: if correction.adjusted {
                self.config.diversity.penalty
            } else {
                0
            },
        });

        let profile = correction.type_code.profile();
        let result = ClassificationResult {
            subject: subject.name.clone(),
            type_code: correction.type_code,
            title: profile.title.to_string(),
            animal: profile.animal.to_string(),
            scores: correction.scores,
            confidence,
            alternates: correction.scores.alternates(),
            rationale: compose_rationale(&outcome, &correction),
            strategy: outcome.strategy,
            adjusted: correction.adjusted,
            richness_score: Some(report.score),
            tier: Some(report.tier),
            category: Some(category),
            sources: merged.contributors,
        };

        info!(
            subject = %result.subject,
            type_code = %result.type_code,
            strategy = %result.strategy,
            confidence = result.confidence,
            adjusted = result.adjusted,
            "classified"
        );
        Ok(result)
    }
}

fn compose_rationale(outcome: &DispatchOutcome, correction: &Correction) -> String {
    let mut parts = vec![outcome.heuristic.rationale.clone()];

    for w in &outcome.weighted {
        let est = &w.estimate;
        if est.kind == SourceKind::Model && !est.rationale.is_empty() {
            parts.push(format!("{}: {}", est.source_id, est.rationale));
        }
    }
    if let Some(verdict) = outcome.validation {
        parts.push(format!("validation: {}", verdict.as_str()));
    }
    parts.extend(outcome.notes.iter().cloned());
    if let Some(replaced) = correction.replaced {
        parts.push(format!(
            "diversity: {replaced} over batch ceiling, replaced with {}",
            correction.type_code
        ));
    }

    parts.join("; ")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Faulty;

    #[async_trait]
    impl ScoringSource for Faulty {
        fn id(&self) -> &str {
            "faulty"
        }

        fn kind(&self) -> SourceKind {
            SourceKind::Heuristic
        }

        async fn estimate(
            &self,
            _subject: &Subject,
            _ctx: &crate::sources::EstimateContext,
        ) -> Result<crate::sources::SourceEstimate, SourceError> {
            Err(SourceError::Fault("category table missing".to_string()))
        }
    }

    struct Panicky;

    #[async_trait]
    impl ScoringSource for Panicky {
        fn id(&self) -> &str {
            "panicky"
        }

        fn kind(&self) -> SourceKind {
            SourceKind::Heuristic
        }

        async fn estimate(
            &self,
            _subject: &Subject,
            _ctx: &crate::sources::EstimateContext,
        ) -> Result<crate::sources::SourceEstimate, SourceError> {
            panic!("index out of bounds");
        }
    }

    #[tokio::test]
    async fn heuristic_only_result() {
        let classifier = Classifier::new(ClassifierConfig::default());
        let session = classifier.session();
        let r = classifier
            .classify(&Subject::new("Jacques-Louis David").with_movement("Neoclassicism"), &session)
            .await;
        assert_eq!(r.type_code, TypeCode::SRMC);
        assert_eq!(r.strategy, Strategy::PureInference);
        assert_eq!(r.category, Some(Category::Neoclassical));
        assert_eq!(r.sources, vec!["heuristic".to_string()]);
        assert_eq!(session.distribution().count(TypeCode::SRMC), 1);
    }

    #[tokio::test]
    async fn fault_becomes_fallback() {
        let classifier =
            Classifier::new(ClassifierConfig::default()).with_heuristic(Arc::new(Faulty));
        let session = classifier.session();
        let r = classifier.classify(&Subject::new("X"), &session).await;
        assert!(r.is_fallback());
        assert!(r.rationale.contains("category table missing"));
        assert_eq!(session.distribution().total(), 0);
    }

    #[tokio::test]
    async fn panic_becomes_fallback() {
        let classifier =
            Classifier::new(ClassifierConfig::default()).with_heuristic(Arc::new(Panicky));
        let session = classifier.session();
        let r = classifier.classify(&Subject::new("X"), &session).await;
        assert!(r.is_fallback());
        assert!(r.confidence <= 30);
        assert!(r.rationale.contains("index out of bounds"));
    }

    #[test]
    fn reset_clears_distribution() {
        let session = ClassificationSession::new(3);
        session.with_distribution(|d| d.record(TypeCode::LAEF));
        session.reset_distribution();
        assert_eq!(session.distribution().total(), 0);
    }
}
