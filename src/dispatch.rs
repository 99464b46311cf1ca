//! Strategy selection and source invocation.
//!
//! The richness tier picks a strategy; unreachable model sources demote the
//! strategy one tier at a time until one can run. The heuristic estimate is
//! always taken first.
//!
//! | Tier      | Strategy             | Model use                                   |
//! |-----------|----------------------|---------------------------------------------|
//! | rich      | `full_analysis`      | every model scores all axes (fan-out)       |
//! | moderate  | `hybrid_analysis`    | models re-score only uncertain axes         |
//! | limited   | `assisted_inference` | one validation call nudges confidence       |
//! | none      | `pure_inference`     | none                                        |

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::axes::{Axis, ScoreVector};
use crate::merge::WeightedEstimate;
use crate::parser::Verdict;
use crate::richness::RichnessTier;
use crate::sources::{EstimateContext, ModelSource, ScoringSource, SourceError, SourceEstimate};
use crate::subject::Subject;

/// Pipeline path that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    FullAnalysis,
    HybridAnalysis,
    AssistedInference,
    PureInference,
    Fallback,
}

impl Strategy {
    pub fn for_tier(tier: RichnessTier) -> Self {
        match tier {
            RichnessTier::Rich => Strategy::FullAnalysis,
            RichnessTier::Moderate => Strategy::HybridAnalysis,
            RichnessTier::Limited => Strategy::AssistedInference,
            RichnessTier::None => Strategy::PureInference,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::FullAnalysis => "full_analysis",
            Strategy::HybridAnalysis => "hybrid_analysis",
            Strategy::AssistedInference => "assisted_inference",
            Strategy::PureInference => "pure_inference",
            Strategy::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Config
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Heuristic weight in full analysis; models share the remainder evenly.
    pub full_heuristic_weight: f64,
    /// Heuristic weight on refined axes in hybrid analysis.
    pub hybrid_heuristic_weight: f64,
    /// Axes with |heuristic score| below this are refined in hybrid analysis.
    pub uncertainty_threshold: f64,
    /// Consecutive failures after which a model is skipped for the batch.
    pub breaker_threshold: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            full_heuristic_weight: 0.3,
            hybrid_heuristic_weight: 0.6,
            uncertainty_threshold: 30.0,
            breaker_threshold: 3,
        }
    }
}

// =============================================================================
// Provider health
// =============================================================================

/// Consecutive-failure counters per model source, scoped to one batch.
#[derive(Debug)]
pub struct ProviderHealth {
    threshold: u32,
    failures: Mutex<HashMap<String, u32>>,
}

impl Default for ProviderHealth {
    fn default() -> Self {
        Self::new(DispatchConfig::default().breaker_threshold)
    }
}

impl ProviderHealth {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            failures: Mutex::new(HashMap::new()),
        }
    }

    fn with_counts<T>(&self, f: impl FnOnce(&mut HashMap<String, u32>) -> T) -> T {
        match self.failures.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    pub fn is_available(&self, source_id: &str) -> bool {
        self.with_counts(|m| m.get(source_id).copied().unwrap_or(0) < self.threshold)
    }

    pub fn record_success(&self, source_id: &str) {
        self.with_counts(|m| {
            m.remove(source_id);
        });
    }

    pub fn record_failure(&self, source_id: &str) {
        let tripped = self.with_counts(|m| {
            let n = m.entry(source_id.to_string()).or_insert(0);
            *n += 1;
            *n == self.threshold
        });
        if tripped {
            warn!(
                source = source_id,
                threshold = self.threshold,
                "model source disabled for the rest of the batch"
            );
        }
    }

    /// Ids currently tripped.
    pub fn disabled(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.with_counts(|m| {
            m.iter()
                .filter(|(_, n)| **n >= self.threshold)
                .map(|(id, _)| id.clone())
                .collect()
        });
        ids.sort();
        ids
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// What the dispatcher obtained for one subject.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub strategy: Strategy,
    pub heuristic: SourceEstimate,
    /// Estimates with their assigned weights, heuristic first.
    pub weighted: Vec<WeightedEstimate>,
    pub validation: Option<Verdict>,
    /// Soft failures and degradations, for the rationale.
    pub notes: Vec<String>,
}

pub struct Dispatcher {
    heuristic: Arc<dyn ScoringSource>,
    models: Vec<ModelSource>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        heuristic: Arc<dyn ScoringSource>,
        models: Vec<ModelSource>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            heuristic,
            models,
            config,
        }
    }

    pub fn with_heuristic(mut self, heuristic: Arc<dyn ScoringSource>) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn with_models(mut self, models: Vec<ModelSource>) -> Self {
        self.models = models;
        self
    }

    pub fn models(&self) -> &[ModelSource] {
        &self.models
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run the strategy for `tier`, demoting as needed. Only faults error.
    pub async fn dispatch(
        &self,
        subject: &Subject,
        tier: RichnessTier,
        ctx: &EstimateContext,
        health: &ProviderHealth,
    ) -> Result<DispatchOutcome, SourceError> {
        let heuristic = self.heuristic.estimate(subject, ctx).await?;

        let mut failed: HashSet<String> = HashSet::new();
        let mut notes = Vec::new();
        let mut tier = tier;

        loop {
            let strategy = Strategy::for_tier(tier);
            let available: Vec<&ModelSource> = self
                .models
                .iter()
                .filter(|m| !failed.contains(m.id()) && health.is_available(m.id()))
                .collect();

            if strategy != Strategy::PureInference && available.is_empty() {
                debug!(subject = %subject.name, %strategy, "no model source available, demoting");
                tier = tier.lower();
                continue;
            }

            let step = match strategy {
                Strategy::FullAnalysis => {
                    self.full_analysis(
                        subject,
                        &heuristic,
                        &available,
                        ctx,
                        health,
                        &mut failed,
                        &mut notes,
                    )
                    .await?
                }
                Strategy::HybridAnalysis => {
                    self.hybrid_analysis(
                        subject,
                        &heuristic,
                        &available,
                        ctx,
                        health,
                        &mut failed,
                        &mut notes,
                    )
                    .await?
                }
                Strategy::AssistedInference => {
                    self.assisted_inference(
                        subject,
                        &heuristic,
                        &available,
                        ctx,
                        health,
                        &mut failed,
                        &mut notes,
                    )
                    .await?
                }
                Strategy::PureInference | Strategy::Fallback => Some(Step {
                    weighted: vec![WeightedEstimate::new(heuristic.clone(), 1.0)],
                    validation: None,
                }),
            };

            match step {
                Some(step) => {
                    info!(
                        subject = %subject.name,
                        %strategy,
                        estimates = step.weighted.len(),
                        "dispatch complete"
                    );
                    return Ok(DispatchOutcome {
                        strategy,
                        heuristic,
                        weighted: step.weighted,
                        validation: step.validation,
                        notes,
                    });
                }
                None => {
                    debug!(
                        subject = %subject.name,
                        %strategy,
                        "every model source failed, demoting"
                    );
                    tier = tier.lower();
                }
            }
        }
    }

    fn absorb(
        &self,
        source_id: &str,
        err: SourceError,
        health: &ProviderHealth,
        failed: &mut HashSet<String>,
        notes: &mut Vec<String>,
    ) -> Result<(), SourceError> {
        if !err.is_soft() {
            return Err(err);
        }
        health.record_failure(source_id);
        failed.insert(source_id.to_string());
        notes.push(format!("{source_id} unavailable ({})", err.code()));
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn full_analysis(
        &self,
        subject: &Subject,
        heuristic: &SourceEstimate,
        available: &[&ModelSource],
        ctx: &EstimateContext,
        health: &ProviderHealth,
        failed: &mut HashSet<String>,
        notes: &mut Vec<String>,
    ) -> Result<Option<Step>, SourceError> {
        let results: Vec<Result<SourceEstimate, SourceError>> = stream::iter(available.iter())
            .map(|m| m.estimate_all(subject, ctx))
            .buffered(available.len().max(1))
            .collect()
            .await;

        let model_weight = (1.0 - self.config.full_heuristic_weight) / available.len() as f64;
        let mut weighted = vec![WeightedEstimate::new(
            heuristic.clone(),
            self.config.full_heuristic_weight,
        )];
        let mut reached = 0usize;

        for (source, result) in available.iter().zip(results) {
            match result {
                Ok(estimate) => {
                    health.record_success(source.id());
                    reached += 1;
                    if estimate.is_degraded() {
                        notes.push(format!("{} response unreadable", source.id()));
                    }
                    weighted.push(WeightedEstimate::new(estimate, model_weight));
                }
                Err(err) => self.absorb(source.id(), err, health, failed, notes)?,
            }
        }

        Ok((reached > 0).then_some(Step {
            weighted,
            validation: None,
        }))
    }

    #[allow(clippy::too_many_arguments)]
    async fn hybrid_analysis(
        &self,
        subject: &Subject,
        heuristic: &SourceEstimate,
        available: &[&ModelSource],
        ctx: &EstimateContext,
        health: &ProviderHealth,
        failed: &mut HashSet<String>,
        notes: &mut Vec<String>,
    ) -> Result<Option<Step>, SourceError> {
        let uncertain = uncertain_axes(&heuristic.scores, self.config.uncertainty_threshold);
        let mut weighted = vec![WeightedEstimate::new(
            heuristic.clone(),
            self.config.hybrid_heuristic_weight,
        )];
        if uncertain.is_empty() {
            return Ok(Some(Step {
                weighted,
                validation: None,
            }));
        }

        let results: Vec<Result<SourceEstimate, SourceError>> = stream::iter(available.iter())
            .map(|m| m.refine(subject, &heuristic.scores, &uncertain, ctx))
            .buffered(available.len().max(1))
            .collect()
            .await;

        let model_weight = (1.0 - self.config.hybrid_heuristic_weight) / available.len() as f64;
        let mut reached = 0usize;

        for (source, result) in available.iter().zip(results) {
            match result {
                Ok(estimate) => {
                    health.record_success(source.id());
                    reached += 1;
                    if estimate.is_degraded() {
                        notes.push(format!("{} refinement unreadable", source.id()));
                    }
                    weighted.push(WeightedEstimate::new(estimate, model_weight));
                }
                Err(err) => self.absorb(source.id(), err, health, failed, notes)?,
            }
        }

        Ok((reached > 0).then_some(Step {
            weighted,
            validation: None,
        }))
    }

    #[allow(clippy::too_many_arguments)]
    async fn assisted_inference(
        &self,
        subject: &Subject,
        heuristic: &SourceEstimate,
        available: &[&ModelSource],
        ctx: &EstimateContext,
        health: &ProviderHealth,
        failed: &mut HashSet<String>,
        notes: &mut Vec<String>,
    ) -> Result<Option<Step>, SourceError> {
        let Some(source) = available.first() else {
            return Ok(None);
        };
        match source
            .validate(subject, heuristic.scores.type_code(), ctx)
            .await
        {
            Ok(verdict) => {
                health.record_success(source.id());
                Ok(Some(Step {
                    weighted: vec![WeightedEstimate::new(heuristic.clone(), 1.0)],
                    validation: Some(verdict),
                }))
            }
            Err(err) => {
                self.absorb(source.id(), err, health, failed, notes)?;
                Ok(None)
            }
        }
    }
}

struct Step {
    weighted: Vec<WeightedEstimate>,
    validation: Option<Verdict>,
}

/// Axes whose magnitude is below `threshold`, in axis order.
pub fn uncertain_axes(scores: &ScoreVector, threshold: f64) -> Vec<Axis> {
    scores
        .iter()
        .filter(|(_, v)| v.abs() < threshold)
        .map(|(a, _)| a)
        .collect()
}
