//! Batch classification.
//!
//! One fresh [`ClassificationSession`] per batch, so distribution counts and
//! provider health never leak between batches. Results come back in input
//! order. The cancel flag is checked before each subject is started; a
//! subject that has started always finishes with a full result.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use futures::future;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::classifier::{ClassificationResult, Classifier};
use crate::subject::Subject;

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Subjects in flight at once; falls back to the config value when unset.
    pub concurrency: Option<usize>,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl BatchOptions {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = Some(n);
        self
    }

    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }
}

/// Aggregates over a batch's results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub type_counts: BTreeMap<String, usize>,
    pub strategy_counts: BTreeMap<String, usize>,
    pub average_confidence: f64,
    pub fallback_count: usize,
    pub adjusted_count: usize,
}

impl BatchStats {
    pub fn from_results(results: &[ClassificationResult]) -> Self {
        let mut stats = BatchStats {
            total: results.len(),
            ..Default::default()
        };
        let mut confidence_sum = 0u64;
        for r in results {
            *stats.type_counts.entry(r.type_code.to_string()).or_insert(0) += 1;
            *stats
                .strategy_counts
                .entry(r.strategy.as_str().to_string())
                .or_insert(0) += 1;
            confidence_sum += u64::from(r.confidence);
            if r.is_fallback() {
                stats.fallback_count += 1;
            }
            if r.adjusted {
                stats.adjusted_count += 1;
            }
        }
        if !results.is_empty() {
            stats.average_confidence = confidence_sum as f64 / results.len() as f64;
        }
        stats
    }

    /// Share of results carrying `code`.
    pub fn share(&self, code: &str) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.type_counts.get(code).copied().unwrap_or(0) as f64 / self.total as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub results: Vec<ClassificationResult>,
    pub stats: BatchStats,
    /// True when the cancel flag stopped the batch before every subject started.
    pub cancelled: bool,
    /// Model sources the breaker disabled during the batch.
    #[serde(default)]
    pub disabled_sources: Vec<String>,
}

impl Classifier {
    pub async fn classify_batch(&self, subjects: &[Subject], options: BatchOptions) -> BatchReport {
        let session = self.session();
        let concurrency = options
            .concurrency
            .unwrap_or(self.config().concurrency)
            .max(1);
        let cancel = options.cancel;
        let is_cancelled = || {
            cancel
                .as_ref()
                .is_some_and(|flag| flag.load(AtomicOrdering::Relaxed))
        };

        info!(
            batch_id = %session.batch_id(),
            subjects = subjects.len(),
            concurrency,
            models = ?self.model_ids(),
            "batch started"
        );

        let results: Vec<ClassificationResult> = stream::iter(subjects.iter())
            .take_while(|_| future::ready(!is_cancelled()))
            .map(|subject| self.classify(subject, &session))
            .buffered(concurrency)
            .collect()
            .await;

        let cancelled = results.len() < subjects.len();
        if cancelled {
            warn!(
                batch_id = %session.batch_id(),
                completed = results.len(),
                remaining = subjects.len() - results.len(),
                "batch cancelled"
            );
        }

        let stats = BatchStats::from_results(&results);
        info!(
            batch_id = %session.batch_id(),
            total = stats.total,
            fallbacks = stats.fallback_count,
            adjusted = stats.adjusted_count,
            average_confidence = stats.average_confidence,
            "batch finished"
        );

        BatchReport {
            batch_id: session.batch_id(),
            results,
            stats,
            cancelled,
            disabled_sources: session.health().disabled(),
        }
    }
}
