//! Scoring sources: anything that produces per-axis estimates for a subject.
//!
//! Two kinds ship with the crate:
//! - [`HeuristicSource`]: deterministic category lookup, never fails
//! - [`ModelSource`]: one external analysis provider behind a timeout

pub mod heuristic;
pub mod model;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::axes::{AxisMask, ScoreVector, TypeCode};
use crate::richness::RichnessTier;
use crate::subject::Subject;

pub use heuristic::HeuristicSource;
pub use model::{AnalysisProvider, GatewayAnalysisProvider, ModelSource, DEFAULT_MODEL_TIMEOUT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Heuristic,
    Model,
}

/// Per-call information handed to sources.
#[derive(Debug, Clone, Default)]
pub struct EstimateContext {
    pub tier: Option<RichnessTier>,
    pub batch_id: Option<Uuid>,
}

impl EstimateContext {
    pub fn new(tier: RichnessTier, batch_id: Option<Uuid>) -> Self {
        Self {
            tier: Some(tier),
            batch_id,
        }
    }
}

/// One source's opinion about one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEstimate {
    pub source_id: String,
    pub kind: SourceKind,
    pub scores: ScoreVector,
    /// Axes the source actually produced a value for.
    pub matched: AxisMask,
    pub type_hint: Option<TypeCode>,
    pub rationale: String,
}

impl SourceEstimate {
    /// True when no axis was produced; such estimates carry no weight.
    pub fn is_degraded(&self) -> bool {
        self.matched.is_empty()
    }
}

/// Failure of a scoring source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Provider unreachable, rejected auth, quota exhausted, refused, ...
    #[error("source {source_id} unavailable ({code}): {message}")]
    Unavailable {
        source_id: String,
        code: &'static str,
        message: String,
    },

    /// No answer within the source's deadline.
    #[error("source {source_id} timed out after {after:?}")]
    Timeout { source_id: String, after: Duration },

    /// Broken invariant inside a source; escalates to the safety fallback.
    #[error("source fault: {0}")]
    Fault(String),
}

impl SourceError {
    /// Soft errors are absorbed by the dispatcher; faults are not.
    pub fn is_soft(&self) -> bool {
        !matches!(self, SourceError::Fault(_))
    }

    pub fn code(&self) -> &'static str {
        match self {
            SourceError::Unavailable { code, .. } => code,
            SourceError::Timeout { .. } => "timeout",
            SourceError::Fault(_) => "fault",
        }
    }
}

/// The common estimate interface.
#[async_trait]
pub trait ScoringSource: Send + Sync {
    fn id(&self) -> &str;

    fn kind(&self) -> SourceKind;

    async fn estimate(
        &self,
        subject: &Subject,
        ctx: &EstimateContext,
    ) -> Result<SourceEstimate, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_faults_are_hard() {
        let soft = SourceError::Timeout {
            source_id: "m".into(),
            after: Duration::from_secs(1),
        };
        assert!(soft.is_soft());
        assert_eq!(soft.code(), "timeout");
        assert!(!SourceError::Fault("bad".into()).is_soft());
    }
}
