//! Deterministic category-lookup source.

use async_trait::async_trait;

use super::{EstimateContext, ScoringSource, SourceError, SourceEstimate, SourceKind};
use crate::axes::AxisMask;
use crate::category::categorize;
use crate::subject::Subject;

pub const HEURISTIC_SOURCE_ID: &str = "heuristic";

/// Scores a subject with its category's canonical vector. Never fails and
/// never leaves the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicSource;

impl HeuristicSource {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous form of [`ScoringSource::estimate`].
    pub fn evaluate(&self, subject: &Subject) -> SourceEstimate {
        let profile = categorize(subject).profile();
        SourceEstimate {
            source_id: HEURISTIC_SOURCE_ID.to_string(),
            kind: SourceKind::Heuristic,
            scores: profile.scores,
            matched: AxisMask::ALL,
            type_hint: Some(profile.type_code()),
            rationale: format!("category {}: {}", profile.category, profile.rationale),
        }
    }
}

#[async_trait]
impl ScoringSource for HeuristicSource {
    fn id(&self) -> &str {
        HEURISTIC_SOURCE_ID
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Heuristic
    }

    async fn estimate(
        &self,
        subject: &Subject,
        _ctx: &EstimateContext,
    ) -> Result<SourceEstimate, SourceError> {
        Ok(self.evaluate(subject))
    }
}
