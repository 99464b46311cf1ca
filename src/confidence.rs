//! Confidence scoring for a finished classification.

use crate::axes::ScoreVector;
use crate::parser::Verdict;

pub const BASE: f64 = 50.0;
/// Richness 100 adds this many points.
pub const RICHNESS_MAX_BONUS: f64 = 20.0;
pub const PER_EXTRA_SOURCE: f64 = 5.0;
pub const EXTRA_SOURCE_CAP: f64 = 20.0;
pub const PER_DECISIVE_AXIS: f64 = 2.5;
pub const DECISIVE_AXIS_CAP: f64 = 10.0;
/// An axis counts as decisive above this magnitude.
pub const DECISIVE_THRESHOLD: f64 = 50.0;
pub const VALIDATION_NUDGE: f64 = 10.0;
/// Highest reachable confidence.
pub const CEILING: u8 = 95;

#[derive(Debug, Clone)]
pub struct ConfidenceInputs {
    pub richness: u8,
    /// Estimates that contributed to the merge (heuristic included).
    pub sources_merged: usize,
    pub scores: ScoreVector,
    pub validation: Option<Verdict>,
    /// Points removed for a diversity substitution; 0 when unadjusted.
    pub diversity_penalty: u8,
}

/// Integer confidence in `[0, 95]`.
pub fn score(inputs: &ConfidenceInputs) -> u8 {
    let richness = f64::from(inputs.richness.min(100)) / 100.0 * RICHNESS_MAX_BONUS;
    let extra = inputs.sources_merged.saturating_sub(1) as f64 * PER_EXTRA_SOURCE;
    let decisive = inputs.scores.decisive_axes(DECISIVE_THRESHOLD) as f64 * PER_DECISIVE_AXIS;
    let nudge = match inputs.validation {
        Some(Verdict::Appropriate) => VALIDATION_NUDGE,
        Some(Verdict::Inappropriate) => -VALIDATION_NUDGE,
        Some(Verdict::Unclear) | None => 0.0,
    };

    let total = BASE
        + richness
        + extra.min(EXTRA_SOURCE_CAP)
        + decisive.min(DECISIVE_AXIS_CAP)
        + nudge
        - f64::from(inputs.diversity_penalty);

    total.round().clamp(0.0, f64::from(CEILING)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(richness: u8, sources: usize, scores: ScoreVector) -> ConfidenceInputs {
        ConfidenceInputs {
            richness,
            sources_merged: sources,
            scores,
            validation: None,
            diversity_penalty: 0,
        }
    }

    #[test]
    fn bare_heuristic_is_fifty() {
        assert_eq!(score(&inputs(0, 1, ScoreVector::new(0.0, 20.0, -20.0, 0.0))), 50);
    }

    #[test]
    fn components_add_up() {
        // 50 + 15 + 10 + 7.5 = 82.5
        let s = ScoreVector::new(60.0, 80.0, -70.0, 20.0);
        assert_eq!(score(&inputs(75, 3, s)), 83);
    }

    #[test]
    fn capped_at_ninety_five() {
        let s = ScoreVector::new(100.0, 100.0, 100.0, 100.0);
        assert_eq!(score(&inputs(100, 10, s)), 95);
    }

    #[test]
    fn validation_nudges_both_ways() {
        let mut i = inputs(40, 1, ScoreVector::ZERO);
        i.validation = Some(Verdict::Appropriate);
        assert_eq!(score(&i), 68);
        i.validation = Some(Verdict::Inappropriate);
        assert_eq!(score(&i), 48);
        i.validation = Some(Verdict::Unclear);
        assert_eq!(score(&i), 58);
    }

    #[test]
    fn diversity_penalty_applies_before_clamp() {
        let mut i = inputs(100, 10, ScoreVector::new(100.0, 100.0, 100.0, 100.0));
        i.diversity_penalty = 10;
        // 50 + 20 + 20 + 10 - 10 = 90
        assert_eq!(score(&i), 90);
    }

    #[test]
    fn never_negative() {
        let mut i = inputs(0, 0, ScoreVector::ZERO);
        i.validation = Some(Verdict::Inappropriate);
        i.diversity_penalty = 255;
        assert_eq!(score(&i), 0);
    }
}
