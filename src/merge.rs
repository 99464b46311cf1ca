//! Weighted per-axis merging of source estimates.
//!
//! Pure function. Weights are renormalized per axis over the estimates that
//! actually produced that axis, so a failed or partial source's share is
//! redistributed proportionally instead of dragging the axis toward zero.

use serde::Serialize;

use crate::axes::{Axis, ScoreVector, TypeCode};
use crate::sources::SourceEstimate;

/// An estimate paired with its dispatcher-assigned weight.
#[derive(Debug, Clone)]
pub struct WeightedEstimate {
    pub estimate: SourceEstimate,
    pub weight: f64,
}

impl WeightedEstimate {
    pub fn new(estimate: SourceEstimate, weight: f64) -> Self {
        Self { estimate, weight }
    }

    fn contributes(&self) -> bool {
        self.weight > 0.0 && self.weight.is_finite() && !self.estimate.is_degraded()
    }
}

/// Merged scores plus bookkeeping about who contributed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeOutcome {
    pub scores: ScoreVector,
    pub type_code: TypeCode,
    /// Ids of estimates that carried weight on at least one axis.
    pub contributors: Vec<String>,
}

impl MergeOutcome {
    pub fn sources_used(&self) -> usize {
        self.contributors.len()
    }
}

/// Merge weighted estimates into one vector.
pub fn merge(inputs: &[WeightedEstimate]) -> MergeOutcome {
    let live: Vec<&WeightedEstimate> = inputs.iter().filter(|w| w.contributes()).collect();

    let mut scores = ScoreVector::ZERO;

    for axis in Axis::ALL {
        let total: f64 = live
            .iter()
            .filter(|w| w.estimate.matched.contains(axis))
            .map(|w| w.weight)
            .sum();
        if total <= 0.0 {
            continue;
        }
        let mut value = 0.0;
        for w in live.iter().filter(|w| w.estimate.matched.contains(axis)) {
            value += w.weight / total * w.estimate.scores.get(axis);
        }
        scores.set(axis, value);
    }

    let contributors = live.iter().map(|w| w.estimate.source_id.clone()).collect();

    MergeOutcome {
        type_code: scores.type_code(),
        scores,
        contributors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axes::AxisMask;
    use crate::sources::SourceKind;

    fn est(id: &str, scores: [f64; 4], matched: AxisMask) -> SourceEstimate {
        SourceEstimate {
            source_id: id.to_string(),
            kind: SourceKind::Model,
            scores: ScoreVector::from_array(scores),
            matched,
            type_hint: None,
            rationale: String::new(),
        }
    }

    fn approx(a: [f64; 4], b: [f64; 4]) {
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-9, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn weighted_average_of_three_sources() {
        let out = merge(&[
            WeightedEstimate::new(est("h", [50.0, 90.0, -60.0, 40.0], AxisMask::ALL), 0.3),
            WeightedEstimate::new(est("m1", [-20.0, 80.0, -40.0, 20.0], AxisMask::ALL), 0.35),
            WeightedEstimate::new(est("m2", [10.0, 60.0, -80.0, 60.0], AxisMask::ALL), 0.35),
        ]);
        approx(
            out.scores.as_array(),
            [
                0.3 * 50.0 + 0.35 * -20.0 + 0.35 * 10.0,
                0.3 * 90.0 + 0.35 * 80.0 + 0.35 * 60.0,
                0.3 * -60.0 + 0.35 * -40.0 + 0.35 * -80.0,
                0.3 * 40.0 + 0.35 * 20.0 + 0.35 * 60.0,
            ],
        );
        assert_eq!(out.sources_used(), 3);
    }

    #[test]
    fn degraded_estimate_weight_is_redistributed() {
        let out = merge(&[
            WeightedEstimate::new(est("h", [40.0, 40.0, 40.0, 40.0], AxisMask::ALL), 0.3),
            WeightedEstimate::new(est("bad", [0.0; 4], AxisMask::NONE), 0.35),
            WeightedEstimate::new(est("m2", [-60.0, -60.0, -60.0, -60.0], AxisMask::ALL), 0.35),
        ]);
        let expected = (0.3 * 40.0 + 0.35 * -60.0) / 0.65;
        approx(out.scores.as_array(), [expected; 4]);
        assert_eq!(out.contributors, vec!["h".to_string(), "m2".to_string()]);
    }

    #[test]
    fn partial_estimates_only_touch_their_axes() {
        let refine = est("m", [-80.0, 0.0, 0.0, 0.0], AxisMask::from_axes([Axis::Social]));
        let out = merge(&[
            WeightedEstimate::new(est("h", [10.0, 70.0, -20.0, 30.0], AxisMask::ALL), 0.6),
            WeightedEstimate::new(refine, 0.4),
        ]);
        approx(out.scores.as_array(), [0.6 * 10.0 + 0.4 * -80.0, 70.0, -20.0, 30.0]);
        assert_eq!(out.type_code.to_string(), "LREC");
    }

    #[test]
    fn no_inputs_yield_zero_vector() {
        let out = merge(&[]);
        assert_eq!(out.scores, ScoreVector::ZERO);
        assert_eq!(out.sources_used(), 0);
    }

    #[test]
    fn merged_scores_stay_in_range() {
        let out = merge(&[
            WeightedEstimate::new(est("a", [100.0, -100.0, 100.0, -100.0], AxisMask::ALL), 0.9),
            WeightedEstimate::new(est("b", [100.0, -100.0, 100.0, -100.0], AxisMask::ALL), 0.9),
        ]);
        approx(out.scores.as_array(), [100.0, -100.0, 100.0, -100.0]);
    }
}
