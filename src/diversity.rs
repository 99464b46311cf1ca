//! Batch-scoped distribution tracking and skew correction.
//!
//! A proposed code is replaced only when all of these hold: it is one of the
//! configured default-prone codes, the batch already has `min_samples`
//! assignments, and the code's share of them exceeds `ceiling`. The
//! replacement is the least-used alternate of the subject's category, paired
//! with that alternate's canonical vector.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::axes::{ScoreVector, TypeCode};
use crate::category::Category;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversityPolicy {
    /// Maximum share a default-prone code may hold before it is replaced.
    pub ceiling: f64,
    /// Assignments required before the ceiling is enforced.
    pub min_samples: usize,
    /// Codes that naive scoring collapses onto.
    pub default_prone: Vec<TypeCode>,
    /// Confidence points removed from a replaced result.
    pub penalty: u8,
}

impl Default for DiversityPolicy {
    fn default() -> Self {
        Self {
            ceiling: 0.15,
            min_samples: 10,
            default_prone: vec![TypeCode::SRMC],
            penalty: 10,
        }
    }
}

/// Per-code assignment counters for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionState {
    counts: [usize; 16],
    total: usize,
}

impl DistributionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn count(&self, code: TypeCode) -> usize {
        self.counts[code.index()]
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Share of all assignments so far; 0 when nothing has been assigned.
    pub fn share(&self, code: TypeCode) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.count(code) as f64 / self.total as f64
        }
    }

    pub fn record(&mut self, code: TypeCode) {
        self.counts[code.index()] += 1;
        self.total += 1;
    }

    /// Non-zero counts keyed by code string.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        TypeCode::ALL
            .iter()
            .filter(|c| self.count(**c) > 0)
            .map(|c| (c.to_string(), self.count(*c)))
            .collect()
    }

    /// Least-used candidate; ties go to the earliest.
    fn least_used(&self, candidates: &[TypeCode]) -> Option<TypeCode> {
        candidates
            .iter()
            .copied()
            .enumerate()
            .min_by_key(|(i, c)| (self.count(*c), *i))
            .map(|(_, c)| c)
    }

    /// Decide on a proposal and record the final code, in one step.
    ///
    /// Callers sharing a state across tasks must hold its lock across this call.
    pub fn correct_and_record(
        &mut self,
        policy: &DiversityPolicy,
        proposed: ScoreVector,
        category: Category,
    ) -> Correction {
        let correction = evaluate(policy, self, proposed, category);
        self.record(correction.type_code);
        correction
    }
}

/// Outcome of a diversity check.
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    pub type_code: TypeCode,
    pub scores: ScoreVector,
    pub adjusted: bool,
    /// The code that was replaced, when `adjusted`.
    pub replaced: Option<TypeCode>,
}

/// Pure decision; does not record.
pub fn evaluate(
    policy: &DiversityPolicy,
    state: &DistributionState,
    proposed: ScoreVector,
    category: Category,
) -> Correction {
    let code = proposed.type_code();
    let pass = Correction {
        type_code: code,
        scores: proposed,
        adjusted: false,
        replaced: None,
    };

    if !policy.default_prone.contains(&code)
        || state.total() < policy.min_samples
        || state.share(code) <= policy.ceiling
    {
        return pass;
    }

    let candidates: Vec<TypeCode> = category
        .profile()
        .alternates
        .iter()
        .copied()
        .filter(|c| !policy.default_prone.contains(c))
        .collect();

    match state.least_used(&candidates) {
        Some(alt) => Correction {
            type_code: alt,
            scores: alt.profile().canonical_scores(),
            adjusted: true,
            replaced: Some(code),
        },
        None => pass,
    }
}
