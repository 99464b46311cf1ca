//! Safety fallback: the result returned when the pipeline cannot finish.
//!
//! The code is picked from a short safe list by hashing the subject name, so
//! repeated failures for the same subject agree with each other. Distribution
//! state is neither read nor written.

use crate::axes::{Axis, ScoreVector, TypeCode};
use crate::classifier::ClassificationResult;
use crate::dispatch::Strategy;
use crate::subject::Subject;

pub const SAFE_TYPES: [TypeCode; 4] = [
    TypeCode::LREC,
    TypeCode::LAEC,
    TypeCode::SAEC,
    TypeCode::SREF,
];

pub const FALLBACK_CONFIDENCE: u8 = 30;

/// Magnitude of every axis in the fallback vector.
const NEUTRAL_MAGNITUDE: f64 = 10.0;

pub fn safe_type_for(name: &str) -> TypeCode {
    let hash = blake3::hash(name.as_bytes());
    SAFE_TYPES[hash.as_bytes()[0] as usize % SAFE_TYPES.len()]
}

/// Low-magnitude vector whose signs reproduce `code`.
pub fn neutral_scores(code: TypeCode) -> ScoreVector {
    let mut scores = ScoreVector::ZERO;
    for axis in Axis::ALL {
        let sign = if code.is_positive(axis) { 1.0 } else { -1.0 };
        scores.set(axis, sign * NEUTRAL_MAGNITUDE);
    }
    scores
}

pub fn fallback_result(subject: &Subject, reason: &str) -> ClassificationResult {
    let type_code = safe_type_for(&subject.name);
    let scores = neutral_scores(type_code);
    let profile = type_code.profile();
    ClassificationResult {
        subject: subject.name.clone(),
        type_code,
        title: profile.title.to_string(),
        animal: profile.animal.to_string(),
        alternates: scores.alternates(),
        scores,
        confidence: FALLBACK_CONFIDENCE,
        rationale: format!("classification degraded to fallback: {reason}"),
        strategy: Strategy::Fallback,
        adjusted: false,
        richness_score: None,
        tier: None,
        category: None,
        sources: Vec::new(),
    }
}
