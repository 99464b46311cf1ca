//! The four bipolar axes and the sixteen archetype codes derived from them.
//!
//! Every score lives in `[-100, 100]`. The sign picks a pole (negative scores
//! express the left letter, zero and positive scores the right letter) and the
//! magnitude expresses how strongly. Four signs give one of exactly sixteen
//! `TypeCode`s.
//!
//! ## Axis order
//!
//! | # | Label | Negative pole        | Positive pole              |
//! |---|-------|----------------------|----------------------------|
//! | 0 | L/S   | L (Lone)             | S (Shared)                 |
//! | 1 | A/R   | A (Abstract)         | R (Representational)       |
//! | 2 | E/M   | E (Emotional)        | M (Meaning)                |
//! | 3 | F/C   | F (Free)             | C (Constructed)            |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lower bound of every axis score.
pub const SCORE_MIN: f64 = -100.0;
/// Upper bound of every axis score.
pub const SCORE_MAX: f64 = 100.0;

/// Axes whose merged magnitude is below this are "ambiguous" and yield alternates.
pub const ALTERNATE_THRESHOLD: f64 = 30.0;
/// Maximum number of alternate codes attached to a result.
pub const MAX_ALTERNATES: usize = 2;

/// Clamp a raw number into the valid axis range. NaN collapses to zero.
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(SCORE_MIN, SCORE_MAX)
    }
}

// =============================================================================
// Axis
// =============================================================================

/// One pole of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pole {
    pub letter: char,
    pub name: &'static str,
    pub description: &'static str,
}

/// One of the four fixed bipolar dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    /// Individual-focused (L) vs socially-oriented (S) viewing.
    Social,
    /// Abstract (A) vs representational (R) work.
    Representation,
    /// Emotional (E) vs meaning-driven (M) reception.
    Reception,
    /// Free (F) vs constructed (C) interpretation.
    Structure,
}

impl Axis {
    /// All axes in type-code order.
    pub const ALL: [Axis; 4] = [
        Axis::Social,
        Axis::Representation,
        Axis::Reception,
        Axis::Structure,
    ];

    pub fn index(self) -> usize {
        match self {
            Axis::Social => 0,
            Axis::Representation => 1,
            Axis::Reception => 2,
            Axis::Structure => 3,
        }
    }

    /// Short label used in prompts and parsed from responses, e.g. `"L/S"`.
    pub fn label(self) -> &'static str {
        match self {
            Axis::Social => "L/S",
            Axis::Representation => "A/R",
            Axis::Reception => "E/M",
            Axis::Structure => "F/C",
        }
    }

    /// Key used in JSON payloads, e.g. `"L_S"`.
    pub fn key(self) -> &'static str {
        match self {
            Axis::Social => "L_S",
            Axis::Representation => "A_R",
            Axis::Reception => "E_M",
            Axis::Structure => "F_C",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::Social => "lone vs shared",
            Axis::Representation => "abstract vs representational",
            Axis::Reception => "emotional vs meaning",
            Axis::Structure => "free vs constructed",
        }
    }

    pub fn negative_pole(self) -> Pole {
        match self {
            Axis::Social => Pole {
                letter: 'L',
                name: "Lone",
                description: "independent, reclusive, solitary immersion, introspective",
            },
            Axis::Representation => Pole {
                letter: 'A',
                name: "Abstract",
                description: "non-figurative, conceptual, dissolved form, colour-led",
            },
            Axis::Reception => Pole {
                letter: 'E',
                name: "Emotional",
                description: "intuitive, passionate, sensory, personal experience",
            },
            Axis::Structure => Pole {
                letter: 'F',
                name: "Free",
                description: "experimental, rule-breaking, spontaneous, innovative",
            },
        }
    }

    pub fn positive_pole(self) -> Pole {
        match self {
            Axis::Social => Pole {
                letter: 'S',
                name: "Shared",
                description: "collaborative, group activity, social, outward-facing",
            },
            Axis::Representation => Pole {
                letter: 'R',
                name: "Representational",
                description: "realist, concrete depiction, figures, landscapes, still life",
            },
            Axis::Reception => Pole {
                letter: 'M',
                name: "Meaning",
                description: "intellectual, philosophical, concept-driven, social critique",
            },
            Axis::Structure => Pole {
                letter: 'C',
                name: "Constructed",
                description: "traditional, technique-focused, planned, meticulous",
            },
        }
    }

    /// Pole expressed by a score: zero counts as positive.
    pub fn pole_for(self, score: f64) -> Pole {
        if score < 0.0 {
            self.negative_pole()
        } else {
            self.positive_pole()
        }
    }

    /// Parse a `"L/S"`, `"L_S"` or `"LS"` style label.
    pub fn from_label(label: &str) -> Option<Axis> {
        let letters: String = label
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        Axis::ALL.into_iter().find(|axis| {
            let neg = axis.negative_pole().letter;
            let pos = axis.positive_pole().letter;
            letters.len() == 2 && letters.starts_with(neg) && letters.ends_with(pos)
        })
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Axis mask
// =============================================================================

/// Set of axes, used to record which axes a source actually covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct AxisMask(u8);

impl AxisMask {
    pub const NONE: AxisMask = AxisMask(0);
    pub const ALL: AxisMask = AxisMask(0b1111);

    pub fn from_axes(axes: impl IntoIterator<Item = Axis>) -> Self {
        let mut mask = AxisMask::NONE;
        for axis in axes {
            mask.insert(axis);
        }
        mask
    }

    pub fn insert(&mut self, axis: Axis) {
        self.0 |= 1 << axis.index();
    }

    pub fn contains(self, axis: Axis) -> bool {
        self.0 & (1 << axis.index()) != 0
    }

    pub fn intersect(self, other: AxisMask) -> AxisMask {
        AxisMask(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn axes(self) -> impl Iterator<Item = Axis> {
        Axis::ALL.into_iter().filter(move |a| self.contains(*a))
    }
}

// =============================================================================
// Score vector
// =============================================================================

/// Four axis scores, always fully populated and always within `[-100, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawScoreVector", into = "RawScoreVector")]
pub struct ScoreVector {
    values: [f64; 4],
}

/// Wire shape of a score vector; clamped on the way in.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct RawScoreVector {
    #[serde(rename = "L_S", default)]
    l_s: f64,
    #[serde(rename = "A_R", default)]
    a_r: f64,
    #[serde(rename = "E_M", default)]
    e_m: f64,
    #[serde(rename = "F_C", default)]
    f_c: f64,
}

impl From<RawScoreVector> for ScoreVector {
    fn from(raw: RawScoreVector) -> Self {
        ScoreVector::new(raw.l_s, raw.a_r, raw.e_m, raw.f_c)
    }
}

impl From<ScoreVector> for RawScoreVector {
    fn from(v: ScoreVector) -> Self {
        RawScoreVector {
            l_s: v.values[0],
            a_r: v.values[1],
            e_m: v.values[2],
            f_c: v.values[3],
        }
    }
}

impl ScoreVector {
    /// The all-zero, maximally ambiguous vector.
    pub const ZERO: ScoreVector = ScoreVector { values: [0.0; 4] };

    /// Build a vector in axis order; every value is clamped.
    pub fn new(social: f64, representation: f64, reception: f64, structure: f64) -> Self {
        Self::from_array([social, representation, reception, structure])
    }

    pub fn from_array(values: [f64; 4]) -> Self {
        Self {
            values: values.map(clamp_score),
        }
    }

    pub fn get(&self, axis: Axis) -> f64 {
        self.values[axis.index()]
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        self.values[axis.index()] = clamp_score(value);
    }

    pub fn as_array(&self) -> [f64; 4] {
        self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (Axis, f64)> + '_ {
        Axis::ALL.into_iter().map(move |a| (a, self.get(a)))
    }

    /// Derive the type code from the signs of the scores.
    pub fn type_code(&self) -> TypeCode {
        let mut bits = 0u8;
        for axis in Axis::ALL {
            if self.get(axis) >= 0.0 {
                bits |= 1 << axis.index();
            }
        }
        TypeCode(bits)
    }

    /// Number of axes whose magnitude strictly exceeds `threshold`.
    pub fn decisive_axes(&self, threshold: f64) -> usize {
        self.values.iter().filter(|v| v.abs() > threshold).count()
    }

    /// Codes reachable by flipping one ambiguous axis, most ambiguous first.
    pub fn alternates(&self) -> Vec<TypeCode> {
        let primary = self.type_code();
        let mut ambiguous: Vec<(Axis, f64)> = self
            .iter()
            .filter(|(_, v)| v.abs() < ALTERNATE_THRESHOLD)
            .collect();
        ambiguous.sort_by(|a, b| {
            a.1.abs()
                .partial_cmp(&b.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        let mut out = Vec::with_capacity(MAX_ALTERNATES);
        for (axis, _) in ambiguous {
            let alt = primary.flip(axis);
            if alt != primary && !out.contains(&alt) {
                out.push(alt);
            }
            if out.len() == MAX_ALTERNATES {
                break;
            }
        }
        out
    }
}

// =============================================================================
// Type code
// =============================================================================

/// Error for strings that are not one of the sixteen codes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type code {0:?}: expected one of [LS][AR][EM][FC]")]
pub struct TypeCodeError(pub String);

/// One of the sixteen archetype codes.
///
/// Bit `i` is set when axis `i` expresses its positive pole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeCode(u8);

impl TypeCode {
    pub const LAEF: TypeCode = TypeCode(0b0000);
    pub const SAEF: TypeCode = TypeCode(0b0001);
    pub const LREF: TypeCode = TypeCode(0b0010);
    pub const SREF: TypeCode = TypeCode(0b0011);
    pub const LAMF: TypeCode = TypeCode(0b0100);
    pub const SAMF: TypeCode = TypeCode(0b0101);
    pub const LRMF: TypeCode = TypeCode(0b0110);
    pub const SRMF: TypeCode = TypeCode(0b0111);
    pub const LAEC: TypeCode = TypeCode(0b1000);
    pub const SAEC: TypeCode = TypeCode(0b1001);
    pub const LREC: TypeCode = TypeCode(0b1010);
    pub const SREC: TypeCode = TypeCode(0b1011);
    pub const LAMC: TypeCode = TypeCode(0b1100);
    pub const SAMC: TypeCode = TypeCode(0b1101);
    pub const LRMC: TypeCode = TypeCode(0b1110);
    pub const SRMC: TypeCode = TypeCode(0b1111);

    /// All sixteen codes in conventional order (L before S, A before R, ...).
    pub const ALL: [TypeCode; 16] = [
        TypeCode::LAEF,
        TypeCode::LAEC,
        TypeCode::LAMF,
        TypeCode::LAMC,
        TypeCode::LREF,
        TypeCode::LREC,
        TypeCode::LRMF,
        TypeCode::LRMC,
        TypeCode::SAEF,
        TypeCode::SAEC,
        TypeCode::SAMF,
        TypeCode::SAMC,
        TypeCode::SREF,
        TypeCode::SREC,
        TypeCode::SRMF,
        TypeCode::SRMC,
    ];

    pub fn is_positive(self, axis: Axis) -> bool {
        self.0 & (1 << axis.index()) != 0
    }

    pub fn pole(self, axis: Axis) -> Pole {
        if self.is_positive(axis) {
            axis.positive_pole()
        } else {
            axis.negative_pole()
        }
    }

    /// The code with one axis switched to the opposite pole.
    pub fn flip(self, axis: Axis) -> TypeCode {
        TypeCode(self.0 ^ (1 << axis.index()))
    }

    /// Dense index in `0..16`, usable for counter arrays.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn letters(self) -> [char; 4] {
        Axis::ALL.map(|a| self.pole(a).letter)
    }

    pub fn as_string(self) -> String {
        self.letters().iter().collect()
    }

    pub fn profile(self) -> &'static TypeProfile {
        &TYPE_PROFILES[self.index()]
    }

    /// Whether `scores` is sign-consistent with this code.
    pub fn matches(self, scores: &ScoreVector) -> bool {
        scores.type_code() == self
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.letters() {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl FromStr for TypeCode {
    type Err = TypeCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let chars: Vec<char> = trimmed.chars().map(|c| c.to_ascii_uppercase()).collect();
        if chars.len() != 4 {
            return Err(TypeCodeError(s.to_string()));
        }
        let mut bits = 0u8;
        for (axis, c) in Axis::ALL.into_iter().zip(chars) {
            if c == axis.positive_pole().letter {
                bits |= 1 << axis.index();
            } else if c != axis.negative_pole().letter {
                return Err(TypeCodeError(s.to_string()));
            }
        }
        Ok(TypeCode(bits))
    }
}

impl Serialize for TypeCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_string())
    }
}

impl<'de> Deserialize<'de> for TypeCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Type profiles
// =============================================================================

/// Static description of one archetype.
#[derive(Debug, Clone, Copy)]
pub struct TypeProfile {
    pub code: TypeCode,
    pub title: &'static str,
    pub animal: &'static str,
    /// Canonical scores; signs reproduce `code`.
    pub canonical: [f64; 4],
}

impl TypeProfile {
    pub fn canonical_scores(&self) -> ScoreVector {
        ScoreVector::from_array(self.canonical)
    }
}

/// Indexed by `TypeCode::index()`.
#[rustfmt::skip]
static TYPE_PROFILES: [TypeProfile; 16] = [
    TypeProfile { code: TypeCode::LAEF, title: "Dreamy Wanderer", animal: "fox", canonical: [-70.0, -70.0, -80.0, -80.0] },
    TypeProfile { code: TypeCode::SAEF, title: "Emotion Sharer", animal: "butterfly", canonical: [60.0, -60.0, -90.0, -60.0] },
    TypeProfile { code: TypeCode::LREF, title: "Solitary Observer", animal: "chameleon", canonical: [-60.0, 60.0, -70.0, -40.0] },
    TypeProfile { code: TypeCode::SREF, title: "Passionate Viewer", animal: "dog", canonical: [70.0, 70.0, -60.0, -30.0] },
    TypeProfile { code: TypeCode::LAMF, title: "Intuitive Explorer", animal: "owl", canonical: [-60.0, -80.0, 20.0, -70.0] },
    TypeProfile { code: TypeCode::SAMF, title: "Inspiration Evangelist", animal: "parrot", canonical: [80.0, -50.0, 30.0, -40.0] },
    TypeProfile { code: TypeCode::LRMF, title: "Digital Explorer", animal: "octopus", canonical: [-40.0, 40.0, 30.0, -50.0] },
    TypeProfile { code: TypeCode::SRMF, title: "Knowledge Mentor", animal: "elephant", canonical: [60.0, 60.0, 60.0, -20.0] },
    TypeProfile { code: TypeCode::LAEC, title: "Emotional Curator", animal: "cat", canonical: [-50.0, -50.0, -70.0, 30.0] },
    TypeProfile { code: TypeCode::SAEC, title: "Art Networker", animal: "penguin", canonical: [70.0, -40.0, -50.0, 20.0] },
    TypeProfile { code: TypeCode::LREC, title: "Delicate Connoisseur", animal: "hedgehog", canonical: [-30.0, 50.0, -60.0, 40.0] },
    TypeProfile { code: TypeCode::SREC, title: "Warm Guide", animal: "duck", canonical: [50.0, 80.0, -50.0, 30.0] },
    TypeProfile { code: TypeCode::LAMC, title: "Philosophical Collector", animal: "turtle", canonical: [-40.0, -60.0, 40.0, 60.0] },
    TypeProfile { code: TypeCode::SAMC, title: "Culture Planner", animal: "deer", canonical: [70.0, -30.0, 50.0, 70.0] },
    TypeProfile { code: TypeCode::LRMC, title: "Scholarly Researcher", animal: "beaver", canonical: [-20.0, 80.0, 70.0, 80.0] },
    TypeProfile { code: TypeCode::SRMC, title: "Systematic Educator", animal: "eagle", canonical: [40.0, 90.0, 80.0, 90.0] },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_sixteen_distinct_codes() {
        let mut seen = std::collections::HashSet::new();
        for code in TypeCode::ALL {
            assert!(seen.insert(code.as_string()));
        }
        assert_eq!(seen.len(), 16);
    }

    #[test]
    fn parse_round_trips_every_code() {
        for code in TypeCode::ALL {
            let parsed: TypeCode = code.to_string().parse().unwrap();
            assert_eq!(parsed, code);
        }
        assert_eq!("srmc".parse::<TypeCode>().unwrap(), TypeCode::SRMC);
    }

    #[test]
    fn parse_rejects_invalid_codes() {
        for bad in ["", "LAE", "LAEFX", "XAEF", "LLEF", "SRMZ", "1234"] {
            assert!(bad.parse::<TypeCode>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn profiles_are_indexed_and_sign_consistent() {
        for code in TypeCode::ALL {
            let profile = code.profile();
            assert_eq!(profile.code, code);
            assert_eq!(profile.canonical_scores().type_code(), code, "{code}");
        }
    }

    #[test]
    fn zero_scores_express_positive_poles() {
        assert_eq!(ScoreVector::ZERO.type_code(), TypeCode::SRMC);
        let v = ScoreVector::new(-1.0, 0.0, -0.5, 0.0);
        assert_eq!(v.type_code().to_string(), "LREC");
    }

    #[test]
    fn scores_are_clamped() {
        let v = ScoreVector::new(250.0, -300.0, f64::NAN, 99.0);
        assert_eq!(v.as_array(), [100.0, -100.0, 0.0, 99.0]);

        let parsed: ScoreVector =
            serde_json::from_str(r#"{"L_S": 140, "A_R": -20}"#).unwrap();
        assert_eq!(parsed.as_array(), [100.0, -20.0, 0.0, 0.0]);
    }

    #[test]
    fn alternates_flip_most_ambiguous_axes_first() {
        let v = ScoreVector::new(-10.0, 80.0, 5.0, 25.0);
        let primary = v.type_code();
        assert_eq!(primary, TypeCode::LRMC);
        let alts = v.alternates();
        assert_eq!(alts, vec![primary.flip(Axis::Reception), primary.flip(Axis::Social)]);
    }

    #[test]
    fn decisive_vector_has_no_alternates() {
        let v = ScoreVector::new(-70.0, -70.0, -80.0, -80.0);
        assert!(v.alternates().is_empty());
    }

    #[test]
    fn axis_labels_parse_in_several_spellings() {
        assert_eq!(Axis::from_label("L/S"), Some(Axis::Social));
        assert_eq!(Axis::from_label("a_r"), Some(Axis::Representation));
        assert_eq!(Axis::from_label("EM"), Some(Axis::Reception));
        assert_eq!(Axis::from_label("C/F"), None);
    }

    #[test]
    fn axis_mask_tracks_membership() {
        let mut mask = AxisMask::from_axes([Axis::Social, Axis::Structure]);
        assert_eq!(mask.len(), 2);
        assert!(mask.contains(Axis::Structure));
        mask.insert(Axis::Reception);
        assert_eq!(
            mask.axes().collect::<Vec<_>>(),
            vec![Axis::Social, Axis::Reception, Axis::Structure]
        );
        assert!(mask.intersect(AxisMask::NONE).is_empty());
    }
}
