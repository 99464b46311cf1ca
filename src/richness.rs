//! Data richness: how much usable signal a subject carries.
//!
//! Additive point scoring over presence checks. Never fails.

use serde::{Deserialize, Serialize};

use crate::subject::Subject;

/// Biography length bands, longest first: `(min_chars, points)`.
pub const BIOGRAPHY_BANDS: [(usize, u8); 4] = [(1000, 40), (500, 30), (200, 20), (100, 10)];

pub const NATIONALITY_POINTS: u8 = 10;
pub const ERA_POINTS: u8 = 15;
pub const MOVEMENT_POINTS: u8 = 15;
pub const BIRTH_YEAR_POINTS: u8 = 10;
pub const MEDIUM_POINTS: u8 = 10;

/// Ordered sufficiency bucket. Ordering follows richness: `None < Limited < Moderate < Rich`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RichnessTier {
    None,
    Limited,
    Moderate,
    Rich,
}

impl RichnessTier {
    pub fn from_score(score: u8) -> Self {
        match score {
            70.. => RichnessTier::Rich,
            40..=69 => RichnessTier::Moderate,
            20..=39 => RichnessTier::Limited,
            _ => RichnessTier::None,
        }
    }

    /// Next tier down; `None` stays `None`.
    pub fn lower(self) -> Self {
        match self {
            RichnessTier::Rich => RichnessTier::Moderate,
            RichnessTier::Moderate => RichnessTier::Limited,
            RichnessTier::Limited | RichnessTier::None => RichnessTier::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RichnessTier::Rich => "rich",
            RichnessTier::Moderate => "moderate",
            RichnessTier::Limited => "limited",
            RichnessTier::None => "none",
        }
    }
}

impl std::fmt::Display for RichnessTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Richness score, tier, and the fields that contributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichnessReport {
    pub score: u8,
    pub tier: RichnessTier,
    pub factors: Vec<String>,
}

/// Score a subject's metadata.
pub fn evaluate(subject: &Subject) -> RichnessReport {
    let mut score: u32 = 0;
    let mut factors = Vec::new();

    let chars = subject.biography_chars();
    if let Some((min, points)) = BIOGRAPHY_BANDS.iter().find(|(min, _)| chars >= *min) {
        score += u32::from(*points);
        factors.push(format!("biography>={min}"));
    }

    let presence = [
        (subject.nationality_text().is_some(), NATIONALITY_POINTS, "nationality"),
        (subject.era_text().is_some(), ERA_POINTS, "era"),
        (subject.movement_text().is_some(), MOVEMENT_POINTS, "movement"),
        (subject.birth_year.is_some(), BIRTH_YEAR_POINTS, "birth_year"),
        (subject.medium_text().is_some(), MEDIUM_POINTS, "medium"),
    ];
    for (present, points, name) in presence {
        if present {
            score += u32::from(points);
            factors.push(name.to_string());
        }
    }

    let score = score.min(100) as u8;
    RichnessReport {
        score,
        tier: RichnessTier::from_score(score),
        factors,
    }
}
