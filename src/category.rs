//! Heuristic artist categories and their canonical score table.
//!
//! Categorization priority: movement keyword, era keyword, birth-year range,
//! attribution name, then `Unknown`. Every category maps to exactly one row in
//! [`CATEGORY_TABLE`].

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::axes::{ScoreVector, TypeCode};
use crate::subject::Subject;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Ancient,
    Medieval,
    Renaissance,
    Baroque,
    Rococo,
    Neoclassical,
    Romantic,
    Realist,
    Impressionist,
    PostImpressionist,
    Expressionist,
    Cubist,
    Surrealist,
    Abstract,
    PopArt,
    Modern,
    Contemporary,
    NineteenthCentury,
    Attribution,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 20] = [
        Category::Ancient,
        Category::Medieval,
        Category::Renaissance,
        Category::Baroque,
        Category::Rococo,
        Category::Neoclassical,
        Category::Romantic,
        Category::Realist,
        Category::Impressionist,
        Category::PostImpressionist,
        Category::Expressionist,
        Category::Cubist,
        Category::Surrealist,
        Category::Abstract,
        Category::PopArt,
        Category::Modern,
        Category::Contemporary,
        Category::NineteenthCentury,
        Category::Attribution,
        Category::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Ancient => "ancient",
            Category::Medieval => "medieval",
            Category::Renaissance => "renaissance",
            Category::Baroque => "baroque",
            Category::Rococo => "rococo",
            Category::Neoclassical => "neoclassical",
            Category::Romantic => "romantic",
            Category::Realist => "realist",
            Category::Impressionist => "impressionist",
            Category::PostImpressionist => "post_impressionist",
            Category::Expressionist => "expressionist",
            Category::Cubist => "cubist",
            Category::Surrealist => "surrealist",
            Category::Abstract => "abstract",
            Category::PopArt => "pop_art",
            Category::Modern => "modern",
            Category::Contemporary => "contemporary",
            Category::NineteenthCentury => "nineteenth_century",
            Category::Attribution => "attribution",
            Category::Unknown => "unknown",
        }
    }

    /// The table row for this category.
    pub fn profile(self) -> &'static CategoryProfile {
        // Every variant is inserted when the table is built.
        &CATEGORY_TABLE[&self]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the heuristic table.
#[derive(Debug, Clone)]
pub struct CategoryProfile {
    pub category: Category,
    pub scores: ScoreVector,
    pub rationale: &'static str,
    /// Ordered substitutes used by the diversity corrector.
    pub alternates: Vec<TypeCode>,
}

impl CategoryProfile {
    pub fn type_code(&self) -> TypeCode {
        self.scores.type_code()
    }
}

type Row = (Category, [f64; 4], &'static str, &'static [TypeCode]);

#[rustfmt::skip]
const ROWS: &[Row] = &[
    (Category::Ancient, [40.0, 85.0, 40.0, 70.0],
     "ancient workshop tradition: communal, figurative, symbolic, canon-bound",
     &[TypeCode::SREC, TypeCode::SRMF, TypeCode::SAMC]),
    (Category::Medieval, [10.0, 90.0, 70.0, 85.0],
     "medieval devotional art: figurative, doctrinal, strictly constructed",
     &[TypeCode::LRMC, TypeCode::SAMC, TypeCode::SRMF]),
    (Category::Renaissance, [-10.0, 85.0, 50.0, 75.0],
     "renaissance humanism: observational, meaning-driven, systematic",
     &[TypeCode::LRMF, TypeCode::SRMF, TypeCode::LAMC]),
    (Category::Baroque, [50.0, 90.0, -60.0, 40.0],
     "baroque drama: theatrical, figurative, emotionally charged",
     &[TypeCode::SREF, TypeCode::SAEF]),
    (Category::Rococo, [60.0, 70.0, -70.0, -20.0],
     "rococo salon art: sociable, decorative, playful",
     &[TypeCode::SAEF, TypeCode::SAEC, TypeCode::SREC]),
    (Category::Neoclassical, [20.0, 95.0, 60.0, 90.0],
     "neoclassical order: idealised figures, civic meaning, rigorous construction",
     &[TypeCode::SRMF, TypeCode::LRMC]),
    (Category::Romantic, [-30.0, 40.0, -80.0, -40.0],
     "romantic sensibility: solitary, emotive, unconstrained",
     &[TypeCode::LAEF, TypeCode::LREC, TypeCode::SAEF]),
    (Category::Realist, [-10.0, 90.0, -30.0, 50.0],
     "realist observation: concrete depiction with measured feeling",
     &[TypeCode::LREF, TypeCode::SREF]),
    (Category::Impressionist, [-20.0, 20.0, -70.0, -60.0],
     "impressionist perception: light, momentary sensation, loose handling",
     &[TypeCode::LAEF, TypeCode::SAEF, TypeCode::LAEC]),
    (Category::PostImpressionist, [-40.0, -20.0, -50.0, -40.0],
     "post-impressionist search: personal vision pushing past appearances",
     &[TypeCode::LAMF, TypeCode::LRMF, TypeCode::LAMC]),
    (Category::Expressionist, [-30.0, -40.0, -90.0, -70.0],
     "expressionist intensity: distorted form in service of raw emotion",
     &[TypeCode::LAEC, TypeCode::SAEF]),
    (Category::Cubist, [-50.0, -80.0, 30.0, -30.0],
     "cubist analysis: fractured form, conceptual reconstruction",
     &[TypeCode::LAMC, TypeCode::LRMF]),
    (Category::Surrealist, [-60.0, -60.0, -40.0, -80.0],
     "surrealist dreamwork: inner imagery, automatism, rule-breaking",
     &[TypeCode::LAMF, TypeCode::LAMC]),
    (Category::Abstract, [-70.0, -90.0, -30.0, -90.0],
     "abstraction: non-figurative, gestural, solitary experiment",
     &[TypeCode::LAMF, TypeCode::LAEC]),
    (Category::PopArt, [70.0, 30.0, -50.0, -40.0],
     "pop art: mass culture, public-facing, irreverent",
     &[TypeCode::SAEF, TypeCode::SAMF, TypeCode::SAEC]),
    (Category::Modern, [-40.0, -50.0, -10.0, -50.0],
     "modernist break: experimental, moving away from depiction",
     &[TypeCode::LAMF, TypeCode::LRMF, TypeCode::LAEC]),
    (Category::Contemporary, [0.0, -40.0, -20.0, -30.0],
     "contemporary practice: mixed approaches, weak prior",
     &[TypeCode::LAEC, TypeCode::SAEC, TypeCode::LAMF, TypeCode::SAMF]),
    (Category::NineteenthCentury, [0.0, 60.0, -30.0, 20.0],
     "nineteenth-century academy and salon: figurative, moderately formal",
     &[TypeCode::LREC, TypeCode::SREF, TypeCode::LREF]),
    (Category::Attribution, [60.0, 70.0, -40.0, 30.0],
     "attributed work: workshop or follower practice within a shared tradition",
     &[TypeCode::SREF, TypeCode::SAEC]),
    (Category::Unknown, [0.0, 20.0, -20.0, 0.0],
     "no categorising metadata: neutral prior",
     &[TypeCode::LREC, TypeCode::LAEC, TypeCode::SAEC, TypeCode::SREF]),
];

/// Category rows keyed by category, built on first use.
pub static CATEGORY_TABLE: Lazy<HashMap<Category, CategoryProfile>> = Lazy::new(|| {
    ROWS.iter()
        .map(|(category, scores, rationale, alternates)| {
            (
                *category,
                CategoryProfile {
                    category: *category,
                    scores: ScoreVector::from_array(*scores),
                    rationale,
                    alternates: alternates.to_vec(),
                },
            )
        })
        .collect()
});

/// Keyword needles, most specific first. Matching is case-insensitive substring.
const KEYWORDS: &[(&str, Category)] = &[
    ("abstract expressionis", Category::Abstract),
    ("post-impressionis", Category::PostImpressionist),
    ("post impressionis", Category::PostImpressionist),
    ("postimpressionis", Category::PostImpressionist),
    ("neo-impressionis", Category::PostImpressionist),
    ("pointillis", Category::PostImpressionist),
    ("symbolis", Category::PostImpressionist),
    ("neoclassic", Category::Neoclassical),
    ("neo-classic", Category::Neoclassical),
    ("surreal", Category::Surrealist),
    ("dada", Category::Surrealist),
    ("impressionis", Category::Impressionist),
    ("expressionis", Category::Expressionist),
    ("fauv", Category::Expressionist),
    ("cubis", Category::Cubist),
    ("futuris", Category::Cubist),
    ("pop art", Category::PopArt),
    ("pop-art", Category::PopArt),
    ("abstract", Category::Abstract),
    ("minimalis", Category::Abstract),
    ("color field", Category::Abstract),
    ("colour field", Category::Abstract),
    ("rococo", Category::Rococo),
    ("baroque", Category::Baroque),
    ("golden age", Category::Baroque),
    ("caravagg", Category::Baroque),
    ("renaissance", Category::Renaissance),
    ("manneris", Category::Renaissance),
    ("early modern", Category::Baroque),
    ("early-modern", Category::Baroque),
    ("medieval", Category::Medieval),
    ("gothic", Category::Medieval),
    ("byzantine", Category::Medieval),
    ("romanesque", Category::Medieval),
    ("romantic", Category::Romantic),
    ("realis", Category::Realist),
    ("barbizon", Category::Realist),
    ("ancient", Category::Ancient),
    ("antiquity", Category::Ancient),
    ("hellenistic", Category::Ancient),
    ("postmodern", Category::Contemporary),
    ("post-modern", Category::Contemporary),
    ("post modern", Category::Contemporary),
    ("contemporary", Category::Contemporary),
    ("conceptual", Category::Contemporary),
    ("19th century", Category::NineteenthCentury),
    ("19th-century", Category::NineteenthCentury),
    ("nineteenth century", Category::NineteenthCentury),
    ("nineteenth-century", Category::NineteenthCentury),
    ("art nouveau", Category::Modern),
    ("bauhaus", Category::Modern),
    ("modern", Category::Modern),
];

/// First keyword category found in `text`.
pub fn match_keyword(text: &str) -> Option<Category> {
    let lowered = text.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map(|(_, category)| *category)
}

/// Category implied by a birth year.
pub fn category_for_birth_year(year: i32) -> Category {
    match year {
        ..=1399 => Category::Medieval,
        1400..=1599 => Category::Renaissance,
        1600..=1749 => Category::Baroque,
        1750..=1849 => Category::Romantic,
        1850..=1899 => Category::NineteenthCentury,
        1900..=1944 => Category::Modern,
        _ => Category::Contemporary,
    }
}

/// Categorize a subject.
pub fn categorize(subject: &Subject) -> Category {
    if let Some(category) = subject.movement_text().and_then(match_keyword) {
        return category;
    }
    if let Some(category) = subject.era_text().and_then(match_keyword) {
        return category;
    }
    if let Some(year) = subject.birth_year {
        return category_for_birth_year(year);
    }
    if subject.is_attribution() {
        return Category::Attribution;
    }
    Category::Unknown
}
