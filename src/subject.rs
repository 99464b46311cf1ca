//! The input record: one artist with whatever metadata happens to exist.

use serde::{Deserialize, Serialize};

/// Name prefixes that mark a work attribution rather than a named artist.
///
/// Longer prefixes come first so "In the style of" wins over "Style of".
pub const ATTRIBUTION_PREFIXES: &[&str] = &[
    "in the style of",
    "attributed to",
    "follower of",
    "imitator of",
    "workshop of",
    "circle of",
    "school of",
    "studio of",
    "manner of",
    "copy after",
    "style of",
    "after",
];

/// An artist record. Immutable for the duration of one classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Subject {
    pub name: String,
    #[serde(default, alias = "bio", skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub era: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movement: Option<String>,
    #[serde(default, alias = "birthYear", skip_serializing_if = "Option::is_none")]
    pub birth_year: Option<i32>,
    #[serde(default, alias = "deathYear", skip_serializing_if = "Option::is_none")]
    pub death_year: Option<i32>,
    #[serde(
        default,
        alias = "knownWorksCount",
        alias = "artwork_count",
        alias = "artworkCount",
        skip_serializing_if = "Option::is_none"
    )]
    pub known_works_count: Option<u32>,
    #[serde(default, alias = "style", skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
}

impl Subject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_biography(mut self, biography: impl Into<String>) -> Self {
        self.biography = Some(biography.into());
        self
    }

    pub fn with_nationality(mut self, nationality: impl Into<String>) -> Self {
        self.nationality = Some(nationality.into());
        self
    }

    pub fn with_era(mut self, era: impl Into<String>) -> Self {
        self.era = Some(era.into());
        self
    }

    pub fn with_movement(mut self, movement: impl Into<String>) -> Self {
        self.movement = Some(movement.into());
        self
    }

    pub fn with_birth_year(mut self, year: i32) -> Self {
        self.birth_year = Some(year);
        self
    }

    pub fn with_death_year(mut self, year: i32) -> Self {
        self.death_year = Some(year);
        self
    }

    pub fn with_known_works(mut self, count: u32) -> Self {
        self.known_works_count = Some(count);
        self
    }

    pub fn with_medium(mut self, medium: impl Into<String>) -> Self {
        self.medium = Some(medium.into());
        self
    }

    /// Biography text if present and non-blank.
    pub fn biography_text(&self) -> Option<&str> {
        non_blank(self.biography.as_deref())
    }

    pub fn nationality_text(&self) -> Option<&str> {
        non_blank(self.nationality.as_deref())
    }

    pub fn era_text(&self) -> Option<&str> {
        non_blank(self.era.as_deref())
    }

    pub fn movement_text(&self) -> Option<&str> {
        non_blank(self.movement.as_deref())
    }

    pub fn medium_text(&self) -> Option<&str> {
        non_blank(self.medium.as_deref())
    }

    /// Biography length in characters (not bytes).
    pub fn biography_chars(&self) -> usize {
        self.biography_text().map(|b| b.chars().count()).unwrap_or(0)
    }

    /// The attribution prefix, if the name carries one.
    pub fn attribution_prefix(&self) -> Option<&'static str> {
        let lowered = self.name.trim().to_lowercase();
        ATTRIBUTION_PREFIXES.iter().copied().find(|prefix| {
            lowered
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with(char::is_whitespace))
        })
    }

    pub fn is_attribution(&self) -> bool {
        self.attribution_prefix().is_some()
    }

    /// Name with any attribution prefix removed.
    pub fn actual_name(&self) -> &str {
        let trimmed = self.name.trim();
        match self.attribution_prefix() {
            // Prefixes are ASCII, so the byte length matches the original casing.
            Some(prefix) => trimmed.get(prefix.len()..).unwrap_or(trimmed).trim(),
            None => trimmed,
        }
    }

    /// Life span rendered for prompts, e.g. `"1853-1890"` or `"b. 1950"`.
    pub fn life_span(&self) -> Option<String> {
        match (self.birth_year, self.death_year) {
            (Some(b), Some(d)) => Some(format!("{b}-{d}")),
            (Some(b), None) => Some(format!("b. {b}")),
            (None, Some(d)) => Some(format!("d. {d}")),
            (None, None) => None,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
