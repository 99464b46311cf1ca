//! Prompt templates for model-source analysis calls.
//!
//! Domain logic for rendering estimate, refinement and validation prompts.
//! Provider-agnostic.

use crate::axes::{Axis, ScoreVector, TypeCode};
use crate::gateway::Message;
use crate::subject::Subject;

/// Biography text beyond this many characters is cut from prompts.
pub const MAX_BIOGRAPHY_CHARS: usize = 3000;

// =============================================================================
// Subject card
// =============================================================================

/// Escaped, prompt-ready rendering of a subject's known fields.
#[derive(Debug, Clone)]
pub struct SubjectCard {
    pub name: String,
    pub details: String,
}

impl SubjectCard {
    pub fn from_subject(subject: &Subject) -> Self {
        let mut lines = Vec::new();
        if let Some(prefix) = subject.attribution_prefix() {
            lines.push(format!(
                "Attribution: {} (work by a follower or workshop, not the named artist)",
                escape_xml_chars(prefix)
            ));
        }
        if let Some(n) = subject.nationality_text() {
            lines.push(format!("Nationality: {}", escape_xml_chars(n)));
        }
        if let Some(span) = subject.life_span() {
            lines.push(format!("Life: {span}"));
        }
        if let Some(e) = subject.era_text() {
            lines.push(format!("Era: {}", escape_xml_chars(e)));
        }
        if let Some(m) = subject.movement_text() {
            lines.push(format!("Movement: {}", escape_xml_chars(m)));
        }
        if let Some(m) = subject.medium_text() {
            lines.push(format!("Medium: {}", escape_xml_chars(m)));
        }
        if let Some(count) = subject.known_works_count {
            lines.push(format!("Known works: {count}"));
        }
        if let Some(bio) = subject.biography_text() {
            let cut: String = bio.chars().take(MAX_BIOGRAPHY_CHARS).collect();
            lines.push(format!("Biography:\n{}", escape_xml_chars(cut.trim())));
        }
        if lines.is_empty() {
            lines.push("(no further information)".to_string());
        }

        Self {
            name: escape_xml_chars(subject.actual_name()),
            details: lines.join("\n"),
        }
    }
}

// =============================================================================
// Prompt templates
// =============================================================================

/// Rendered prompt ready for a provider.
#[derive(Debug, Clone)]
pub struct PromptInstance {
    pub template_slug: String,
    pub system: String,
    pub user: String,
}

impl PromptInstance {
    pub fn to_messages(&self) -> Vec<Message> {
        vec![Message::system(&self.system), Message::user(&self.user)]
    }
}

/// Escape XML special characters to prevent prompt injection via tag breaking.
fn escape_xml_chars(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// A prompt template with placeholders.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub slug: &'static str,
    pub system: &'static str,
    pub user: &'static str,
}

impl PromptTemplate {
    /// Fill `{name}`, `{details}`, `{axes}`, `{baseline}` and `{type_code}`.
    fn fill(
        &self,
        card: &SubjectCard,
        axes: &str,
        baseline: &str,
        type_code: &str,
    ) -> PromptInstance {
        let render = |template: &str| {
            template
                .replace("{axis_guide}", &axis_guide())
                .replace("{name}", &card.name)
                .replace("{details}", &card.details)
                .replace("{axes}", axes)
                .replace("{baseline}", baseline)
                .replace("{type_code}", type_code)
        };
        PromptInstance {
            template_slug: self.slug.to_string(),
            system: render(self.system).trim().to_string(),
            user: render(self.user).trim().to_string(),
        }
    }
}

/// Human-readable description of all four axes.
fn axis_guide() -> String {
    Axis::ALL
        .iter()
        .map(|axis| {
            let neg = axis.negative_pole();
            let pos = axis.positive_pole();
            format!(
                "{label}: -100 = {nl} ({nn}: {nd}) ... +100 = {pl} ({pn}: {pd})",
                label = axis.label(),
                nl = neg.letter,
                nn = neg.name,
                nd = neg.description,
                pl = pos.letter,
                pn = pos.name,
                pd = pos.description,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub const ESTIMATE_PROMPT: PromptTemplate = PromptTemplate {
    slug: "archetype_estimate_v1",
    system: r#"You are an art historian profiling artists on four bipolar axes. Score each axis from -100 to +100. Negative values express the left pole, positive values the right pole, and magnitude expresses strength. Be decisive where the evidence is clear; keep scores near zero only when it is genuinely mixed. Do not default to the same archetype for every artist.

{axis_guide}"#,
    user: r#"<artist_name>{name}</artist_name>
<artist_details>
{details}
</artist_details>

Answer in exactly this format:
L/S: <score> - <one-line reason>
A/R: <score> - <one-line reason>
E/M: <score> - <one-line reason>
F/C: <score> - <one-line reason>
Type: <4-letter code>
Rationale: <two or three sentences>"#,
};

pub const REFINE_PROMPT: PromptTemplate = PromptTemplate {
    slug: "archetype_refine_v1",
    system: r#"You are an art historian refining an uncertain artist profile. A quick heuristic already scored every axis; only the listed axes are uncertain. Score each listed axis from -100 to +100 (negative = left pole, positive = right pole).

{axis_guide}"#,
    user: r#"<artist_name>{name}</artist_name>
<artist_details>
{details}
</artist_details>

<heuristic_baseline>{baseline}</heuristic_baseline>

Score only these axes: {axes}
One line per axis in the form `<axis>: <score> - <reason>`, then `Rationale: <one or two sentences>`."#,
};

pub const VALIDATE_PROMPT: PromptTemplate = PromptTemplate {
    slug: "archetype_validate_v1",
    system: r#"You check whether a proposed personality archetype fits an artist. Answer with a single verdict line.

{axis_guide}"#,
    user: r#"<artist_name>{name}</artist_name>
<artist_details>
{details}
</artist_details>

Proposed archetype: {type_code}

Reply with `Verdict: APPROPRIATE` or `Verdict: INAPPROPRIATE`, then one sentence of reason."#,
};

/// Full four-axis estimate.
pub fn estimate_prompt(subject: &Subject) -> PromptInstance {
    ESTIMATE_PROMPT.fill(&SubjectCard::from_subject(subject), "", "", "")
}

/// Refinement of the listed axes against a heuristic baseline.
pub fn refine_prompt(subject: &Subject, baseline: &ScoreVector, axes: &[Axis]) -> PromptInstance {
    let axes_text = axes.iter().map(|a| a.label()).collect::<Vec<_>>().join(", ");
    let baseline_text = baseline
        .iter()
        .map(|(a, v)| format!("{}: {v:.0}", a.label()))
        .collect::<Vec<_>>()
        .join(", ");
    REFINE_PROMPT.fill(
        &SubjectCard::from_subject(subject),
        &axes_text,
        &baseline_text,
        "",
    )
}

/// Yes/no check of a proposed code.
pub fn validate_prompt(subject: &Subject, code: TypeCode) -> PromptInstance {
    let profile = code.profile();
    let proposed = format!("{code} ({}, {})", profile.title, profile.animal);
    VALIDATE_PROMPT.fill(&SubjectCard::from_subject(subject), "", "", &proposed)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_prompt_lists_every_axis() {
        let s = Subject::new("Rembrandt").with_era("Baroque");
        let p = estimate_prompt(&s);
        for axis in Axis::ALL {
            assert!(p.system.contains(axis.label()));
            assert!(p.user.contains(&format!("{}: <score>", axis.label())));
        }
        assert!(p.user.contains("Era: Baroque"));
        assert_eq!(p.template_slug, "archetype_estimate_v1");
    }

    #[test]
    fn refine_prompt_names_only_uncertain_axes() {
        let s = Subject::new("X");
        let baseline = ScoreVector::new(-10.0, 80.0, 5.0, 60.0);
        let p = refine_prompt(&s, &baseline, &[Axis::Social, Axis::Reception]);
        assert!(p.user.contains("Score only these axes: L/S, E/M"));
        assert!(p.user.contains("A/R: 80"));
    }

    #[test]
    fn validate_prompt_mentions_code() {
        let p = validate_prompt(&Subject::new("X"), TypeCode::LAEF);
        assert!(p.user.contains("LAEF (Dreamy Wanderer, fox)"));
        assert!(p.user.contains("Verdict:"));
    }

    #[test]
    fn attribution_names_are_stripped_and_flagged() {
        let card = SubjectCard::from_subject(&Subject::new("Circle of Rubens"));
        assert_eq!(card.name, "Rubens");
        assert!(card.details.contains("Attribution: circle of"));
    }

    #[test]
    fn xml_escaping() {
        let s = Subject::new("<b>Eve</b>").with_biography("<script>alert('x')</script>");
        let p = estimate_prompt(&s);
        assert!(p.user.contains("&lt;script&gt;"));
        assert!(!p.user.contains("<script>"));
        assert!(p.user.contains("&lt;b&gt;Eve"));
    }

    #[test]
    fn long_biographies_are_cut() {
        let s = Subject::new("X").with_biography("z".repeat(MAX_BIOGRAPHY_CHARS + 500));
        let card = SubjectCard::from_subject(&s);
        assert_eq!(card.details.matches('z').count(), MAX_BIOGRAPHY_CHARS);
    }
}
