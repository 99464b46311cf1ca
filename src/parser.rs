//! Free-text model response parsing.
//!
//! Parsing is total: malformed or partial text degrades to zero scores, a
//! derived type code and an empty rationale. Nothing here returns an error.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::axes::{clamp_score, Axis, AxisMask, ScoreVector, TypeCode};

/// Axis label, optional parenthetical pole names, short filler, signed value.
static AXIS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b([LAEF])\s*[/_]\s*([SRMC])\b(?:\s*\([^)\n]*\))?[^\d\n+\-]{0,8}?([+\-]?)[ \t]*(\d+(?:\.\d+)?)",
    )
    .expect("axis line regex")
});

/// Text after a value that marks a scale description rather than a score.
static SCALE_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:=|\.\.\.|…|to\s+[+\-]?\d)").expect("scale tail regex"));

static LABELED_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:type(?:\s*code)?|apt|archetype)\s*[:=]\s*[*\[\(]*\s*([LS][AR][EM][FC])\b")
        .expect("labeled type regex")
});

static BARE_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([LS][AR][EM][FC])\b").expect("bare type regex"));

static SECTION_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:#+\s*)?[*_]*\s*(?:rationale|reasoning|analysis|explanation|justification|summary)\b\s*[*_]*\s*(?::\s*[*_]*\s*(.*)|[*_]*\s*)$",
    )
    .expect("section header regex")
});

static VERDICT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)verdict\s*[:=]\s*[*\[\(]*\s*(inappropriate|appropriate|disagree|agree|yes|no)\b")
        .expect("verdict regex")
});

static BARE_VERDICT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(INAPPROPRIATE|APPROPRIATE|DISAGREE|AGREE)\b").expect("bare verdict regex")
});

/// Where the parsed type code came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeOrigin {
    /// A 4-letter token present in the text.
    Explicit,
    /// Derived from the parsed score signs.
    Derived,
}

/// Structured view of one model response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub scores: ScoreVector,
    /// Axes for which a labeled value was found.
    pub matched: AxisMask,
    pub type_code: TypeCode,
    pub type_origin: TypeOrigin,
    pub rationale: String,
}

impl ParsedResponse {
    /// No axis could be read; the response must not contribute weight.
    pub fn is_degraded(&self) -> bool {
        self.matched.is_empty()
    }
}

/// Outcome of a quick validation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Appropriate,
    Inappropriate,
    Unclear,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Appropriate => "appropriate",
            Verdict::Inappropriate => "inappropriate",
            Verdict::Unclear => "unclear",
        }
    }
}

/// Parse a free-text model response.
pub fn parse_response(text: &str) -> ParsedResponse {
    let mut scores = ScoreVector::ZERO;
    let mut matched = AxisMask::NONE;
    let mut explicit_type = None;
    let mut rationale = String::new();

    if let Some(json) = extract_json(text) {
        match serde_json::from_str::<Value>(json) {
            Ok(value) => {
                read_json_scores(&value, &mut scores, &mut matched);
                explicit_type = read_json_type(&value);
                rationale = read_json_rationale(&value).unwrap_or_default();
            }
            Err(e) => debug!(error = %e, "embedded JSON did not parse, using labeled lines"),
        }
    }

    // JSON values win; among labeled lines the last one per axis wins.
    let from_json = matched;
    for (axis, value) in labeled_values(&normalize_dashes(text)) {
        if from_json.contains(axis) {
            continue;
        }
        scores.set(axis, value);
        matched.insert(axis);
    }

    if explicit_type.is_none() {
        explicit_type = find_type_token(text);
    }
    if rationale.is_empty() {
        rationale = find_rationale(text);
    }

    let (type_code, type_origin) = match explicit_type {
        Some(code) => (code, TypeOrigin::Explicit),
        None => (scores.type_code(), TypeOrigin::Derived),
    };

    ParsedResponse {
        scores,
        matched,
        type_code,
        type_origin,
        rationale,
    }
}

/// Minus sign and dashes that models emit in place of `-`.
fn normalize_dashes(text: &str) -> Cow<'_, str> {
    if text.contains(['\u{2212}', '\u{2013}', '\u{2014}']) {
        Cow::Owned(text.replace(['\u{2212}', '\u{2013}', '\u{2014}'], "-"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Labeled axis values in text order, skipping scale descriptions such as
/// `L/S: -100 = L ... +100 = S`.
fn labeled_values(text: &str) -> Vec<(Axis, f64)> {
    let mut values = Vec::new();
    for caps in AXIS_LINE.captures_iter(text) {
        let label = format!("{}{}", &caps[1], &caps[2]);
        let Some(axis) = Axis::from_label(&label) else {
            continue;
        };
        let end = caps.get(0).map_or(text.len(), |m| m.end());
        let tail = text[end..].lines().next().unwrap_or("");
        if SCALE_TAIL.is_match(tail) {
            continue;
        }
        let Ok(magnitude) = caps[4].parse::<f64>() else {
            continue;
        };
        let value = if &caps[3] == "-" { -magnitude } else { magnitude };
        values.push((axis, clamp_score(value)));
    }
    values
}

/// Parse a validation response into a verdict.
pub fn parse_verdict(text: &str) -> Verdict {
    let word = VERDICT
        .captures(text)
        .or_else(|| BARE_VERDICT.captures(text))
        .map(|caps| caps[1].to_ascii_lowercase());
    match word.as_deref() {
        Some("appropriate" | "agree" | "yes") => Verdict::Appropriate,
        Some("inappropriate" | "disagree" | "no") => Verdict::Inappropriate,
        _ => Verdict::Unclear,
    }
}

/// First balanced `{...}` block in `raw`, if any.
pub fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let remainder = &raw[start..];
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in remainder.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&remainder[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn read_json_scores(value: &Value, scores: &mut ScoreVector, matched: &mut AxisMask) {
    let map = ["axis_scores", "axisScores", "scores"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_object))
        .or_else(|| value.as_object());
    let Some(map) = map else {
        return;
    };
    for (key, raw) in map {
        let Some(axis) = Axis::from_label(key) else {
            continue;
        };
        if let Some(n) = json_number(raw) {
            scores.set(axis, n);
            matched.insert(axis);
        }
    }
}

fn json_number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => normalize_dashes(s.trim()).trim_start_matches('+').parse().ok(),
        Value::Object(o) => o.get("score").and_then(json_number),
        _ => None,
    }
}

fn read_json_type(value: &Value) -> Option<TypeCode> {
    ["type_code", "typeCode", "aptType", "apt_type", "type"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .and_then(|s| s.parse().ok())
}

fn read_json_rationale(value: &Value) -> Option<String> {
    ["rationale", "reasoning", "analysis", "explanation"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn find_type_token(text: &str) -> Option<TypeCode> {
    LABELED_TYPE
        .captures(text)
        .or_else(|| BARE_TYPE.captures(text))
        .and_then(|caps| caps[1].parse().ok())
}

/// Longest block of text following a section header, ended by a blank line,
/// another header, or an axis line.
fn find_rationale(text: &str) -> String {
    let mut best = String::new();
    let mut current: Option<Vec<String>> = None;

    for line in text.lines() {
        if let Some(caps) = SECTION_HEADER.captures(line) {
            flush(current.take(), &mut best);
            let rest = caps.get(1).map_or("", |m| m.as_str());
            let rest = rest.trim().trim_matches('*').trim();
            current = Some(if rest.is_empty() {
                Vec::new()
            } else {
                vec![rest.to_string()]
            });
            continue;
        }
        let trimmed = line.trim();
        let ends_block = trimmed.is_empty() || AXIS_LINE.is_match(&normalize_dashes(trimmed));
        if ends_block {
            // A header followed by a blank line still owns the next paragraph.
            let keep_open = trimmed.is_empty() && current.as_ref().is_some_and(Vec::is_empty);
            if !keep_open {
                flush(current.take(), &mut best);
            }
            continue;
        }
        if let Some(lines) = current.as_mut() {
            lines.push(trimmed.to_string());
        }
    }
    flush(current, &mut best);
    best
}

fn flush(block: Option<Vec<String>>, best: &mut String) {
    if let Some(lines) = block {
        let joined = lines.join(" ").trim().to_string();
        if joined.chars().count() > best.chars().count() {
            *best = joined;
        }
    }
}
