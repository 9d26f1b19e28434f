//! Record normalization: untrusted candidate JSON → strict typed records.
//!
//! The extraction service's output is LLM-generated and its schema is not
//! enforced upstream, so this module is the single chokepoint guaranteeing
//! that every downstream consumer receives fully-typed, default-populated
//! records. Every field access goes through an explicit coercion — nothing
//! here assumes the candidate matches the declared shape.
//!
//! Candidates that fail the hard minimum-viability check (a question whose
//! text is missing or trivially short, a juror that is not even a JSON
//! object) are dropped silently. That is routine filtering, not an error:
//! the service routinely hallucinates fragments on page headers and footers.
//!
//! Normalization is idempotent — running an already-normalized record
//! through again yields the same record.

use crate::record::{
    Availability, BiasStatus, Gender, NormalizedJuror, NormalizedQuestion, QuestionType,
    RecordKind,
};
use serde_json::Value;
use tracing::debug;

/// Minimum trimmed question length; anything at or below is dropped.
const MIN_QUESTION_LEN: usize = 5;

/// Default relevance weighting when the candidate has no usable percentage.
const DEFAULT_PERCENTAGE: f64 = 75.0;

/// Pull the candidate array out of a raw service response.
///
/// Accepts `{"questions": [...]}` / `{"jurors": [...]}` as documented, and a
/// bare top-level array as a tolerated variant. Anything else yields no
/// candidates.
pub fn candidate_records(response: &Value, kind: RecordKind) -> &[Value] {
    let key = match kind {
        RecordKind::Question => "questions",
        RecordKind::Juror => "jurors",
    };
    if let Some(arr) = response.get(key).and_then(Value::as_array) {
        arr
    } else if let Some(arr) = response.as_array() {
        arr
    } else {
        &[]
    }
}

// ── Questions ────────────────────────────────────────────────────────────

/// Normalize every viable question candidate in `candidates`.
///
/// `tag_limit` is the caller-chosen tag ceiling: 3 on extraction flows,
/// 5 on manual entry. It is not a universal constant.
pub fn normalize_questions(candidates: &[Value], tag_limit: usize) -> Vec<NormalizedQuestion> {
    let normalized: Vec<_> = candidates
        .iter()
        .filter_map(|c| normalize_question(c, tag_limit))
        .collect();
    debug!(
        "Normalized {}/{} question candidates",
        normalized.len(),
        candidates.len()
    );
    normalized
}

/// Normalize one question candidate, or drop it.
///
/// Drop criterion: the `question` field is not a string, or its trimmed
/// length is ≤ 5 characters.
pub fn normalize_question(candidate: &Value, tag_limit: usize) -> Option<NormalizedQuestion> {
    let question = candidate.get("question")?.as_str()?.trim();
    if question.len() <= MIN_QUESTION_LEN {
        return None;
    }

    let mut tags: Vec<String> = candidate
        .get("tags")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    tags.truncate(tag_limit);

    let percentage = candidate
        .get("percentage")
        .and_then(Value::as_f64)
        .map(|p| p.clamp(0.0, 100.0))
        .unwrap_or(DEFAULT_PERCENTAGE);

    // Only the exact field name counts; candidates carrying `type` instead
    // fall back to the default like any other unrecognised value.
    let question_type = match candidate.get("questionType").and_then(Value::as_str) {
        Some("YES_NO") => QuestionType::YesNo,
        Some("TEXT") => QuestionType::Text,
        Some("RATING") => QuestionType::Rating,
        _ => QuestionType::YesNo,
    };

    Some(NormalizedQuestion {
        question: question.to_string(),
        tags,
        percentage,
        question_type,
    })
}

// ── Jurors ───────────────────────────────────────────────────────────────

/// Normalize every juror candidate in `candidates`.
///
/// `start_index` is the count of jurors already accumulated in this job; it
/// seeds the generated `J-NNN` placeholder numbers so they stay unique
/// across pages.
pub fn normalize_jurors(candidates: &[Value], start_index: usize) -> Vec<NormalizedJuror> {
    let normalized: Vec<_> = candidates
        .iter()
        .filter(|c| c.is_object())
        .enumerate()
        .map(|(i, c)| normalize_juror(c, start_index + i))
        .collect();
    debug!(
        "Normalized {}/{} juror candidates",
        normalized.len(),
        candidates.len()
    );
    normalized
}

/// Normalize one juror candidate.
///
/// `index` is the juror's 0-based position in the job's accumulated output,
/// used only for the generated `jurorNumber` placeholder.
pub fn normalize_juror(candidate: &Value, index: usize) -> NormalizedJuror {
    let field = |name: &str| candidate.get(name);

    NormalizedJuror {
        name: safe_string(field("name"), "Unknown Juror"),
        juror_number: {
            let generated = format!("J-{:03}", index + 1);
            safe_string(field("jurorNumber"), &generated)
        },
        age: coerce_number(field("age")).unwrap_or(0.0),
        gender: coerce_gender(field("gender")),
        occupation: safe_string(field("occupation"), ""),
        education: safe_string(field("education"), ""),
        marital_status: safe_string(field("maritalStatus"), ""),
        children: safe_string(field("children"), "0"),
        citizenship: safe_string(field("citizenship"), "Yes"),
        address: safe_string(field("address"), ""),
        phone: safe_string(field("phone"), ""),
        email: safe_string(field("email"), ""),
        employer: safe_string(field("employer"), ""),
        panel_position: coerce_panel_position(field("panelPosition")),
        experience: safe_string(field("experience"), "No prior jury experience"),
        criminal_record: safe_string(field("criminalRecord"), "No"),
        victim_of_crime: safe_string(field("victimOfCrime"), "No"),
        lawsuit_involvement: safe_string(field("lawsuitInvolvement"), "No"),
        law_enforcement_ties: safe_string(field("lawEnforcementTies"), "No"),
        bias_status: coerce_bias_status(field("biasStatus")),
        availability: coerce_availability(field("availability")),
    }
}

// ── Field coercions ──────────────────────────────────────────────────────

/// Safe-string coercion: missing, null, or empty values become `default`.
///
/// Numbers are stringified (pool sheets record children counts and ZIP codes
/// as numbers as often as strings); every other non-string shape falls back
/// to the default.
fn safe_string(value: Option<&Value>, default: &str) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => default.to_string(),
    }
}

/// Coerce a numeric field, accepting numbers and numeric strings.
fn coerce_number(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Lowercase and match the gender domain exactly; everything else is unknown.
fn coerce_gender(value: Option<&Value>) -> Option<Gender> {
    match value.and_then(Value::as_str)?.to_lowercase().as_str() {
        "male" => Some(Gender::Male),
        "female" => Some(Gender::Female),
        _ => None,
    }
}

/// Panel position: keep source numbers, parse non-empty strings, never
/// coerce to 0 — a missing seat is `None`, not seat zero.
fn coerce_panel_position(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Number(n)) => n.as_i64().filter(|p| *p > 0),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<i64>().ok().filter(|p| *p > 0)
            }
        }
        _ => None,
    }
}

fn coerce_bias_status(value: Option<&Value>) -> BiasStatus {
    match value.and_then(Value::as_str) {
        Some("low") => BiasStatus::Low,
        Some("moderate") => BiasStatus::Moderate,
        Some("high") => BiasStatus::High,
        _ => BiasStatus::Moderate,
    }
}

fn coerce_availability(value: Option<&Value>) -> Availability {
    match value.and_then(Value::as_str) {
        Some("Available") => Availability::Available,
        Some("Limited") => Availability::Limited,
        Some("Unavailable") => Availability::Unavailable,
        _ => Availability::Available,
    }
}
