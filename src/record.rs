//! Strictly-typed output records and the final job summary.
//!
//! Everything downstream of the normalizer consumes these types. The contract
//! they carry: no string field is ever missing or null — every field was
//! populated with either a coerced source value or a declared default. The
//! only nullable fields in the whole schema are [`NormalizedJuror::gender`]
//! and [`NormalizedJuror::panel_position`], and only because "unknown" is a
//! legitimate answer for both.
//!
//! Serialisation uses camelCase to match the wire shapes the case-management
//! backend expects when persisting records.

use crate::error::PageFailure;
use serde::{Deserialize, Serialize};

/// Which record schema an extraction job targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Voir dire questions (deduplicated by exact text).
    Question,
    /// Jury-pool member rows (never deduplicated).
    Juror,
}

/// Answer format of a voir dire question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    /// Yes/no answer. The fallback for any unrecognised source value.
    #[default]
    YesNo,
    /// Free-form text answer.
    Text,
    /// Numeric rating answer.
    Rating,
}

/// A voir dire question after normalization.
///
/// Invariants: `question` is trimmed and longer than five characters,
/// `percentage` is within `[0, 100]`, `tags` respects the caller-chosen
/// ceiling (3 for extraction flows, 5 for manual entry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedQuestion {
    /// The question text, trimmed, non-empty.
    pub question: String,
    /// Topic tags, already truncated to the flow's ceiling.
    pub tags: Vec<String>,
    /// Relevance weighting in `[0, 100]`.
    pub percentage: f64,
    /// Answer format; defaults to yes/no when the source was unrecognised.
    pub question_type: QuestionType,
}

/// Juror gender as recorded on the pool sheet.
///
/// Anything that doesn't lowercase to exactly `male` or `female` is treated
/// as unknown and stored as `None` on the juror record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Coarse bias assessment bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiasStatus {
    Low,
    #[default]
    Moderate,
    High,
}

/// Juror scheduling availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Availability {
    #[default]
    Available,
    Limited,
    Unavailable,
}

/// A jury-pool member after normalization.
///
/// Every string field holds a safe default rather than an absent value;
/// see [`crate::pipeline::normalize`] for the exact per-field defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedJuror {
    /// Display name; defaults to "Unknown Juror".
    pub name: String,
    /// Court-issued juror identifier; defaults to a generated `J-NNN`.
    pub juror_number: String,
    /// Age in years; 0 when the source was not parseable.
    pub age: f64,
    /// `None` when the pool sheet did not record a recognisable value.
    pub gender: Option<Gender>,
    pub occupation: String,
    pub education: String,
    pub marital_status: String,
    /// Number of children as recorded (free text on many pool sheets); "0" default.
    pub children: String,
    /// Citizenship answer; defaults to "Yes".
    pub citizenship: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub employer: String,
    /// Seat/order number in the pool. `None` when unassigned or unparseable;
    /// never coerced to 0.
    pub panel_position: Option<i64>,
    /// Prior jury service description; defaults to "No prior jury experience".
    pub experience: String,
    // Legal-history yes/no flags. All default to "No".
    pub criminal_record: String,
    pub victim_of_crime: String,
    pub lawsuit_involvement: String,
    pub law_enforcement_ties: String,
    pub bias_status: BiasStatus,
    pub availability: Availability,
}

/// One normalized record of either kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizedRecord {
    Question(NormalizedQuestion),
    Juror(NormalizedJuror),
}

impl NormalizedRecord {
    /// The question text, when this record is a question.
    pub fn as_question(&self) -> Option<&NormalizedQuestion> {
        match self {
            NormalizedRecord::Question(q) => Some(q),
            NormalizedRecord::Juror(_) => None,
        }
    }

    /// The juror row, when this record is a juror.
    pub fn as_juror(&self) -> Option<&NormalizedJuror> {
        match self {
            NormalizedRecord::Juror(j) => Some(j),
            NormalizedRecord::Question(_) => None,
        }
    }
}

/// How an extraction job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobOutcome {
    /// Every unit was attempted; at least one record came out.
    Complete,
    /// Units were processed without fatal error but nothing viable was
    /// extracted. Distinct from a processing error.
    NoRecordsFound,
    /// The extraction service signalled quota exhaustion mid-job. Records
    /// accumulated before the abort are still present.
    QuotaExhausted,
}

/// Timing and volume counters for one extraction job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionStats {
    /// Pages the renderer produced artifacts for.
    pub pages_rendered: usize,
    /// Units of work the job planned (pages in image mode, batches in text mode).
    pub units_planned: usize,
    /// Units actually attempted; lower than planned after a quota abort.
    pub units_processed: usize,
    /// Units that failed non-fatally.
    pub units_failed: usize,
    /// Records surviving normalization, before deduplication.
    pub records_normalized: usize,
    /// Duplicate questions removed by the aggregator.
    pub records_deduplicated: usize,
    /// Wall-clock duration of the whole job.
    pub total_duration_ms: u64,
    /// Time spent rendering/encoding pages.
    pub render_duration_ms: u64,
    /// Time spent in extraction-service calls (including inter-batch delays).
    pub extract_duration_ms: u64,
}

/// Final result of one extraction job.
///
/// Returned even on early quota abort — a partial result is always preferable
/// to no result. Only precondition failures and total failure (every unit
/// failed, zero records) surface as `Err(ExtractError)` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionSummary {
    /// Deduplicated records in page order.
    pub records: Vec<NormalizedRecord>,
    /// Non-fatal per-unit failures, in processing order.
    pub failures: Vec<PageFailure>,
    /// Terminal state of the job.
    pub outcome: JobOutcome,
    /// Counters for logging and UI display.
    pub stats: ExtractionStats,
}

impl ExtractionSummary {
    /// True when at least one unit failed but records were still produced.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty() && !self.records.is_empty()
    }

    /// Treat a quota-aborted job as an error, discarding nothing.
    ///
    /// For callers that would rather fail loudly than persist a partial
    /// record list. The default contract keeps partial results.
    pub fn into_strict(self) -> Result<Self, crate::error::ExtractError> {
        if self.outcome == JobOutcome::QuotaExhausted {
            return Err(crate::error::ExtractError::QuotaExhausted {
                units_done: self.stats.units_processed,
                units_total: self.stats.units_planned,
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&QuestionType::YesNo).unwrap(),
            "\"YES_NO\""
        );
        assert_eq!(serde_json::to_string(&QuestionType::Text).unwrap(), "\"TEXT\"");
        assert_eq!(
            serde_json::to_string(&QuestionType::Rating).unwrap(),
            "\"RATING\""
        );
    }

    #[test]
    fn gender_wire_names() {
        assert_eq!(serde_json::to_string(&Gender::Male).unwrap(), "\"male\"");
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"female\"");
    }

    #[test]
    fn availability_wire_names() {
        assert_eq!(
            serde_json::to_string(&Availability::Unavailable).unwrap(),
            "\"Unavailable\""
        );
    }

    #[test]
    fn question_serializes_camel_case() {
        let q = NormalizedQuestion {
            question: "Have you served before?".into(),
            tags: vec!["experience".into()],
            percentage: 80.0,
            question_type: QuestionType::YesNo,
        };
        let json = serde_json::to_string(&q).unwrap();
        assert!(json.contains("\"questionType\":\"YES_NO\""), "got: {json}");
    }

    #[test]
    fn summary_partial_detection() {
        let summary = ExtractionSummary {
            records: vec![NormalizedRecord::Question(NormalizedQuestion {
                question: "Any hardship serving two weeks?".into(),
                tags: vec![],
                percentage: 75.0,
                question_type: QuestionType::YesNo,
            })],
            failures: vec![crate::error::PageFailure {
                page_number: 2,
                reason: crate::error::FailureReason::ServiceError(500),
            }],
            outcome: JobOutcome::Complete,
            stats: ExtractionStats::default(),
        };
        assert!(summary.is_partial());
    }
}
