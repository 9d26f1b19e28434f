//! Aggregation: merge normalized records across units, dropping duplicates.
//!
//! Questions are deduplicated by exact text equality — pool questionnaires
//! repeat boilerplate questions on every page, and the first occurrence wins
//! so output order still follows page order. Jurors are never deduplicated:
//! each extracted row is assumed to be a distinct person, and two jurors
//! sharing a name is not evidence of duplication.

use crate::record::{NormalizedJuror, NormalizedQuestion, NormalizedRecord};
use std::collections::HashSet;
use tracing::debug;

/// Result of a deduplication pass.
pub struct Aggregated {
    pub records: Vec<NormalizedRecord>,
    /// How many duplicates were removed.
    pub deduplicated: usize,
}

/// Deduplicate questions by exact text, first occurrence winning.
///
/// Equality is case-sensitive and uses the text exactly as normalization
/// left it (already trimmed); no further folding is applied.
pub fn aggregate_questions(questions: Vec<NormalizedQuestion>) -> Aggregated {
    let total = questions.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(total);
    let mut records = Vec::with_capacity(total);

    for q in questions {
        if seen.insert(q.question.clone()) {
            records.push(NormalizedRecord::Question(q));
        }
    }

    let deduplicated = total - records.len();
    if deduplicated > 0 {
        debug!("Dropped {} duplicate questions", deduplicated);
    }
    Aggregated {
        records,
        deduplicated,
    }
}

/// Concatenate jurors in processing order. No deduplication.
pub fn aggregate_jurors(jurors: Vec<NormalizedJuror>) -> Aggregated {
    Aggregated {
        records: jurors.into_iter().map(NormalizedRecord::Juror).collect(),
        deduplicated: 0,
    }
}
