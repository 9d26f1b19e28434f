//! Progress-callback trait for per-unit extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline works through each page or batch.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a WebSocket, a database record, or a terminal
//! progress bar — without the library knowing anything about how the host
//! application communicates. The trait is `Send + Sync` because parallel
//! image-file mode fires events from several jobs at once.

use std::sync::Arc;

/// Called by the extraction pipeline as it processes each unit of work.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Within one job events arrive strictly in unit order;
/// across parallel image files they interleave, so implementations must
/// protect shared mutable state.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after rendering, before the first extraction call.
    ///
    /// # Arguments
    /// * `total_units` — units of work the job will attempt
    fn on_job_start(&self, total_units: usize) {
        let _ = total_units;
    }

    /// Called just before a unit's extraction call is sent.
    ///
    /// # Arguments
    /// * `current`     — 1-based unit index
    /// * `total`       — total units in the job
    /// * `phase_label` — human-readable phase, e.g. "Analyzing page 3 of 7..."
    fn on_unit_start(&self, current: usize, total: usize, phase_label: &str) {
        let _ = (current, total, phase_label);
    }

    /// Called when a unit's records have been normalized and accumulated.
    ///
    /// # Arguments
    /// * `current`       — 1-based unit index
    /// * `total`         — total units
    /// * `records_added` — records that survived normalization for this unit
    fn on_unit_complete(&self, current: usize, total: usize, records_added: usize) {
        let _ = (current, total, records_added);
    }

    /// Called when a unit fails non-fatally and is skipped.
    fn on_unit_failed(&self, current: usize, total: usize, error: &str) {
        let _ = (current, total, error);
    }

    /// Called once when the job reaches a terminal state.
    ///
    /// # Arguments
    /// * `total_units`  — units the job planned to attempt
    /// * `record_count` — records in the final (deduplicated) result
    fn on_job_complete(&self, total_units: usize, record_count: usize) {
        let _ = (total_units, record_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

/// Build the per-unit phase label shown to users.
///
/// Image units name their single page; text units name the batch range.
pub fn phase_label(first_page: usize, last_page: usize, total_pages: usize) -> String {
    if first_page == last_page {
        format!("Analyzing page {first_page} of {total_pages}...")
    } else {
        format!("Analyzing pages {first_page}-{last_page} of {total_pages}...")
    }
}
