//! Pipeline orchestration: drive one extraction job end to end.
//!
//! The job state machine: Idle → Rendering → Processing(unit i of N) →
//! Aggregating → Completed | Failed. Once a job reaches a terminal state it
//! never processes further units; a fresh job is created per file.
//!
//! ## Failure dispatch
//!
//! There is exactly one decision point for mid-job errors, inside the unit
//! loop: a fatal reason (quota exhaustion) stops the loop but keeps
//! everything already accumulated — a partial result is always preferable to
//! no result — while any other reason is recorded as a [`PageFailure`] and
//! the loop continues. The pipeline never retries on its own; callers
//! resubmit failed pages as a new job if they want another attempt.
//!
//! ## Sequencing
//!
//! Units within one job run strictly sequentially: progress reporting stays
//! deterministic and the extraction service's implicit rate limits are
//! respected (the text path additionally sleeps ~1 s between batches).
//! The only concurrency lives in [`extract_files`], which fans out up to
//! five independent image files and flattens results in submission order.

use crate::config::{ExtractionConfig, ExtractionMode};
use crate::error::{ExtractError, FailureReason, PageFailure};
use crate::pipeline::aggregate::{self, Aggregated};
use crate::pipeline::batch::{self, WorkUnit};
use crate::pipeline::extract::{ExtractionBackend, HttpExtractionBackend};
use crate::pipeline::normalize;
use crate::pipeline::{input, render};
use crate::progress::phase_label;
use crate::record::{ExtractionStats, ExtractionSummary, JobOutcome, RecordKind};
use futures::stream::{self, StreamExt};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Extract records from one PDF or image file.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(ExtractionSummary)` whenever any result can be salvaged — including
/// quota-aborted jobs with partial records (check `summary.outcome`) and
/// jobs with per-page failures (check `summary.failures`).
///
/// # Errors
/// Returns `Err(ExtractError)` only for fatal conditions:
/// - Missing credential, file not found, unsupported type, oversized file
/// - Unreadable or empty document
/// - Every unit failed and no records were produced
pub async fn extract_from_file(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionSummary, ExtractError> {
    let total_start = Instant::now();
    let path = path.as_ref();
    info!("Starting extraction job: {}", path.display());

    // ── Pre-flight: credential before any rendering ──────────────────────
    let backend = resolve_backend(config)?;

    // ── Pre-flight: file type and size ───────────────────────────────────
    let validated = input::validate_input(path, config.max_file_bytes)?;

    // ── Rendering ────────────────────────────────────────────────────────
    let render_start = Instant::now();
    let rendered = render::render_document(&validated, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!(
        "Rendered {} pages in {}ms",
        rendered.artifacts.len(),
        render_duration_ms
    );

    if rendered.artifacts.is_empty() {
        // A render failure on the very first page left nothing to process.
        return match rendered.aborted {
            Some(failure) => Err(ExtractError::UnreadableDocument {
                path: path.to_path_buf(),
                detail: failure.reason.to_string(),
            }),
            None => Err(ExtractError::EmptyDocument {
                path: path.to_path_buf(),
            }),
        };
    }

    let pages_rendered = rendered.artifacts.len();
    let total_pages = rendered
        .artifacts
        .last()
        .map(|a| a.page_number)
        .unwrap_or(pages_rendered);

    // A mid-document render failure is carried as a non-fatal page failure;
    // the pages that did render are still worth extracting.
    let prior_failures: Vec<PageFailure> = rendered.aborted.into_iter().collect();

    // ── Batching ─────────────────────────────────────────────────────────
    let units = batch::plan_units(&rendered.artifacts, config.mode, config.text_batch_size);
    debug!("Planned {} units of work", units.len());

    // ── Processing + aggregation ─────────────────────────────────────────
    let mut summary =
        process_units(backend.as_ref(), &units, config, prior_failures, total_pages).await?;

    summary.stats.pages_rendered = pages_rendered;
    summary.stats.render_duration_ms = render_duration_ms;
    summary.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Extraction complete: {} records, {} failures, {}ms total",
        summary.records.len(),
        summary.failures.len(),
        summary.stats.total_duration_ms
    );

    Ok(summary)
}

/// Extract records from in-memory file bytes.
///
/// The bytes are written to a managed tempfile (magic-byte sniffing does not
/// need a file extension) and cleaned up automatically on return.
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionSummary, ExtractError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| ExtractError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| ExtractError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_path_buf();
    // `tmp` is dropped (and the file deleted) when extraction returns.
    extract_from_file(&path, config).await
}

/// Extract up to five image files concurrently.
///
/// Each file runs as an independent job with its own progress events; one
/// file's failure or empty result never cancels the others. Results are
/// flattened only after all jobs settle, in **submission order**, not
/// completion order.
pub async fn extract_files(
    paths: &[std::path::PathBuf],
    config: &ExtractionConfig,
) -> Vec<Result<ExtractionSummary, ExtractError>> {
    let parallelism = config.max_parallel_files.max(1);
    // `buffered` (not `buffer_unordered`) keeps output aligned with input
    // order even though completion is unordered.
    stream::iter(paths.iter().map(|p| extract_from_file(p, config)))
        .buffered(parallelism)
        .collect()
        .await
}

/// Drive the unit loop over pre-built units of work.
///
/// Exposed for callers (and tests) that already hold page artifacts —
/// everything from the extraction calls through aggregation happens here.
/// `prior_failures` lets the caller thread render-stage failures into the
/// final summary.
pub async fn process_units(
    backend: &dyn ExtractionBackend,
    units: &[WorkUnit],
    config: &ExtractionConfig,
    prior_failures: Vec<PageFailure>,
    total_pages: usize,
) -> Result<ExtractionSummary, ExtractError> {
    let extract_start = Instant::now();
    let total_units = units.len();
    let mut state = JobState::new(prior_failures);

    if let Some(ref cb) = config.progress_callback {
        cb.on_job_start(total_units);
    }

    for (i, unit) in units.iter().enumerate() {
        let current = i + 1;
        let label = phase_label(unit.first_page, unit.last_page, total_pages);
        if let Some(ref cb) = config.progress_callback {
            cb.on_unit_start(current, total_units, &label);
        }

        match backend.extract(unit, config.record_kind).await {
            Ok(response) => {
                let added = state.accumulate(&response, config);
                debug!(
                    "Unit {}/{}: {} records accumulated",
                    current, total_units, added
                );
                if let Some(ref cb) = config.progress_callback {
                    cb.on_unit_complete(current, total_units, added);
                }
            }
            Err(reason) if reason.is_fatal() => {
                warn!(
                    "Unit {}/{}: {} — aborting remaining units",
                    current, total_units, reason
                );
                if let Some(ref cb) = config.progress_callback {
                    cb.on_unit_failed(current, total_units, &reason.to_string());
                }
                state.record_failure(unit, reason);
                state.units_attempted = current;
                state.quota_hit = true;
                break;
            }
            Err(reason) => {
                warn!("Unit {}/{}: {} — skipping", current, total_units, reason);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_unit_failed(current, total_units, &reason.to_string());
                }
                state.record_failure(unit, reason);
            }
        }

        state.units_attempted = current;

        // The text path paces itself to stay under the service's implicit
        // rate limit. No delay after the final unit.
        if config.mode == ExtractionMode::TextBatched
            && config.batch_delay_ms > 0
            && current < total_units
        {
            sleep(Duration::from_millis(config.batch_delay_ms)).await;
        }
    }

    state.finish(config, total_units, extract_start.elapsed().as_millis() as u64)
}

// ── Internal job state ───────────────────────────────────────────────────

/// Transient accumulator owned exclusively by one job's unit loop.
struct JobState {
    questions: Vec<crate::record::NormalizedQuestion>,
    jurors: Vec<crate::record::NormalizedJuror>,
    failures: Vec<PageFailure>,
    /// Failures added by the unit loop itself (excludes render-stage ones).
    unit_failures: usize,
    units_attempted: usize,
    quota_hit: bool,
}

impl JobState {
    fn new(prior_failures: Vec<PageFailure>) -> Self {
        Self {
            questions: Vec::new(),
            jurors: Vec::new(),
            failures: prior_failures,
            unit_failures: 0,
            units_attempted: 0,
            quota_hit: false,
        }
    }

    /// Normalize one unit's response and append the survivors. Returns how
    /// many records were added.
    fn accumulate(&mut self, response: &serde_json::Value, config: &ExtractionConfig) -> usize {
        let candidates = normalize::candidate_records(response, config.record_kind);
        match config.record_kind {
            RecordKind::Question => {
                let mut batch = normalize::normalize_questions(candidates, config.tag_limit);
                let added = batch.len();
                self.questions.append(&mut batch);
                added
            }
            RecordKind::Juror => {
                let mut batch = normalize::normalize_jurors(candidates, self.jurors.len());
                let added = batch.len();
                self.jurors.append(&mut batch);
                added
            }
        }
    }

    fn record_failure(&mut self, unit: &WorkUnit, reason: FailureReason) {
        self.unit_failures += 1;
        self.failures.push(PageFailure {
            page_number: unit.first_page,
            reason,
        });
    }

    /// Aggregate and resolve the terminal outcome.
    fn finish(
        self,
        config: &ExtractionConfig,
        total_units: usize,
        extract_duration_ms: u64,
    ) -> Result<ExtractionSummary, ExtractError> {
        let records_normalized = self.questions.len() + self.jurors.len();
        let Aggregated {
            records,
            deduplicated,
        } = match config.record_kind {
            RecordKind::Question => aggregate::aggregate_questions(self.questions),
            RecordKind::Juror => aggregate::aggregate_jurors(self.jurors),
        };

        // Total failure: every attempted unit failed and nothing came out.
        // Distinct from "processed fine, nothing viable found".
        if !self.quota_hit
            && records.is_empty()
            && self.units_attempted > 0
            && self.unit_failures == self.units_attempted
        {
            let first_error = self
                .failures
                .first()
                .map(|f| f.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(ExtractError::AllUnitsFailed {
                total: self.units_attempted,
                first_error,
            });
        }

        let outcome = if self.quota_hit {
            JobOutcome::QuotaExhausted
        } else if records.is_empty() {
            JobOutcome::NoRecordsFound
        } else {
            JobOutcome::Complete
        };

        if let Some(ref cb) = config.progress_callback {
            cb.on_job_complete(total_units, records.len());
        }

        Ok(ExtractionSummary {
            records,
            failures: self.failures,
            outcome,
            stats: ExtractionStats {
                pages_rendered: 0, // filled by extract_from_file
                units_planned: total_units,
                units_processed: self.units_attempted,
                units_failed: self.unit_failures,
                records_normalized,
                records_deduplicated: deduplicated,
                total_duration_ms: 0,
                render_duration_ms: 0,
                extract_duration_ms,
            },
        })
    }
}

/// Resolve the extraction backend, most-specific first.
///
/// 1. **Pre-built backend** (`config.backend`) — used as-is; the injection
///    point for tests and for callers needing custom middleware.
/// 2. **Endpoint + credential** — credential from `config.api_key`, falling
///    back to `VOIRDIRE_API_KEY`; absence of both is the fatal
///    [`ExtractError::MissingCredential`], checked before any rendering.
fn resolve_backend(config: &ExtractionConfig) -> Result<Arc<dyn ExtractionBackend>, ExtractError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    let api_key = config
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .or_else(|| std::env::var("VOIRDIRE_API_KEY").ok().filter(|k| !k.is_empty()))
        .ok_or(ExtractError::MissingCredential)?;

    Ok(Arc::new(HttpExtractionBackend::new(
        &config.endpoint,
        api_key,
        config.api_timeout_secs,
    )?))
}
