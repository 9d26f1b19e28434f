//! # voirdire-extract
//!
//! AI-assisted extraction of voir dire questions and juror records from
//! jury-pool PDFs and images.
//!
//! ## Why this crate?
//!
//! Jury-pool paperwork arrives as scanned questionnaires, court-issued pool
//! sheets, and attorney-drafted question lists — layouts vary by county and
//! plain text extraction produces garbage. This crate rasterises each page
//! (or pulls its text layer), ships it to an AI extraction service, and then
//! does the part the service cannot be trusted with: coercing its
//! loosely-typed output into strict records with guaranteed defaults, so
//! downstream case-management code never sees a missing field.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / image
//!  │
//!  ├─ 1. Input      magic-byte sniffing, 10 MB ceiling
//!  ├─ 2. Render     rasterise or text-extract pages via pdfium (spawn_blocking)
//!  ├─ 3. Encode     PNG → base64 page artifacts
//!  ├─ 4. Batch      one image per unit, or 3-page text batches
//!  ├─ 5. Extract    sequential calls to the extraction service (429 = stop)
//!  ├─ 6. Normalize  untrusted JSON → NormalizedQuestion / NormalizedJuror
//!  └─ 7. Aggregate  dedup questions by text, keep page order, report failures
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use voirdire_extract::{extract_from_file, ExtractionConfig, RecordKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credential read from VOIRDIRE_API_KEY
//!     let config = ExtractionConfig::builder()
//!         .record_kind(RecordKind::Question)
//!         .endpoint("https://api.example.com/v1/extract")
//!         .build()?;
//!     let summary = extract_from_file("pool-questionnaire.pdf", &config).await?;
//!     println!("{} records extracted", summary.records.len());
//!     for failure in &summary.failures {
//!         eprintln!("warning: {failure}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Partial results
//!
//! One bad page never loses the document: per-page failures are collected in
//! the summary, and even a mid-job quota abort returns everything extracted
//! up to that point (`JobOutcome::QuotaExhausted`). Only precondition
//! failures and total failure surface as `Err`.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `vdx` binary (clap + anyhow + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, ExtractionMode, MAX_FILE_BYTES, MAX_PARALLEL_FILES};
pub use error::{ExtractError, FailureReason, PageFailure};
pub use pipeline::extract::{ExtractionBackend, HttpExtractionBackend};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{
    Availability, BiasStatus, ExtractionStats, ExtractionSummary, Gender, JobOutcome,
    NormalizedJuror, NormalizedQuestion, NormalizedRecord, QuestionType, RecordKind,
};
pub use run::{extract_files, extract_from_bytes, extract_from_file, process_units};
