//! Error types for the voirdire-extract library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`] — **Fatal**: the extraction job cannot proceed at all
//!   (missing credential, unreadable document, oversized file) or must stop
//!   early (quota exhaustion). Returned as `Err(ExtractError)` from the
//!   top-level `extract_*` functions, or recorded as the terminal outcome of
//!   a job that keeps its partial results.
//!
//! * [`PageFailure`] — **Non-fatal**: a single page or text batch failed
//!   (transient network error, malformed AI response) but every other unit is
//!   fine. Accumulated inside [`crate::record::ExtractionSummary`] so callers
//!   can inspect partial success rather than losing the whole document to one
//!   bad page.
//!
//! The separation lets callers decide their own tolerance: surface a warning
//! with a failure count, retry failed pages as a fresh job, or ignore them.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the voirdire-extract library.
///
/// Unit-level failures use [`PageFailure`] and are stored in
/// [`crate::record::ExtractionSummary`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Precondition errors ───────────────────────────────────────────────
    /// No extraction-service credential was configured or found in the
    /// environment. Checked before any rendering begins.
    #[error(
        "No extraction API credential configured.\n\
         Set VOIRDIRE_API_KEY or provide one via ExtractionConfig::builder().api_key(..)."
    )]
    MissingCredential,

    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The file is neither a PDF nor a supported image format.
    #[error("Unsupported file type for '{path}'\nFirst bytes: {magic:?}\nExpected a PDF, PNG, or JPEG.")]
    UnsupportedFileType { path: PathBuf, magic: [u8; 4] },

    /// The file exceeds the upload size ceiling.
    #[error("File '{path}' is {size} bytes, over the {limit}-byte limit")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    // ── Document errors ───────────────────────────────────────────────────
    /// The document opened but contains zero pages.
    #[error("Document '{path}' has no pages to extract")]
    EmptyDocument { path: PathBuf },

    /// The document is corrupt or password-protected and cannot be opened.
    #[error("Cannot read document '{path}': {detail}")]
    UnreadableDocument { path: PathBuf, detail: String },

    // ── Extraction-service errors ─────────────────────────────────────────
    /// The extraction service returned HTTP 429. Fatal for the current job:
    /// remaining units are never attempted, but records already accumulated
    /// are kept and returned.
    #[error("Extraction quota exhausted after {units_done}/{units_total} units")]
    QuotaExhausted {
        units_done: usize,
        units_total: usize,
    },

    /// Every unit failed and no records were produced.
    #[error("All {total} units failed; no records extracted.\nFirst error: {first_error}")]
    AllUnitsFailed { total: usize, first_error: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
         Install pdfium or set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a single page or text batch failed.
///
/// The distinction matters at the orchestrator's single dispatch point:
/// [`FailureReason::QuotaExhausted`] stops the job (no further units are
/// attempted), everything else is recorded and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "detail")]
pub enum FailureReason {
    /// The extraction service returned HTTP 429. Stops the job.
    #[error("extraction quota exhausted")]
    QuotaExhausted,

    /// Network-level failure reaching the extraction service.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The service answered with a non-success status other than 429.
    #[error("service returned HTTP {0}")]
    ServiceError(u16),

    /// The response body was not the expected JSON shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The page could not be rasterised or its text extracted.
    #[error("render failed: {0}")]
    RenderFailed(String),
}

impl FailureReason {
    /// True when this failure must abort the remaining units of the job.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FailureReason::QuotaExhausted)
    }
}

/// A non-fatal failure for a single unit of work.
///
/// `page_number` is the first page of the failed unit (units span one page in
/// image mode, up to three in text mode). The overall job continues unless
/// the reason is fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("page {page_number}: {reason}")]
pub struct PageFailure {
    /// 1-based page number where the failure occurred.
    pub page_number: usize,
    /// What went wrong, and whether it aborts the job.
    pub reason: FailureReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_failure_is_fatal() {
        assert!(FailureReason::QuotaExhausted.is_fatal());
        assert!(!FailureReason::RequestFailed("timeout".into()).is_fatal());
        assert!(!FailureReason::ServiceError(500).is_fatal());
        assert!(!FailureReason::MalformedResponse("not json".into()).is_fatal());
        assert!(!FailureReason::RenderFailed("bad page".into()).is_fatal());
    }

    #[test]
    fn page_failure_display() {
        let f = PageFailure {
            page_number: 3,
            reason: FailureReason::ServiceError(503),
        };
        let msg = f.to_string();
        assert!(msg.contains("page 3"), "got: {msg}");
        assert!(msg.contains("503"), "got: {msg}");
    }

    #[test]
    fn quota_exhausted_display() {
        let e = ExtractError::QuotaExhausted {
            units_done: 1,
            units_total: 5,
        };
        assert!(e.to_string().contains("1/5"));
    }

    #[test]
    fn file_too_large_display() {
        let e = ExtractError::FileTooLarge {
            path: PathBuf::from("pool.pdf"),
            size: 12_000_000,
            limit: 10_485_760,
        };
        let msg = e.to_string();
        assert!(msg.contains("12000000"));
        assert!(msg.contains("10485760"));
    }

    #[test]
    fn failure_reason_serde_round_trip() {
        let f = PageFailure {
            page_number: 2,
            reason: FailureReason::MalformedResponse("unexpected EOF".into()),
        };
        let json = serde_json::to_string(&f).expect("serialize");
        assert!(json.contains("\"pageNumber\":2"), "got: {json}");
        let back: PageFailure = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, f);
    }
}
