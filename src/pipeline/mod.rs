//! Pipeline stages for jury-pool document extraction.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. point the extraction client at a different
//! service) without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ batch ──▶ extract ──▶ normalize ──▶ aggregate
//! (sniff)   (pdfium)   (base64)  (units)   (HTTP/AI)   (coercion)    (dedup)
//! ```
//!
//! 1. [`input`]     — pre-flight checks: magic-byte sniffing, size ceiling
//! 2. [`render`]    — rasterise or text-extract each page; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`]    — PNG-encode and base64-wrap each rendered page
//! 4. [`batch`]     — partition page artifacts into units of work
//! 5. [`extract`]   — call the AI extraction service; the only stage with
//!    network I/O
//! 6. [`normalize`] — coerce untrusted candidate JSON into strict records
//! 7. [`aggregate`] — dedup questions, concatenate jurors, in page order

pub mod aggregate;
pub mod batch;
pub mod encode;
pub mod extract;
pub mod input;
pub mod normalize;
pub mod render;

use serde::{Deserialize, Serialize};

/// What kind of payload a page artifact carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Base64-encoded PNG raster of the page.
    Image,
    /// Plain text extracted from the page's text layer.
    Text,
}

/// One unit of extractable content for a single page.
///
/// Produced by the renderer, consumed exactly once by the batcher/extraction
/// client, never persisted beyond the pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPageArtifact {
    /// 1-based page number, unique within the document.
    pub page_number: usize,
    pub kind: ArtifactKind,
    /// Base64 image data or extracted text, depending on `kind`.
    pub payload: String,
}
