//! Page batching: partition ordered page artifacts into units of work.
//!
//! ## Why the asymmetry between modes?
//!
//! Text batches amortise request overhead — three pages of plain text fit
//! comfortably in one extraction call. Images are never batched: a vision
//! call is already page-scoped and size-bounded, and multi-image batching
//! would muddy per-page failure attribution.

use crate::config::ExtractionMode;
use crate::pipeline::{ArtifactKind, RawPageArtifact};

/// Marker inserted between pages in a text batch so the extraction service
/// can attribute records to pages within the batch.
pub const PAGE_BOUNDARY_MARKER: &str = "\n\n=== PAGE {n} ===\n\n";

/// Payload of one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitPayload {
    /// One base64-encoded page image.
    Image(String),
    /// One-to-N consecutive text pages joined with page-boundary markers.
    Text(String),
}

/// One extraction-service call's worth of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    /// First 1-based page covered by this unit.
    pub first_page: usize,
    /// Last 1-based page covered (equals `first_page` for image units).
    pub last_page: usize,
    pub payload: UnitPayload,
}

impl WorkUnit {
    /// Number of pages this unit spans.
    pub fn page_span(&self) -> usize {
        self.last_page - self.first_page + 1
    }
}

/// Partition page artifacts into ordered units of work.
///
/// Works on whatever sequence it receives: a renderer that failed
/// mid-document still yields a valid (shorter) unit sequence for the pages
/// that did render.
pub fn plan_units(
    artifacts: &[RawPageArtifact],
    mode: ExtractionMode,
    text_batch_size: usize,
) -> Vec<WorkUnit> {
    match mode {
        ExtractionMode::ImageIndividual => artifacts
            .iter()
            .filter(|a| a.kind == ArtifactKind::Image)
            .map(|a| WorkUnit {
                first_page: a.page_number,
                last_page: a.page_number,
                payload: UnitPayload::Image(a.payload.clone()),
            })
            .collect(),
        ExtractionMode::TextBatched => artifacts
            .chunks(text_batch_size.max(1))
            .map(|chunk| {
                let mut combined = String::new();
                for artifact in chunk {
                    combined.push_str(
                        &PAGE_BOUNDARY_MARKER.replace("{n}", &artifact.page_number.to_string()),
                    );
                    combined.push_str(&artifact.payload);
                }
                WorkUnit {
                    first_page: chunk[0].page_number,
                    last_page: chunk[chunk.len() - 1].page_number,
                    payload: UnitPayload::Text(combined),
                }
            })
            .collect(),
    }
}
