//! Document rendering: PDF pages → image or text artifacts via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations, preventing the Tokio worker
//! threads from stalling during CPU-heavy rendering.
//!
//! ## Shared pdfium handle
//!
//! Binding to the pdfium shared library is expensive and process-wide. The
//! binding is initialised lazily on first use and reused for every subsequent
//! job in the session; concurrent first-use callers all observe the same
//! in-flight initialisation rather than triggering duplicate loads
//! (`once_cell` guarantees this).
//!
//! ## Partial output on mid-document failure
//!
//! A rasterisation failure on page k does not discard pages 1..k-1: the
//! renderer returns the artifacts it produced plus the failure, and the
//! orchestrator decides whether a shorter document is still worth processing.

use crate::config::{ExtractionConfig, ExtractionMode};
use crate::error::{ExtractError, FailureReason, PageFailure};
use crate::pipeline::encode;
use crate::pipeline::input::ValidatedInput;
use crate::pipeline::{ArtifactKind, RawPageArtifact};
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

static PDFIUM: OnceCell<Pdfium> = OnceCell::new();

/// The process-wide pdfium binding, initialised idempotently on first use.
fn shared_pdfium() -> Result<&'static Pdfium, ExtractError> {
    PDFIUM.get_or_try_init(|| {
        Pdfium::bind_to_system_library()
            .map(Pdfium::new)
            .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{e:?}")))
    })
}

/// What the renderer produced for one document.
#[derive(Debug)]
pub struct RenderOutput {
    /// Page artifacts in page order, 1-based, possibly shorter than the
    /// document when `aborted` is set.
    pub artifacts: Vec<RawPageArtifact>,
    /// A mid-document render failure, when one cut the sequence short.
    pub aborted: Option<PageFailure>,
}

/// Render a validated input into page artifacts.
///
/// Image files skip pdfium entirely and become a single page-1 artifact.
/// PDFs are rasterised (image mode) or text-extracted (text mode) page by
/// page under `spawn_blocking`.
pub async fn render_document(
    input: &ValidatedInput,
    config: &ExtractionConfig,
) -> Result<RenderOutput, ExtractError> {
    if input.kind.is_image() {
        let bytes = std::fs::read(&input.path).map_err(|e| ExtractError::Internal(format!(
            "failed to read image file: {e}"
        )))?;
        return Ok(RenderOutput {
            artifacts: vec![encode::encode_image_file(&bytes)],
            aborted: None,
        });
    }

    let path = input.path.clone();
    let mode = config.mode;
    let scale = config.render_scale;
    let max_pixels = config.max_rendered_pixels;

    tokio::task::spawn_blocking(move || render_pdf_blocking(&path, mode, scale, max_pixels))
        .await
        .map_err(|e| ExtractError::Internal(format!("Render task panicked: {e}")))?
}

/// Blocking implementation of PDF rendering.
fn render_pdf_blocking(
    pdf_path: &Path,
    mode: ExtractionMode,
    scale: f32,
    max_pixels: u32,
) -> Result<RenderOutput, ExtractError> {
    let pdfium = shared_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| ExtractError::UnreadableDocument {
            path: pdf_path.to_path_buf(),
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if total_pages == 0 {
        return Err(ExtractError::EmptyDocument {
            path: pdf_path.to_path_buf(),
        });
    }
    info!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(scale)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut artifacts = Vec::with_capacity(total_pages);

    for idx in 0..total_pages {
        let page_number = idx + 1;
        let rendered = match pages.get(idx as u16) {
            Ok(page) => match mode {
                ExtractionMode::ImageIndividual => render_page_image(&page, page_number, &render_config),
                ExtractionMode::TextBatched => extract_page_text(&page, page_number),
            },
            Err(e) => Err(format!("{e:?}")),
        };

        match rendered {
            Ok(artifact) => artifacts.push(artifact),
            Err(detail) => {
                // Keep what we have; the orchestrator decides whether a
                // shorter document is still worth extracting.
                warn!("Render failed on page {}: {}", page_number, detail);
                return Ok(RenderOutput {
                    artifacts,
                    aborted: Some(PageFailure {
                        page_number,
                        reason: FailureReason::RenderFailed(detail),
                    }),
                });
            }
        }
    }

    Ok(RenderOutput {
        artifacts,
        aborted: None,
    })
}

fn render_page_image(
    page: &PdfPage<'_>,
    page_number: usize,
    render_config: &PdfRenderConfig,
) -> Result<RawPageArtifact, String> {
    let bitmap = page
        .render_with_config(render_config)
        .map_err(|e| format!("{e:?}"))?;
    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page_number,
        image.width(),
        image.height()
    );
    encode::encode_page(page_number, &image).map_err(|e| format!("encoding failed: {e}"))
}

fn extract_page_text(page: &PdfPage<'_>, page_number: usize) -> Result<RawPageArtifact, String> {
    let text = page.text().map_err(|e| format!("{e:?}"))?.all();
    debug!("Extracted page {} → {} chars", page_number, text.len());
    Ok(RawPageArtifact {
        page_number,
        kind: ArtifactKind::Text,
        payload: text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::validate_input;
    use image::{Rgb, RgbImage};

    #[tokio::test]
    async fn image_file_renders_without_pdfium() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("juror.png");
        let img = RgbImage::from_pixel(8, 8, Rgb([200, 200, 200]));
        img.save(&path).unwrap();

        let input = validate_input(&path, 1024 * 1024).unwrap();
        let config = ExtractionConfig::default();
        let output = render_document(&input, &config).await.unwrap();

        assert_eq!(output.artifacts.len(), 1);
        assert_eq!(output.artifacts[0].page_number, 1);
        assert_eq!(output.artifacts[0].kind, ArtifactKind::Image);
        assert!(output.aborted.is_none());
    }
}
