//! Configuration types for an extraction job.
//!
//! All job behaviour is controlled through [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across jobs, serialise them for logging, and diff
//! two runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::ExtractError;
use crate::pipeline::extract::ExtractionBackend;
use crate::progress::ProgressCallback;
use crate::record::RecordKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Upload size ceiling for the question-extraction flow: 10 MB.
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Hard cap on concurrently processed image files.
pub const MAX_PARALLEL_FILES: usize = 5;

/// Which extraction pathway a job runs.
///
/// The two pathways are deliberately kept as separate configurations rather
/// than unified: the text path trusts pdfium's pagination and amortises
/// request overhead with 3-page batches, while the vision path keeps one
/// image per call so every failure attributes to exactly one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMode {
    /// Rasterise each page and send one image per extraction call.
    #[default]
    ImageIndividual,
    /// Extract the text layer and send fixed-size page batches.
    TextBatched,
}

/// Configuration for one extraction job (or one parallel batch of image files).
///
/// Built via [`ExtractionConfig::builder()`] or [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use voirdire_extract::{ExtractionConfig, ExtractionMode, RecordKind};
///
/// let config = ExtractionConfig::builder()
///     .mode(ExtractionMode::TextBatched)
///     .record_kind(RecordKind::Juror)
///     .endpoint("https://api.example.com/v1/extract")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Extraction pathway. Default: [`ExtractionMode::ImageIndividual`].
    pub mode: ExtractionMode,

    /// Target record schema. Default: [`RecordKind::Question`].
    pub record_kind: RecordKind,

    /// Extraction-service URL. Default: `http://localhost:3000/api/ai/extract`.
    pub endpoint: String,

    /// Extraction-service credential. When `None`, `VOIRDIRE_API_KEY` is read
    /// at job start; absence of both is a fatal precondition failure.
    pub api_key: Option<String>,

    /// Pre-constructed backend. Takes precedence over `endpoint`/`api_key`.
    /// The main injection point for tests.
    pub backend: Option<Arc<dyn ExtractionBackend>>,

    /// Page upscaling factor applied when rasterising. Range: 1.5–4.0. Default: 2.0.
    ///
    /// Below 1.5× the vision service starts misreading small print on dense
    /// pool sheets; above 4× image payloads blow past request-size limits
    /// without improving accuracy.
    pub render_scale: f32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// A safety cap independent of scale. Oversized court exhibits could
    /// otherwise produce images that exhaust memory or the service's upload
    /// limit; this caps either dimension, scaling the other proportionally.
    pub max_rendered_pixels: u32,

    /// Pages per unit on the text path. Default: 3.
    ///
    /// Three pages amortises request overhead while keeping each batch small
    /// enough that a single failure loses little and the service's context
    /// window is never at risk. The image path ignores this (always 1).
    pub text_batch_size: usize,

    /// Delay between text batches in milliseconds. Default: 1000.
    ///
    /// The extraction endpoint rate-limits bursts; a fixed one-second gap
    /// between batches keeps sequential jobs under its implicit ceiling.
    /// Not applied on the image path or after the final unit.
    pub batch_delay_ms: u64,

    /// Tag ceiling for normalized questions. Range: 1–5. Default: 3.
    ///
    /// Extraction flows cap at 3; the manual-entry flow elsewhere permits 5.
    /// This is a caller-chosen ceiling, not a universal constant.
    pub tag_limit: usize,

    /// Input file size ceiling in bytes. Default: [`MAX_FILE_BYTES`] (10 MB).
    pub max_file_bytes: u64,

    /// Concurrent image files in parallel mode. Range: 1–5. Default: 5.
    pub max_parallel_files: usize,

    /// Per-extraction-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Optional per-unit progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::default(),
            record_kind: RecordKind::Question,
            endpoint: "http://localhost:3000/api/ai/extract".to_string(),
            api_key: None,
            backend: None,
            render_scale: 2.0,
            max_rendered_pixels: 2000,
            text_batch_size: 3,
            batch_delay_ms: 1000,
            tag_limit: 3,
            max_file_bytes: MAX_FILE_BYTES,
            max_parallel_files: MAX_PARALLEL_FILES,
            api_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("mode", &self.mode)
            .field("record_kind", &self.record_kind)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("backend", &self.backend.as_ref().map(|_| "<dyn ExtractionBackend>"))
            .field("render_scale", &self.render_scale)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("text_batch_size", &self.text_batch_size)
            .field("batch_delay_ms", &self.batch_delay_ms)
            .field("tag_limit", &self.tag_limit)
            .field("max_file_bytes", &self.max_file_bytes)
            .field("max_parallel_files", &self.max_parallel_files)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn mode(mut self, mode: ExtractionMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn record_kind(mut self, kind: RecordKind) -> Self {
        self.config.record_kind = kind;
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn backend(mut self, backend: Arc<dyn ExtractionBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale.clamp(1.5, 4.0);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn text_batch_size(mut self, pages: usize) -> Self {
        self.config.text_batch_size = pages.max(1);
        self
    }

    pub fn batch_delay_ms(mut self, ms: u64) -> Self {
        self.config.batch_delay_ms = ms;
        self
    }

    pub fn tag_limit(mut self, limit: usize) -> Self {
        self.config.tag_limit = limit.clamp(1, 5);
        self
    }

    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_bytes = bytes;
        self
    }

    pub fn max_parallel_files(mut self, n: usize) -> Self {
        self.config.max_parallel_files = n.clamp(1, MAX_PARALLEL_FILES);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.endpoint.is_empty() && c.backend.is_none() {
            return Err(ExtractError::InvalidConfig(
                "Extraction endpoint must not be empty".into(),
            ));
        }
        if !(1.5..=4.0).contains(&c.render_scale) {
            return Err(ExtractError::InvalidConfig(format!(
                "Render scale must be 1.5–4.0, got {}",
                c.render_scale
            )));
        }
        if c.text_batch_size == 0 {
            return Err(ExtractError::InvalidConfig(
                "Text batch size must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
