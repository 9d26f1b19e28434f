//! Pre-flight input checks: existence, readability, type sniffing, size ceiling.
//!
//! ## Why sniff magic bytes?
//!
//! Browser uploads and shell globs both lie: a renamed `.docx` arrives with a
//! `.pdf` extension, and pdfium's failure mode on garbage input is an opaque
//! crash deep in C++. Reading the first four bytes up front turns that into a
//! meaningful [`ExtractError::UnsupportedFileType`] before any rendering
//! starts. The size ceiling is likewise checked here — rejecting a 40 MB scan
//! before rasterising it is the difference between an instant error and a
//! minute of wasted CPU.

use crate::error::ExtractError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File type as determined by magic-byte sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFileKind {
    Pdf,
    Png,
    Jpeg,
}

impl InputFileKind {
    /// MIME type string for the extraction-service request.
    pub fn mime(&self) -> &'static str {
        match self {
            InputFileKind::Pdf => "application/pdf",
            InputFileKind::Png => "image/png",
            InputFileKind::Jpeg => "image/jpeg",
        }
    }

    /// True for the single-page image formats.
    pub fn is_image(&self) -> bool {
        matches!(self, InputFileKind::Png | InputFileKind::Jpeg)
    }
}

/// A validated input file, ready for the renderer.
#[derive(Debug, Clone)]
pub struct ValidatedInput {
    pub path: PathBuf,
    pub kind: InputFileKind,
    pub size: u64,
}

/// Classify a file's leading bytes.
///
/// Returns `None` when the bytes match neither PDF nor a supported image.
pub fn sniff_kind(magic: &[u8]) -> Option<InputFileKind> {
    if magic.starts_with(b"%PDF") {
        Some(InputFileKind::Pdf)
    } else if magic.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some(InputFileKind::Png)
    } else if magic.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(InputFileKind::Jpeg)
    } else {
        None
    }
}

/// Validate an input file before any rendering begins.
///
/// Checks, in order: existence, read permission, size ceiling, magic bytes.
/// These are pre-flight checks belonging to the orchestrator's `Idle →
/// Rendering` transition, not to the renderer itself.
pub fn validate_input(path: &Path, max_bytes: u64) -> Result<ValidatedInput, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(ExtractError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let size = file
        .metadata()
        .map_err(|e| ExtractError::Internal(format!("stat failed: {e}")))?
        .len();
    if size > max_bytes {
        return Err(ExtractError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            limit: max_bytes,
        });
    }

    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() {
        // Shorter than four bytes; cannot be any supported format.
        return Err(ExtractError::UnsupportedFileType {
            path: path.to_path_buf(),
            magic,
        });
    }

    let kind = sniff_kind(&magic).ok_or(ExtractError::UnsupportedFileType {
        path: path.to_path_buf(),
        magic,
    })?;

    debug!("Validated input {}: {} ({} bytes)", path.display(), kind.mime(), size);

    Ok(ValidatedInput {
        path: path.to_path_buf(),
        kind,
        size,
    })
}
