//! Dimension extraction for staged files.
//!
//! Only the image header is read: `image::ImageReader::into_dimensions`
//! stops before any pixel data is decoded. Anything that cannot be read as an
//! image is recorded with the sentinel pair `(-1, -1)` instead of failing.

use std::io::BufReader;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::fetch::file::is_part_file;
use crate::types::LeadingEntryPolicy;

/// Pixel size of an image, or the `(-1, -1)` sentinel for unreadable files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: i64,
    pub height: i64,
}

impl Dimensions {
    pub const SENTINEL: Dimensions = Dimensions {
        width: -1,
        height: -1,
    };

    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionResult {
    pub id: String,
    pub dimensions: Dimensions,
}

/// Why a staged file could not be measured.
#[derive(Debug, Error)]
pub enum DecodeFailure {
    #[error("cannot open {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot read image header of {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("decode task for {path} failed: {source}")]
    Task {
        path: PathBuf,
        source: tokio::task::JoinError,
    },
}

/// Outcome of inspecting one staged entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Extracted(DimensionResult),
    /// The file name yields an empty id (e.g. `.DS_Store`); no output is
    /// produced for it.
    InvalidId { path: PathBuf },
}

/// List the staging directory in filesystem enumeration order.
///
/// Only regular files count; sub-directories and `.part` leftovers from an
/// interrupted download are not entries. With
/// [`LeadingEntryPolicy::SkipFirst`] the first listed entry is dropped.
pub async fn scan_staging(
    dir: &Path,
    policy: LeadingEntryPolicy,
) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        if is_part_file(&path) {
            tracing::debug!(path = %path.display(), "ignoring partial download");
            continue;
        }
        entries.push(path);
    }

    if policy == LeadingEntryPolicy::SkipFirst && !entries.is_empty() {
        let skipped = entries.remove(0);
        tracing::info!(
            "Skipping first staged entry {} (--skip-first-entry)",
            skipped.display()
        );
    }
    Ok(entries)
}

/// Record id of a staged file: its name without the final `.<extension>`.
///
/// Returns `None` when that prefix is empty.
pub fn derive_id(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    let id = name.rsplit_once('.').map_or(&*name, |(stem, _)| stem);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Read width and height from the file header. The format is sniffed from
/// the content, falling back to the extension.
pub fn read_dimensions(path: &Path) -> Result<Dimensions, DecodeFailure> {
    let io_error = |source| DecodeFailure::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::open(path).map_err(io_error)?;
    let mut reader = image::ImageReader::new(BufReader::new(file));
    if let Some(format) = path
        .extension()
        .and_then(|ext| image::ImageFormat::from_extension(ext))
    {
        reader.set_format(format);
    }
    let (width, height) = reader
        .with_guessed_format()
        .map_err(io_error)?
        .into_dimensions()
        .map_err(|source| DecodeFailure::Image {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Dimensions {
        width: i64::from(width),
        height: i64::from(height),
    })
}

/// Header read on the blocking pool, awaited before returning.
pub async fn read_dimensions_blocking(path: &Path) -> Result<Dimensions, DecodeFailure> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || read_dimensions(&owned))
        .await
        .map_err(|source| DecodeFailure::Task {
            path: path.to_path_buf(),
            source,
        })?
}

/// Inspect one staged entry. Decode failures become the sentinel pair.
pub async fn extract(path: &Path) -> Extraction {
    let Some(id) = derive_id(path) else {
        return Extraction::InvalidId {
            path: path.to_path_buf(),
        };
    };

    let dimensions = match read_dimensions_blocking(path).await {
        Ok(d) => d,
        Err(e) => {
            tracing::debug!("{}; recording sentinel dimensions", e);
            Dimensions::SENTINEL
        }
    };

    Extraction::Extracted(DimensionResult { id, dimensions })
}
