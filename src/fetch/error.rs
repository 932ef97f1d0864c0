use std::path::PathBuf;

use thiserror::Error;

/// Typed object-store download errors.
///
/// `is_retryable()` separates transient transport failures (rate limits,
/// server errors, dropped connections) from permanent ones (missing objects,
/// bad credentials, disk failures) so the retry helper can abort early.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error {status} downloading {path}: {message}")]
    HttpStatus {
        status: u16,
        path: String,
        message: String,
    },

    #[error("Object {path} not found in bucket {bucket}")]
    NotFound { bucket: String, path: String },

    #[error("HTTP error downloading {path}: {source}")]
    Http {
        source: reqwest::Error,
        path: String,
    },

    #[error("Disk error writing {path}: {source}")]
    Disk {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid object path {0:?}")]
    InvalidPath(String),

    #[error("Staged name {0:?} would leave the staging directory")]
    UnsafeStagedName(String),
}

impl DownloadError {
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            DownloadError::Http { .. } => true,
            DownloadError::NotFound { .. } => false,
            DownloadError::Disk { .. } => false,
            DownloadError::InvalidPath(_) => false,
            DownloadError::UnsafeStagedName(_) => false,
        }
    }
}

/// A download failure attributed to the manifest record that caused it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to create staging directory {path}: {source}")]
    StagingDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Download {index}/{total} failed (id {id}, object {remote_path}): {source}")]
    Record {
        index: usize,
        total: usize,
        id: String,
        remote_path: String,
        #[source]
        source: DownloadError,
    },
}
