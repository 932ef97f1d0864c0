//! Object store capability.
//!
//! The fetcher only needs "give me the bytes of this object", so the store is
//! a small trait. [`GcsStore`] talks to Google Cloud Storage; tests swap in an
//! in-memory store.

pub mod gcs;
#[cfg(test)]
pub mod memory;

use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::fetch::error::DownloadError;

pub use gcs::GcsStore;

/// Body of a downloaded object, delivered in chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes, DownloadError>>;

#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Start downloading the object at `remote_path`.
    ///
    /// Errors that are known before the body starts (missing object, auth,
    /// server errors) are returned here; transport errors mid-body surface
    /// through the stream.
    async fn download(&self, remote_path: &str) -> Result<ByteStream, DownloadError>;

    /// Human-readable location for log lines, e.g. `gs://bucket`.
    fn describe(&self) -> String;
}
