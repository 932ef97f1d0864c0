//! In-memory object store for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;
use futures_util::StreamExt;

use super::{ByteStream, ObjectStore};
use crate::fetch::error::DownloadError;

#[derive(Default)]
pub struct MemoryStore {
    objects: HashMap<String, Bytes>,
    failures: HashMap<String, u16>,
    requests: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, path: &str, data: impl Into<Bytes>) -> Self {
        self.objects.insert(path.to_string(), data.into());
        self
    }

    /// Make every request for `path` fail with the given HTTP status.
    pub fn with_failure(mut self, path: &str, status: u16) -> Self {
        self.failures.insert(path.to_string(), status);
        self
    }

    /// Paths requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryStore {
    async fn download(&self, remote_path: &str) -> Result<ByteStream, DownloadError> {
        self.requests.lock().unwrap().push(remote_path.to_string());

        if let Some(status) = self.failures.get(remote_path) {
            return Err(DownloadError::HttpStatus {
                status: *status,
                path: remote_path.to_string(),
                message: "injected failure".to_string(),
            });
        }
        let data = self
            .objects
            .get(remote_path)
            .cloned()
            .ok_or_else(|| DownloadError::NotFound {
                bucket: "memory".to_string(),
                path: remote_path.to_string(),
            })?;

        // Two chunks so writers see a multi-chunk body.
        let mid = data.len() / 2;
        let chunks = vec![Ok(data.slice(..mid)), Ok(data.slice(mid..))];
        Ok(futures_util::stream::iter(chunks).boxed())
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }
}
