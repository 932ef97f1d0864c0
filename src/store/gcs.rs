//! Google Cloud Storage download via the JSON API.
//!
//! `GET {endpoint}/storage/v1/b/{bucket}/o/{object}?alt=media` with the
//! object name encoded as a single path segment. Credentials are ambient: an
//! explicit bearer token, else whatever `gcloud` reports for application
//! default credentials, else anonymous access.

use anyhow::Context;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use super::{ByteStream, ObjectStore};
use crate::fetch::error::DownloadError;

pub struct GcsStore {
    client: Client,
    endpoint: Url,
    bucket: String,
    access_token: Option<String>,
}

impl std::fmt::Debug for GcsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcsStore")
            .field("endpoint", &self.endpoint.as_str())
            .field("bucket", &self.bucket)
            .field("authenticated", &self.access_token.is_some())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

impl GcsStore {
    pub fn new(endpoint: &str, bucket: &str, access_token: Option<String>) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid storage endpoint {:?}", endpoint))?;
        if endpoint.cannot_be_a_base() {
            anyhow::bail!("Storage endpoint {} cannot be used as a base URL", endpoint);
        }
        let client = Client::builder()
            .user_agent(concat!("imgdim-backfill/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint,
            bucket: bucket.to_string(),
            access_token,
        })
    }

    /// Media download URL for `remote_path`.
    pub fn object_url(&self, remote_path: &str) -> Result<Url, DownloadError> {
        if remote_path.is_empty() {
            return Err(DownloadError::InvalidPath(remote_path.to_string()));
        }
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| DownloadError::InvalidPath(remote_path.to_string()))?
            .pop_if_empty()
            .extend(["storage", "v1", "b", self.bucket.as_str(), "o", remote_path]);
        url.query_pairs_mut().append_pair("alt", "media");
        Ok(url)
    }
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ => body.trim().chars().take(200).collect(),
    }
}

#[async_trait::async_trait]
impl ObjectStore for GcsStore {
    async fn download(&self, remote_path: &str) -> Result<ByteStream, DownloadError> {
        let url = self.object_url(remote_path)?;
        let mut request = self.client.get(url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| DownloadError::Http {
            source,
            path: remote_path.to_string(),
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DownloadError::NotFound {
                bucket: self.bucket.clone(),
                path: remote_path.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DownloadError::HttpStatus {
                status: status.as_u16(),
                path: remote_path.to_string(),
                message: error_message(&body),
            });
        }

        tracing::debug!(
            object = remote_path,
            content_length = ?response.content_length(),
            "object response received"
        );

        let path = remote_path.to_string();
        let stream = response
            .bytes_stream()
            .map(move |chunk| {
                chunk.map_err(|source| DownloadError::Http {
                    source,
                    path: path.clone(),
                })
            })
            .boxed();
        Ok(stream)
    }

    fn describe(&self) -> String {
        format!("gs://{}", self.bucket)
    }
}

/// Find an access token for the storage API.
///
/// An explicit token wins. Otherwise ask the `gcloud` CLI for the
/// application-default credential. If neither is available, requests go out
/// unauthenticated, which works for public buckets and local emulators.
pub async fn resolve_access_token(explicit: Option<String>) -> Option<String> {
    if explicit.is_some() {
        return explicit;
    }

    let output = tokio::process::Command::new("gcloud")
        .args(["auth", "application-default", "print-access-token"])
        .stdin(std::process::Stdio::null())
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() => {
            let token = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if token.is_empty() {
                tracing::warn!("gcloud returned an empty access token; using anonymous access");
                None
            } else {
                tracing::debug!("Using application-default credentials from gcloud");
                Some(token)
            }
        }
        Ok(out) => {
            tracing::warn!(
                "gcloud could not provide an access token ({}); using anonymous access. \
                 Run `gcloud auth application-default login` or set GOOGLE_OAUTH_ACCESS_TOKEN.",
                String::from_utf8_lossy(&out.stderr).trim()
            );
            None
        }
        Err(e) => {
            tracing::warn!("gcloud not available ({}); using anonymous access", e);
            None
        }
    }
}
