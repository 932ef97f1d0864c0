//! Object fetcher: downloads every manifest record into the staging
//! directory, strictly one at a time and in manifest order.
//!
//! The first record that cannot be downloaded aborts the whole run. Records
//! fetched before the failure stay on disk but nothing is checkpointed, so a
//! rerun downloads everything again.

pub mod error;
pub mod file;

use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use crate::manifest::ManifestRecord;
use crate::progress::Progress;
use crate::retry::{self, RetryAction, RetryConfig};
use crate::store::ObjectStore;

use error::{DownloadError, FetchError};

/// Subset of the run configuration the fetcher needs.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub staging_dir: PathBuf,
    pub retry: RetryConfig,
    pub no_progress_bar: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchSummary {
    pub downloaded: usize,
    pub bytes: u64,
}

/// Local path a record is staged at: `<staging_dir>/<id>.<extension>`.
///
/// The staged name must be a single plain file name. Ids that are absolute,
/// contain a separator, or resolve to `.`/`..` are rejected so nothing is
/// written outside the staging directory.
pub fn staged_path(
    staging_dir: &Path,
    record: &ManifestRecord,
) -> Result<PathBuf, DownloadError> {
    let name = record.staged_name();
    let mut components = Path::new(&name).components();
    let single_file_name = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_file_name || name.contains(['/', '\\']) {
        return Err(DownloadError::UnsafeStagedName(name));
    }
    Ok(staging_dir.join(name))
}

/// Download one object, retrying transient failures per `retry_config`.
async fn fetch_one(
    store: &dyn ObjectStore,
    remote_path: &str,
    destination: &Path,
    retry_config: &RetryConfig,
) -> Result<u64, DownloadError> {
    retry::retry_with_backoff(
        retry_config,
        remote_path,
        |e: &DownloadError| {
            if e.is_retryable() {
                RetryAction::Retry
            } else {
                RetryAction::Abort
            }
        },
        || async {
            let stream = store.download(remote_path).await?;
            file::write_stream(stream, destination).await
        },
    )
    .await
}

/// Fetch every record sequentially. Each download, including its write and
/// rename, finishes before the next one is requested.
pub async fn fetch_all(
    store: &dyn ObjectStore,
    records: &[ManifestRecord],
    options: &FetchOptions,
) -> Result<FetchSummary, FetchError> {
    tokio::fs::create_dir_all(&options.staging_dir)
        .await
        .map_err(|source| FetchError::StagingDir {
            path: options.staging_dir.clone(),
            source,
        })?;

    let started = Instant::now();
    let total = records.len();
    let progress = Progress::new(options.no_progress_bar, total as u64);
    let mut summary = FetchSummary::default();

    for (i, record) in records.iter().enumerate() {
        let fetched = match staged_path(&options.staging_dir, record) {
            Ok(destination) => {
                tracing::debug!(
                    id = %record.id,
                    object = %record.remote_path,
                    path = %destination.display(),
                    "downloading",
                );
                fetch_one(store, &record.remote_path, &destination, &options.retry).await
            }
            Err(e) => Err(e),
        };

        let bytes = match fetched {
            Ok(bytes) => bytes,
            Err(source) => {
                progress.abandon();
                return Err(FetchError::Record {
                    index: i + 1,
                    total,
                    id: record.id.clone(),
                    remote_path: record.remote_path.clone(),
                    source,
                });
            }
        };

        summary.downloaded += 1;
        summary.bytes += bytes;
        progress.advance_to((i + 1) as u64);
    }

    progress.finish();
    tracing::info!(
        "Downloaded {} objects ({} bytes) from {} in {:.1}s",
        summary.downloaded,
        summary.bytes,
        store.describe(),
        started.elapsed().as_secs_f64()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn record(id: &str, remote_path: &str, extension: &str) -> ManifestRecord {
        ManifestRecord {
            id: id.into(),
            remote_path: remote_path.into(),
            extension: extension.into(),
        }
    }

    fn options(staging_dir: &Path) -> FetchOptions {
        FetchOptions {
            staging_dir: staging_dir.to_path_buf(),
            retry: RetryConfig {
                max_retries: 0,
                base_delay_secs: 0,
                max_delay_secs: 0,
            },
            no_progress_bar: true,
        }
    }

    fn staged_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_staged_path() {
        assert_eq!(
            staged_path(Path::new("tmp"), &record("17", "images/17.webp", "webp")).unwrap(),
            PathBuf::from("tmp/17.webp")
        );
    }

    #[test]
    fn test_staged_path_rejects_names_leaving_staging() {
        for (id, ext) in [
            ("/var/tmp/victim", "jpg"),
            ("../1", "jpg"),
            ("a/b", "png"),
            ("a\\b", "png"),
            ("1", "jpg/../../x"),
            ("", ""),
        ] {
            assert!(
                matches!(
                    staged_path(Path::new("tmp"), &record(id, "images/1.jpg", ext)),
                    Err(DownloadError::UnsafeStagedName(_))
                ),
                "{id:?} + {ext:?} accepted"
            );
        }
    }

    #[test]
    fn test_staged_path_keeps_dotted_ids() {
        assert_eq!(
            staged_path(Path::new("tmp"), &record("..", "images/1.jpg", "jpg")).unwrap(),
            PathBuf::from("tmp/...jpg")
        );
        assert_eq!(
            staged_path(Path::new("tmp"), &record("v1.2", "images/1.jpg", "jpg")).unwrap(),
            PathBuf::from("tmp/v1.2.jpg")
        );
    }

    #[tokio::test]
    async fn test_absolute_id_aborts_without_writing_outside_staging() {
        let dir = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let target = elsewhere.path().join("victim");
        let staging = dir.path().join("tmp");
        let store = MemoryStore::new()
            .with_object("images/1.jpg", &b"1"[..])
            .with_object("images/2.jpg", &b"2"[..]);
        let records = vec![
            record("1", "images/1.jpg", "jpg"),
            record(&target.to_string_lossy(), "images/2.jpg", "jpg"),
        ];

        let err = fetch_all(&store, &records, &options(&staging))
            .await
            .unwrap_err();

        match err {
            FetchError::Record { index, source, .. } => {
                assert_eq!(index, 2);
                assert!(matches!(source, DownloadError::UnsafeStagedName(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.requests(), vec!["images/1.jpg"]);
        assert!(!elsewhere.path().join("victim.jpg").exists());
        assert_eq!(staged_names(&staging), vec!["1.jpg"]);
    }

    #[tokio::test]
    async fn test_every_record_staged_by_id_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("tmp");
        let store = MemoryStore::new()
            .with_object("images/a.jpg", &b"aaaa"[..])
            .with_object("images/b.png", &b"bb"[..])
            .with_object("other/c", &b"c"[..]);
        let records = vec![
            record("1", "images/a.jpg", "jpg"),
            record("2", "images/b.png", "png"),
            record("3", "other/c", "gif"),
        ];

        let summary = fetch_all(&store, &records, &options(&staging)).await.unwrap();

        assert_eq!(summary.downloaded, 3);
        assert_eq!(summary.bytes, 7);
        assert_eq!(staged_names(&staging), vec!["1.jpg", "2.png", "3.gif"]);
        assert_eq!(std::fs::read(staging.join("1.jpg")).unwrap(), b"aaaa");
    }

    #[tokio::test]
    async fn test_downloads_in_manifest_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new()
            .with_object("z", &b"z"[..])
            .with_object("a", &b"a"[..])
            .with_object("m", &b"m"[..]);
        let records = vec![
            record("1", "z", "jpg"),
            record("2", "a", "jpg"),
            record("3", "m", "jpg"),
        ];
        fetch_all(&store, &records, &options(dir.path())).await.unwrap();
        assert_eq!(store.requests(), vec!["z", "a", "m"]);
    }

    #[tokio::test]
    async fn test_first_failure_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new()
            .with_object("images/1.jpg", &b"1"[..])
            .with_object("images/3.jpg", &b"3"[..]);
        let records = vec![
            record("1", "images/1.jpg", "jpg"),
            record("2", "images/2.jpg", "jpg"),
            record("3", "images/3.jpg", "jpg"),
        ];

        let err = fetch_all(&store, &records, &options(dir.path()))
            .await
            .unwrap_err();

        match err {
            FetchError::Record {
                index, total, id, source, ..
            } => {
                assert_eq!((index, total), (2, 3));
                assert_eq!(id, "2");
                assert!(matches!(source, DownloadError::NotFound { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.requests(), vec!["images/1.jpg", "images/2.jpg"]);
        assert_eq!(staged_names(dir.path()), vec!["1.jpg"]);
    }

    #[tokio::test]
    async fn test_transient_failure_retried_then_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new().with_failure("images/1.jpg", 503);
        let mut opts = options(dir.path());
        opts.retry.max_retries = 2;

        let err = fetch_all(&store, &[record("1", "images/1.jpg", "jpg")], &opts)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Record { .. }));
        assert_eq!(store.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new().with_failure("images/1.jpg", 403);
        let mut opts = options(dir.path());
        opts.retry.max_retries = 5;

        assert!(fetch_all(&store, &[record("1", "images/1.jpg", "jpg")], &opts)
            .await
            .is_err());
        assert_eq!(store.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_manifest_downloads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("tmp");
        let store = MemoryStore::new();

        let summary = fetch_all(&store, &[], &options(&staging)).await.unwrap();

        assert_eq!(summary, FetchSummary::default());
        assert!(store.requests().is_empty());
        assert!(staging.is_dir());
        assert!(staged_names(&staging).is_empty());
    }
}
