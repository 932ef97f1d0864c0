use std::ffi::OsString;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::error::DownloadError;
use crate::store::ByteStream;

/// Suffix of in-progress downloads. The dimension scan ignores these.
pub const PART_SUFFIX: &str = ".part";

/// `<destination>.part`, next to the destination so the final rename never
/// crosses filesystems.
pub fn part_path(destination: &Path) -> PathBuf {
    let mut name: OsString = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(PART_SUFFIX);
    destination.with_file_name(name)
}

/// Whether `path` is a leftover written by [`part_path`]: `<id>.<ext>.part`.
/// A staged `<id>.part` (a record whose extension really is `part`) is not.
pub fn is_part_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(PART_SUFFIX))
        .is_some_and(|stem| stem.contains('.'))
}

fn disk_error(path: &Path) -> impl FnOnce(std::io::Error) -> DownloadError + '_ {
    move |source| DownloadError::Disk {
        path: path.to_path_buf(),
        source,
    }
}

/// Drain `stream` into a `.part` file, then rename it to `destination`.
///
/// An existing file at `destination` is replaced. On any error the `.part`
/// file is removed and `destination` is left untouched.
pub async fn write_stream(
    mut stream: ByteStream,
    destination: &Path,
) -> Result<u64, DownloadError> {
    let part = part_path(destination);

    let result = async {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&part)
            .await
            .map_err(disk_error(&part))?;

        let mut bytes_written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await.map_err(disk_error(&part))?;
            bytes_written += chunk.len() as u64;
        }
        file.flush().await.map_err(disk_error(&part))?;
        drop(file);

        fs::rename(&part, destination)
            .await
            .map_err(disk_error(destination))?;
        Ok::<u64, DownloadError>(bytes_written)
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&part).await;
    }
    result
}
