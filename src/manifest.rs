//! CSV manifest loading.
//!
//! The manifest is a plain database export with a header row. Only three
//! columns matter: `id`, `gcloudPath` and `fileExtension`; any others are
//! ignored. Rows are not validated beyond what the CSV parser enforces, so a
//! missing column simply yields an empty value.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// One object to fetch and the id it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRecord {
    pub id: String,
    pub remote_path: String,
    /// Extension without a leading dot.
    pub extension: String,
}

impl ManifestRecord {
    /// File name the object is staged under: `<id>.<extension>`.
    pub fn staged_name(&self) -> String {
        format!("{}.{}", self.id, self.extension)
    }
}

/// Positions of the recognized columns in the header row.
struct Columns {
    id: Option<usize>,
    remote_path: Option<usize>,
    extension: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h == name);
        Self {
            id: find("id"),
            remote_path: find("gcloudPath"),
            extension: find("fileExtension"),
        }
    }

    fn record(&self, row: &csv::StringRecord) -> ManifestRecord {
        let field = |idx: Option<usize>| idx.and_then(|i| row.get(i)).unwrap_or_default();
        ManifestRecord {
            id: field(self.id).to_string(),
            remote_path: field(self.remote_path).to_string(),
            extension: field(self.extension).trim_start_matches('.').to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        source: csv::Error,
    },

    #[error("Manifest {path} has no header row")]
    MissingHeader { path: PathBuf },
}

/// Read and parse the manifest at `path`.
pub async fn load_manifest(path: &Path) -> Result<Vec<ManifestRecord>, ManifestError> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_manifest(path, &data)
}

fn parse_error(path: &Path, source: csv::Error) -> ManifestError {
    ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    }
}

/// Parse manifest bytes. `path` is only used for error context.
pub fn parse_manifest(path: &Path, data: &[u8]) -> Result<Vec<ManifestRecord>, ManifestError> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| parse_error(path, e))?
        .clone();
    if headers.is_empty() {
        return Err(ManifestError::MissingHeader {
            path: path.to_path_buf(),
        });
    }
    let columns = Columns::locate(&headers);
    for (name, idx) in [
        ("id", columns.id),
        ("gcloudPath", columns.remote_path),
        ("fileExtension", columns.extension),
    ] {
        if idx.is_none() {
            tracing::warn!(
                "Manifest {} has no '{}' column; values will be empty",
                path.display(),
                name
            );
        }
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|e| parse_error(path, e))?;
        if row.iter().all(|field| field.is_empty()) {
            continue;
        }
        let record = columns.record(&row);
        if record.extension.contains('.') {
            tracing::warn!(
                "Record {} has extension {:?}; its id will be read back as {:?}",
                record.id,
                record.extension,
                record.staged_name().rsplit_once('.').map_or("", |(stem, _)| stem)
            );
        }
        records.push(record);
    }

    tracing::debug!(count = records.len(), path = %path.display(), "manifest loaded");
    Ok(records)
}
