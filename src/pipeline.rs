//! The backfill run: load, fetch, measure and emit, verify.
//!
//! Every stage finishes before the next begins and every item within a
//! stage is awaited before the next item starts.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::Config;
use crate::dimensions::{self, Extraction};
use crate::fetch::error::FetchError;
use crate::fetch::{self, FetchOptions};
use crate::manifest::{self, ManifestError};
use crate::progress::Progress;
use crate::sql::{EmitError, SqlEmitter};
use crate::store::ObjectStore;
use crate::verify::{self, Verification};

#[derive(Debug, Error)]
pub enum BackfillError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to list staging directory {path}: {source}")]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error("Failed to read output {path} for verification: {source}")]
    Verify {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub records: usize,
    pub downloaded: usize,
    pub emitted: usize,
    pub appends: usize,
    pub sentinels: usize,
    pub verification: Verification,
}

pub async fn run(config: &Config, store: &dyn ObjectStore) -> Result<RunSummary, BackfillError> {
    if let Ok(meta) = tokio::fs::metadata(&config.output_path).await {
        if meta.len() > 0 {
            tracing::warn!(
                "Output {} already has content; new statements will be appended after it",
                config.output_path.display()
            );
        }
    }

    tracing::info!("Reading input file {}...", config.input_path.display());
    let records = manifest::load_manifest(&config.input_path).await?;
    tracing::info!("{} records in manifest", records.len());

    tracing::info!("Downloading files from {}...", store.describe());
    let fetch_options = FetchOptions {
        staging_dir: config.staging_dir.clone(),
        retry: config.retry,
        no_progress_bar: config.no_progress_bar,
    };
    let fetched = fetch::fetch_all(store, &records, &fetch_options).await?;

    tracing::info!("Generating SQL...");
    let entries = dimensions::scan_staging(&config.staging_dir, config.leading_entry)
        .await
        .map_err(|source| BackfillError::Scan {
            path: config.staging_dir.clone(),
            source,
        })?;

    let progress = Progress::new(config.no_progress_bar, entries.len() as u64);
    let mut emitter = SqlEmitter::new(&config.output_path, &config.table, config.batch_size);
    let mut skipped = 0usize;
    let mut sentinels = 0usize;

    for (i, path) in entries.iter().enumerate() {
        match dimensions::extract(path).await {
            Extraction::Extracted(result) => {
                if result.dimensions.is_sentinel() {
                    sentinels += 1;
                    progress.suspend(|| {
                        tracing::warn!(
                            id = %result.id,
                            "Could not read dimensions of {}; emitting -1 x -1",
                            path.display()
                        )
                    });
                }
                emitter.push(&result).await?;
            }
            Extraction::InvalidId { path } => {
                skipped += 1;
                progress.suspend(|| tracing::error!("Invalid id: {}", path.display()));
            }
        }
        progress.advance_to((i + 1) as u64);
    }
    progress.finish();

    let (emitted, appends) = emitter.finish().await?;
    tracing::info!(
        "Wrote {} statements to {} in {} appends",
        emitted,
        config.output_path.display(),
        appends
    );

    tracing::info!("Checking the line count...");
    let actual = verify::count_lines(&config.output_path)
        .await
        .map_err(|source| BackfillError::Verify {
            path: config.output_path.clone(),
            source,
        })?;
    let verification = Verification::new(actual, entries.len(), skipped);
    verification.report(&config.output_path);

    Ok(RunSummary {
        records: records.len(),
        downloaded: fetched.downloaded,
        emitted,
        appends,
        sentinels,
        verification,
    })
}
