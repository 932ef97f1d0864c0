//! imgdim-backfill: one-shot image dimension backfill.
//!
//! Reads a CSV manifest exported from the database, downloads each listed
//! object from a Google Cloud Storage bucket into a staging directory, reads
//! the pixel size from each image header, and appends one SQL `UPDATE` per
//! file to an output file for later, separate execution.

#![warn(clippy::all)]

mod cli;
mod config;
mod dimensions;
mod fetch;
mod manifest;
mod pipeline;
mod progress;
pub mod retry;
mod sql;
mod store;
mod types;
mod verify;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = config::Config::from_cli(cli)?;
    tracing::debug!(?config, "Starting imgdim-backfill");

    let access_token = store::gcs::resolve_access_token(config.access_token.clone()).await;
    let store = store::GcsStore::new(&config.endpoint, &config.bucket, access_token)?;

    let summary = pipeline::run(&config, &store).await?;

    tracing::info!(
        "Done: {} records, {} downloaded, {} statements in {} appends ({} with -1 x -1){}",
        summary.records,
        summary.downloaded,
        summary.emitted,
        summary.appends,
        summary.sentinels,
        if summary.verification.is_match() {
            ""
        } else {
            "; line count mismatch, see above"
        }
    );
    Ok(())
}
