use std::path::PathBuf;

use clap::Parser;

use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "imgdim-backfill",
    about = "Backfill image dimensions: download manifest objects from GCS and emit SQL updates"
)]
pub struct Cli {
    /// Google Cloud Storage bucket holding the objects
    #[arg(short = 'b', long, env = "BACKFILL_BUCKET", default_value = "bucket-name")]
    pub bucket: String,

    /// CSV manifest with at least the columns id, gcloudPath, fileExtension
    #[arg(short = 'i', long = "input", default_value = "./files.csv")]
    pub input_path: PathBuf,

    /// File the generated SQL is appended to (never truncated)
    #[arg(short = 'o', long = "output", default_value = "./result.txt")]
    pub output_path: PathBuf,

    /// Local directory downloads are staged in
    #[arg(long, default_value = "tmp")]
    pub staging_dir: PathBuf,

    /// Table named in the generated UPDATE statements
    #[arg(long, default_value = "CustomFile")]
    pub table: String,

    /// Number of statements buffered before each append to the output
    #[arg(long, default_value_t = crate::sql::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Storage API base URL (override for emulators)
    #[arg(long, default_value = "https://storage.googleapis.com")]
    pub endpoint: String,

    /// OAuth2 bearer token. When absent, `gcloud auth application-default
    /// print-access-token` is tried, then anonymous access.
    #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Retries per download on transient failures (429, 5xx, connection errors)
    #[arg(long, default_value_t = 0)]
    pub max_retries: u32,

    /// Base delay in seconds for exponential retry backoff
    #[arg(long = "retry-delay", default_value_t = 5)]
    pub retry_delay_secs: u64,

    /// Discard the first staged entry, as the legacy script did
    #[arg(long)]
    pub skip_first_entry: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress_bar: bool,
}
