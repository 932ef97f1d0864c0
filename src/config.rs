use std::path::PathBuf;

use crate::retry::RetryConfig;
use crate::types::{LeadingEntryPolicy, LogLevel};

/// Run configuration, built once from the CLI and handed to each stage.
pub struct Config {
    pub bucket: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub staging_dir: PathBuf,
    pub table: String,
    pub endpoint: String,
    pub access_token: Option<String>,

    pub batch_size: usize,
    pub retry: RetryConfig,

    pub leading_entry: LeadingEntryPolicy,
    #[allow(dead_code)] // Read from cli.log_level directly in main.rs
    pub log_level: LogLevel,
    pub no_progress_bar: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bucket", &self.bucket)
            .field("input_path", &self.input_path)
            .field("output_path", &self.output_path)
            .field("staging_dir", &self.staging_dir)
            .field("table", &self.table)
            .field("endpoint", &self.endpoint)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: PathBuf) -> PathBuf {
    if let Some(stripped) = path.to_str().and_then(|p| p.strip_prefix("~/")) {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        if cli.batch_size == 0 {
            anyhow::bail!("--batch-size must be at least 1");
        }
        if cli.bucket.trim().is_empty() {
            anyhow::bail!("--bucket must not be empty");
        }

        Ok(Self {
            bucket: cli.bucket,
            input_path: expand_tilde(cli.input_path),
            output_path: expand_tilde(cli.output_path),
            staging_dir: expand_tilde(cli.staging_dir),
            table: cli.table,
            endpoint: cli.endpoint.trim_end_matches('/').to_string(),
            access_token: cli.access_token.filter(|t| !t.trim().is_empty()),
            batch_size: cli.batch_size,
            retry: RetryConfig {
                max_retries: cli.max_retries,
                base_delay_secs: cli.retry_delay_secs,
                max_delay_secs: 60,
            },
            leading_entry: LeadingEntryPolicy::from_flag(cli.skip_first_entry),
            log_level: cli.log_level,
            no_progress_bar: cli.no_progress_bar,
        })
    }
}
