//! Post-run line count check. Purely informational: a mismatch is reported
//! and never fails the run.

use std::path::Path;

/// Number of newline-terminated lines in `path`. A missing file has none.
pub async fn count_lines(path: &Path) -> std::io::Result<usize> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(data.iter().filter(|&&b| b == b'\n').count()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e),
    }
}

/// Output line count compared against what the run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    /// Lines currently in the output file, including earlier runs.
    pub actual: usize,
    /// Records accepted by this run (enumerated minus skipped).
    pub expected: usize,
    /// Entries the extractor enumerated in the staging directory.
    pub enumerated: usize,
    /// Entries skipped for an empty id.
    pub skipped: usize,
}

impl Verification {
    pub fn new(actual: usize, enumerated: usize, skipped: usize) -> Self {
        Self {
            actual,
            expected: enumerated.saturating_sub(skipped),
            enumerated,
            skipped,
        }
    }

    pub fn is_match(&self) -> bool {
        self.actual == self.expected
    }

    /// Print the report and log a warning on mismatch.
    pub fn report(&self, output_path: &Path) {
        println!(
            "Total lines: {}. Should be: {}.",
            self.actual, self.expected
        );
        println!(
            "  staged entries: {}, skipped (invalid id): {}",
            self.enumerated, self.skipped
        );
        if !self.is_match() {
            let hint = if self.actual > self.expected {
                " (output may contain lines from an earlier run)"
            } else {
                ""
            };
            tracing::warn!(
                "Line count mismatch in {}: {} lines, expected {}{}",
                output_path.display(),
                self.actual,
                self.expected,
                hint
            );
        }
    }
}
