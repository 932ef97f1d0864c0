//! SQL statement formatting and batched, append-only output.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::dimensions::DimensionResult;

pub const DEFAULT_BATCH_SIZE: usize = 200;

#[derive(Debug, Error)]
#[error("Failed to append to {path}: {source}")]
pub struct EmitError {
    path: PathBuf,
    source: std::io::Error,
}

/// One `UPDATE` statement, newline terminated.
///
/// Single quotes in the id are doubled so the literal cannot be closed early.
pub fn format_statement(table: &str, result: &DimensionResult) -> String {
    format!(
        "UPDATE \"{}\" SET \"metadata\" = '{{\"width\": {}, \"height\": {}}}'::jsonb WHERE id = '{}';\n",
        table.replace('"', "\"\""),
        result.dimensions.width,
        result.dimensions.height,
        result.id.replace('\'', "''"),
    )
}

/// Buffers statements and appends them to the output file in batches.
///
/// Memory is bounded by `batch_size` statements. The file is only ever
/// appended to, so running twice against the same path duplicates content.
pub struct SqlEmitter {
    output_path: PathBuf,
    table: String,
    batch_size: usize,
    buffer: Vec<String>,
    statements: usize,
    appends: usize,
}

impl SqlEmitter {
    pub fn new(output_path: &Path, table: &str, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            output_path: output_path.to_path_buf(),
            table: table.to_string(),
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            statements: 0,
            appends: 0,
        }
    }

    /// Queue one statement, flushing when the batch is full.
    pub async fn push(&mut self, result: &DimensionResult) -> Result<(), EmitError> {
        self.buffer.push(format_statement(&self.table, result));
        self.statements += 1;
        if self.buffer.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Append whatever is buffered. A no-op when the buffer is empty.
    pub async fn flush(&mut self) -> Result<(), EmitError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = self.buffer.concat();
        append(&self.output_path, chunk.as_bytes()).await?;
        self.appends += 1;
        tracing::debug!(
            lines = self.buffer.len(),
            path = %self.output_path.display(),
            "appended batch"
        );
        self.buffer.clear();
        Ok(())
    }

    /// Flush the remainder and return `(statements, appends)`.
    pub async fn finish(mut self) -> Result<(usize, usize), EmitError> {
        self.flush().await?;
        Ok((self.statements, self.appends))
    }
}

async fn append(path: &Path, data: &[u8]) -> Result<(), EmitError> {
    let wrap = |source| EmitError {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(wrap)?;
    file.write_all(data).await.map_err(wrap)?;
    file.flush().await.map_err(wrap)?;
    Ok(())
}
