use super::{ExportRow, RowError, Sink, TableSchema};
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Writes each batch to `<table>_<timestamp>.ndjson` under an output directory.
pub struct NdjsonSink {
    output_dir: PathBuf,
    table_id: String,
}

impl NdjsonSink {
    pub fn new(output_dir: impl Into<PathBuf>, table_id: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            table_id: table_id.into(),
        }
    }

    pub fn schema_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.schema.json", self.table_id))
    }
}

#[async_trait]
impl Sink for NdjsonSink {
    async fn ensure_table(&self, schema: &TableSchema) -> Result<()> {
        fs::create_dir_all(&self.output_dir).await?;
        let path = self.schema_path();
        if fs::try_exists(&path).await? {
            return Ok(());
        }
        let content = serde_json::to_string_pretty(&json!({
            "table_id": schema.table_id,
            "fields": schema.fields,
        }))?;
        fs::write(&path, content).await?;
        info!("Wrote schema to {}", path.display());
        Ok(())
    }

    async fn insert_batch(&self, rows: &[ExportRow]) -> Result<Vec<RowError>> {
        fs::create_dir_all(&self.output_dir).await?;
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let path = self
            .output_dir
            .join(format!("{}_{}.ndjson", self.table_id, timestamp));

        let mut content = String::new();
        let mut row_errors = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            match serde_json::to_string(row) {
                Ok(line) => {
                    content.push_str(&line);
                    content.push('\n');
                }
                Err(e) => row_errors.push(RowError {
                    index,
                    message: e.to_string(),
                }),
            }
        }

        // Batches flushed within the same second share a file
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        info!("Saved {} rows to {}", rows.len() - row_errors.len(), path.display());
        Ok(row_errors)
    }
}
