use crate::sources::RecordSource;
use crate::types::{Cell, RawRecord, RECORD_BATCH_SIZE};
use anyhow::{Context, Result};
use async_trait::async_trait;
use csv::ReaderBuilder;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::info;

/// Reads survey rows from a CSV file. This is a thin file-format adapter:
/// every downstream decision about what a cell means belongs to the engine.
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// Sniff a CSV field into a typed cell. Numbers and booleans are recognized,
/// everything else stays text; empty fields stay empty.
fn sniff_cell(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        if v.is_finite() {
            return Cell::Number(v);
        }
    }
    match trimmed.to_lowercase().as_str() {
        "true" => Cell::Bool(true),
        "false" => Cell::Bool(false),
        _ => Cell::Text(raw.to_string()),
    }
}

#[async_trait]
impl RecordSource for CsvSource {
    async fn fetch_records(&self, tx: mpsc::Sender<Vec<RawRecord>>) -> Result<()> {
        let mut reader = ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open CSV '{}'", self.path.display()))?;

        let headers: Vec<String> = reader
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .map(str::to_string)
            .collect();

        let mut batch = Vec::with_capacity(RECORD_BATCH_SIZE);
        let mut total = 0usize;

        for row in reader.records() {
            let row = row.context("Failed to read CSV row")?;
            let record: RawRecord = headers
                .iter()
                .zip(row.iter())
                .map(|(header, field)| (header.clone(), sniff_cell(field)))
                .collect();
            batch.push(record);
            total += 1;

            if batch.len() >= RECORD_BATCH_SIZE {
                tx.send(std::mem::take(&mut batch)).await?;
            }
        }

        if !batch.is_empty() {
            tx.send(batch).await?;
        }

        info!("Read {} records from {}", total, self.path.display());
        Ok(())
    }
}
