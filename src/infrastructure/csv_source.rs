// CSV file row source, for local runs and fixtures
use crate::application::row_source::RowSource;
use crate::domain::error::{DashboardError, DashboardResult};
use crate::domain::ingest::{ensure_unique_headers, SourceRecord};
use async_trait::async_trait;
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct CsvRowSource {
    path: PathBuf,
}

impl CsvRowSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl RowSource for CsvRowSource {
    async fn fetch_records(&self) -> DashboardResult<Vec<SourceRecord>> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            DashboardError::unavailable(format!(
                "failed to open CSV '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        read_records(bytes.as_slice())
    }

    fn describe(&self) -> String {
        format!("csv {}", self.path.display())
    }
}

/// Read header-first CSV into records. Numeric cells become numbers,
/// empty cells null, anything else stays text for ingestion to judge.
pub fn read_records<R: Read>(reader: R) -> DashboardResult<Vec<SourceRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| DashboardError::unavailable(format!("failed to read CSV headers: {}", e)))?
        .clone();
    ensure_unique_headers(headers.iter(), "CSV header")?;

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header, lines are 1-based
        let line = idx + 2;
        let row = result.map_err(|e| {
            DashboardError::unavailable(format!("CSV parse error on line {}: {}", line, e))
        })?;

        if row.iter().all(str::is_empty) {
            continue;
        }

        let record: SourceRecord = headers
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(i, name)| (name.to_string(), cell_value(row.get(i).unwrap_or(""))))
            .collect();
        records.push(record);
    }

    Ok(records)
}

fn cell_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    raw.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}
