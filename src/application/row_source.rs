// Row source trait for spreadsheet-like data access
use crate::domain::error::DashboardResult;
use crate::domain::ingest::SourceRecord;
use async_trait::async_trait;

#[async_trait]
pub trait RowSource: Send + Sync {
    /// Fetch every record in source order.
    /// Fails with `SourceUnavailable` when the backend cannot be read.
    async fn fetch_records(&self) -> DashboardResult<Vec<SourceRecord>>;

    /// Short human-readable name for logs
    fn describe(&self) -> String;
}
