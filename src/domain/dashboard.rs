// Dashboard domain model
use super::chart::ChartData;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct SourceLink {
    pub label: String,
    pub url: String,
}

/// Raw values shown beneath the charts.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    pub date_column: String,
    pub columns: Vec<String>,
    pub rows: Vec<DataTableRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataTableRow {
    pub date: NaiveDate,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub title: String,
    pub subtitle: Option<String>,
    pub source_link: Option<SourceLink>,
    /// Lag window for charts without their own; each chart reports the
    /// lag it was actually computed with.
    pub default_lag: usize,
    pub charts: Vec<ChartData>,
    pub table: DataTable,
}
