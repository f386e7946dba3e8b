// Ingestion boundary: raw source records into a validated TimeSeriesTable
use super::error::{DashboardError, DashboardResult};
use super::series::{MetricId, TimeSeriesRow, TimeSeriesTable};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

/// One record as returned by a row source: column name to cell.
pub type SourceRecord = HashMap<String, Value>;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub date_column: String,
    /// Metric columns to keep. `None` keeps every non-date column.
    pub metrics: Option<Vec<MetricId>>,
}

impl IngestOptions {
    pub fn new(date_column: impl Into<String>, metrics: Option<Vec<MetricId>>) -> Self {
        Self {
            date_column: date_column.into(),
            metrics,
        }
    }
}

pub fn ingest(records: &[SourceRecord], options: &IngestOptions) -> DashboardResult<TimeSeriesTable> {
    let Some(first) = records.first() else {
        return Err(DashboardError::unavailable("row source returned no records"));
    };

    let metrics = match &options.metrics {
        Some(metrics) => metrics.clone(),
        None => {
            let mut names: Vec<MetricId> = first
                .keys()
                .filter(|k| *k != &options.date_column)
                .map(|k| MetricId::new(k.as_str()))
                .collect();
            names.sort();
            names
        }
    };

    if metrics.is_empty() {
        return Err(DashboardError::invalid("no metric columns to ingest"));
    }

    let rows = records
        .iter()
        .enumerate()
        .map(|(idx, record)| parse_row(idx + 1, record, &options.date_column, &metrics))
        .collect::<DashboardResult<Vec<_>>>()?;

    tracing::debug!(
        "Ingested {} rows with {} metric columns",
        rows.len(),
        metrics.len()
    );

    TimeSeriesTable::new(rows)
}

fn parse_row(
    line: usize,
    record: &SourceRecord,
    date_column: &str,
    metrics: &[MetricId],
) -> DashboardResult<TimeSeriesRow> {
    let date_cell = record.get(date_column).ok_or_else(|| {
        DashboardError::invalid(format!("row {}: missing date column {}", line, date_column))
    })?;
    let date = parse_date(date_cell).ok_or_else(|| {
        DashboardError::invalid(format!(
            "row {}: cannot parse {} value {}",
            line, date_column, date_cell
        ))
    })?;

    let mut values = BTreeMap::new();
    for metric in metrics {
        let cell = record.get(metric.as_str()).ok_or_else(|| {
            DashboardError::invalid(format!("row {}: missing metric column {}", line, metric))
        })?;
        let value = parse_number(cell).ok_or_else(|| {
            DashboardError::invalid(format!(
                "row {}: {} value {} is not numeric",
                line, metric, cell
            ))
        })?;
        values.insert(metric.clone(), value);
    }

    Ok(TimeSeriesRow::new(date, values))
}

/// Parse a date cell, discarding any time of day.
pub fn parse_date(cell: &Value) -> Option<NaiveDate> {
    let text = cell.as_str()?.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(date_time) = NaiveDateTime::parse_from_str(text, format) {
            return Some(date_time.date());
        }
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|date_time| date_time.date_naive())
}

/// `Some(None)` for an empty cell, `None` when the cell is not a number.
pub fn parse_number(cell: &Value) -> Option<Option<f64>> {
    match cell {
        Value::Null => Some(None),
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).map(Some),
        Value::String(s) => {
            let text = s.trim();
            if text.is_empty() {
                return Some(None);
            }
            strip_thousands(text)?
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Some)
        }
        _ => None,
    }
}

/// Drop `,` thousands separators. Commas anywhere other than between
/// three-digit groups of the integer part make the text non-numeric.
fn strip_thousands(text: &str) -> Option<String> {
    if !text.contains(',') {
        return Some(text.to_string());
    }

    let (integer, fraction) = match text.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (text, None),
    };
    let digits = integer.trim_start_matches(['-', '+']);
    let sign = &integer[..integer.len() - digits.len()];

    let mut groups = digits.split(',');
    let first = groups.next()?;
    let first_ok = (1..=3).contains(&first.len()) && first.bytes().all(|b| b.is_ascii_digit());
    if !first_ok {
        return None;
    }
    let mut cleaned = format!("{}{}", sign, first);
    for group in groups {
        if group.len() != 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        cleaned.push_str(group);
    }

    if let Some(fraction) = fraction {
        if fraction.contains(',') {
            return None;
        }
        cleaned.push('.');
        cleaned.push_str(fraction);
    }
    Some(cleaned)
}

/// Column names must be unique, blank names are ignored.
pub fn ensure_unique_headers<'a>(
    headers: impl IntoIterator<Item = &'a str>,
    origin: &str,
) -> DashboardResult<()> {
    let mut seen = HashSet::new();
    for name in headers {
        if !name.is_empty() && !seen.insert(name) {
            return Err(DashboardError::invalid(format!(
                "duplicate header {} in {}",
                name, origin
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(date: &str, sites: Value, gpc: Value) -> SourceRecord {
        HashMap::from([
            ("Date".to_string(), json!(date)),
            ("Sites_Scanned".to_string(), sites),
            ("GPC_Supporting_Sites".to_string(), gpc),
        ])
    }

    fn options() -> IngestOptions {
        IngestOptions::new("Date", None)
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 4, 10).unwrap();
        for text in [
            "2024-04-10",
            "04/10/2024",
            "2024/04/10",
            "2024-04-10 17:45:00",
            "2024-04-10T23:59:59",
            "2024-04-10T08:00:00+02:00",
        ] {
            assert_eq!(parse_date(&json!(text)), Some(expected), "{}", text);
        }
        assert_eq!(parse_date(&json!("yesterday")), None);
        assert_eq!(parse_date(&json!(45392)), None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(&json!(12)), Some(Some(12.0)));
        assert_eq!(parse_number(&json!(" 7,012,345 ")), Some(Some(7_012_345.0)));
        assert_eq!(parse_number(&json!("")), Some(None));
        assert_eq!(parse_number(&Value::Null), Some(None));
        assert_eq!(parse_number(&json!("n/a")), None);
        assert_eq!(parse_number(&json!("NaN")), None);
        assert_eq!(parse_number(&json!(true)), None);
    }

    #[test]
    fn test_parse_number_thousands_separators() {
        assert_eq!(parse_number(&json!("1,234.5")), Some(Some(1234.5)));
        assert_eq!(parse_number(&json!("-12,000")), Some(Some(-12000.0)));
        assert_eq!(parse_number(&json!("1,5")), None);
        assert_eq!(parse_number(&json!("12,34")), None);
        assert_eq!(parse_number(&json!("1234,567")), None);
        assert_eq!(parse_number(&json!(",123")), None);
        assert_eq!(parse_number(&json!("1,000.0,5")), None);
    }

    #[test]
    fn test_ensure_unique_headers() {
        assert!(ensure_unique_headers(["Date", "", "", "Sites_Scanned"], "sheet").is_ok());

        let err = ensure_unique_headers(["Date", "Sites_Scanned", "Sites_Scanned"], "sheet")
            .unwrap_err();
        assert!(matches!(err, DashboardError::InvalidInput(_)));
        assert!(err.to_string().contains("Sites_Scanned"));
    }

    #[test]
    fn test_ingest_records() {
        let records = vec![
            record("2024-04-01", json!(7_000_000), json!(1200)),
            record("2024-04-02", json!("7,100,000"), json!("")),
        ];

        let table = ingest(&records, &options()).unwrap();
        assert_eq!(table.rows().len(), 2);
        assert_eq!(table.schema().len(), 2);

        let gpc = table
            .metric_values(&MetricId::from("GPC_Supporting_Sites"))
            .unwrap();
        assert_eq!(gpc, vec![Some(1200.0), None]);
    }

    #[test]
    fn test_ingest_selected_metrics() {
        let mut first = record("2024-04-01", json!(1), json!(2));
        first.insert("Notes".to_string(), json!("outage"));
        let records = vec![first];

        let opts = IngestOptions::new("Date", Some(vec![MetricId::from("Sites_Scanned")]));
        let table = ingest(&records, &opts).unwrap();
        assert_eq!(table.schema().len(), 1);
        assert!(table.has_metric(&MetricId::from("Sites_Scanned")));
    }

    #[test]
    fn test_ingest_empty_is_unavailable() {
        let err = ingest(&[], &options()).unwrap_err();
        assert!(matches!(err, DashboardError::SourceUnavailable(_)));
    }

    #[test]
    fn test_ingest_rejects_bad_cells() {
        let records = vec![record("2024-04-01", json!("lots"), json!(2))];
        let err = ingest(&records, &options()).unwrap_err();
        assert!(err.to_string().contains("row 1"));

        let records = vec![record("someday", json!(1), json!(2))];
        assert!(matches!(
            ingest(&records, &options()).unwrap_err(),
            DashboardError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_ingest_rejects_missing_column() {
        let mut second = record("2024-04-02", json!(1), json!(2));
        second.remove("GPC_Supporting_Sites");
        let records = vec![record("2024-04-01", json!(1), json!(2)), second];

        let err = ingest(&records, &options()).unwrap_err();
        assert!(err.to_string().contains("GPC_Supporting_Sites"));
    }

    #[test]
    fn test_ingest_rejects_out_of_order_dates() {
        let records = vec![
            record("2024-04-02", json!(1), json!(2)),
            record("2024-04-01", json!(1), json!(2)),
        ];
        assert!(matches!(
            ingest(&records, &options()).unwrap_err(),
            DashboardError::InvalidInput(_)
        ));
    }
}
