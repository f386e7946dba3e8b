// Google Sheets row source implementation
use crate::application::row_source::RowSource;
use crate::domain::error::{DashboardError, DashboardResult};
use crate::domain::ingest::{ensure_unique_headers, SourceRecord};
use crate::infrastructure::config::{Credentials, SheetsSettings};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct SheetsRowSource {
    api_base: String,
    spreadsheet_id: String,
    range: String,
    credentials: Credentials,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[allow(dead_code)]
    #[serde(default)]
    range: Option<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl SheetsRowSource {
    pub fn new(settings: SheetsSettings, credentials: Credentials) -> Self {
        Self {
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            spreadsheet_id: settings.spreadsheet_id,
            range: settings.range,
            credentials,
            client: reqwest::Client::new(),
        }
    }

    fn build_values_url(&self) -> String {
        // Dates come back as displayed, numbers unformatted
        let mut url = format!(
            "{}/v4/spreadsheets/{}/values/{}?majorDimension=ROWS&valueRenderOption=UNFORMATTED_VALUE&dateTimeRenderOption=FORMATTED_STRING",
            self.api_base,
            urlencoding::encode(&self.spreadsheet_id),
            urlencoding::encode(&self.range)
        );
        if self.credentials.access_token.is_none() {
            if let Some(key) = &self.credentials.api_key {
                url.push_str("&key=");
                url.push_str(&urlencoding::encode(key));
            }
        }
        url
    }

    async fn fetch_values(&self) -> DashboardResult<ValueRange> {
        let url = self.build_values_url();

        let mut request = self.client.get(&url).header("Accept", "application/json");
        if let Some(token) = &self.credentials.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            DashboardError::unavailable(format!("failed to send request to Sheets API: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DashboardError::unavailable(format!(
                "Sheets API request failed with status {}: {}",
                status, body
            )));
        }

        response.json::<ValueRange>().await.map_err(|e| {
            DashboardError::unavailable(format!("failed to parse Sheets API response: {}", e))
        })
    }
}

#[async_trait]
impl RowSource for SheetsRowSource {
    async fn fetch_records(&self) -> DashboardResult<Vec<SourceRecord>> {
        tracing::debug!("Fetching {} from spreadsheet {}", self.range, self.spreadsheet_id);
        let value_range = self.fetch_values().await?;
        records_from_values(value_range.values)
    }

    fn describe(&self) -> String {
        format!("sheet {} ({})", self.spreadsheet_id, self.range)
    }
}

/// Turn a header-first grid into records. Short rows are padded with
/// empty cells and fully blank rows are dropped.
pub fn records_from_values(values: Vec<Vec<Value>>) -> DashboardResult<Vec<SourceRecord>> {
    let mut rows = values.into_iter();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };

    let headers: Vec<String> = header_row.iter().map(header_name).collect();
    ensure_unique_headers(headers.iter().map(String::as_str), "worksheet")?;

    let mut records = Vec::new();
    for row in rows {
        if row.iter().all(is_blank) {
            continue;
        }

        let record: SourceRecord = headers
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(idx, name)| {
                let cell = row.get(idx).cloned().unwrap_or(Value::Null);
                (name.clone(), cell)
            })
            .collect();
        records.push(record);
    }

    Ok(records)
}

fn header_name(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_blank(cell: &Value) -> bool {
    match cell {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(credentials: Credentials) -> SheetsRowSource {
        SheetsRowSource::new(
            SheetsSettings {
                spreadsheet_id: "abc123".to_string(),
                range: "Daily Scan!A:C".to_string(),
                api_base: "https://sheets.example.com/".to_string(),
            },
            credentials,
        )
    }

    #[test]
    fn test_build_values_url() {
        let url = source(Credentials {
            access_token: None,
            api_key: Some("k&y".to_string()),
        })
        .build_values_url();

        assert!(url.starts_with(
            "https://sheets.example.com/v4/spreadsheets/abc123/values/Daily%20Scan%21A%3AC?"
        ));
        assert!(url.ends_with("&key=k%26y"));
    }

    #[test]
    fn test_token_takes_precedence_over_key() {
        let url = source(Credentials {
            access_token: Some("token".to_string()),
            api_key: Some("key".to_string()),
        })
        .build_values_url();

        assert!(!url.contains("key="));
    }

    #[test]
    fn test_records_from_values() {
        let values = vec![
            vec![json!("Date"), json!("Sites_Scanned"), json!("GPC_Supporting_Sites")],
            vec![json!("2024-04-01"), json!(7000000), json!(1200)],
            vec![json!(""), json!("")],
            vec![json!("2024-04-02"), json!(7100000)],
        ];

        let records = records_from_values(values).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["Sites_Scanned"], json!(7000000));
        assert_eq!(records[1]["GPC_Supporting_Sites"], Value::Null);
    }

    #[test]
    fn test_records_skip_unnamed_columns() {
        let values = vec![
            vec![json!("Date"), json!(""), json!("Sites_Scanned")],
            vec![json!("2024-04-01"), json!("scratch"), json!(5)],
        ];

        let records = records_from_values(values).unwrap();
        assert_eq!(records[0].len(), 2);
    }

    #[test]
    fn test_duplicate_headers_rejected() {
        let values = vec![vec![json!("Date"), json!("Date")]];
        assert!(matches!(
            records_from_values(values).unwrap_err(),
            DashboardError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_empty_sheet() {
        assert!(records_from_values(Vec::new()).unwrap().is_empty());
    }
}
