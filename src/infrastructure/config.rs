use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

const ENV_PREFIX: &str = "DASHBOARD";
const WIDGETS_PATH: &str = "config/widgets.toml";

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub source: SourceSettings,
    #[serde(default)]
    pub credentials: Credentials,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSettings {
    Sheets(SheetsSettings),
    Csv(CsvSettings),
}

#[derive(Debug, Deserialize, Clone)]
pub struct SheetsSettings {
    pub spreadsheet_id: String,
    #[serde(default = "default_range")]
    pub range: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CsvSettings {
    pub path: PathBuf,
}

/// Usually injected through the environment by a secrets store.
#[derive(Deserialize, Clone, Default)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub api_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("access_token", &redact(&self.access_token))
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WidgetsConfig {
    pub dashboard: DashboardSettings,
    #[serde(default)]
    pub charts: Vec<ChartConfig>,
    #[serde(default)]
    pub table: TableConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardSettings {
    pub title: String,
    pub subtitle: Option<String>,
    pub source_label: Option<String>,
    pub source_url: Option<String>,
    #[serde(default = "default_date_column")]
    pub date_column: String,
    /// Columns to ingest; every non-date column when unset.
    pub metrics: Option<Vec<String>>,
    #[serde(default = "default_lag")]
    pub lag: usize,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ChartKindConfig {
    Line,
    DualAxis,
    PercentChange,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartConfig {
    pub id: String,
    pub title: String,
    pub kind: ChartKindConfig,
    #[serde(default = "default_x_title")]
    pub x_title: String,
    pub x_start: Option<NaiveDate>,
    pub y_axis: AxisConfig,
    pub y2_axis: Option<AxisConfig>,
    pub lag: Option<usize>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default)]
    pub series: Vec<SeriesConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AxisConfig {
    pub title: String,
    pub min: Option<f64>,
    /// Fraction of the observed maximum added above it.
    #[serde(default = "default_headroom")]
    pub headroom: f64,
    /// Leave the range to the renderer.
    #[serde(default)]
    pub auto: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeriesConfig {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub metric: String,
    #[serde(default)]
    pub secondary: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TableConfig {
    /// Metric columns shown after the date; every metric when empty.
    #[serde(default)]
    pub metrics: Vec<String>,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_range() -> String {
    "Sheet1".to_string()
}

fn default_api_base() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_date_column() -> String {
    "Date".to_string()
}

fn default_lag() -> usize {
    7
}

fn default_x_title() -> String {
    "Date".to_string()
}

fn default_headroom() -> f64 {
    0.1
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
}

pub fn load_source_config() -> anyhow::Result<SourceConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/source").required(false))
        .add_source(env_source())
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_widgets_config() -> anyhow::Result<WidgetsConfig> {
    let text = std::fs::read_to_string(WIDGETS_PATH)
        .with_context(|| format!("failed to read {}", WIDGETS_PATH))?;
    parse_widgets_config(&text)
}

/// Parse a widgets document held in memory.
pub fn parse_widgets_config(toml: &str) -> anyhow::Result<WidgetsConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Replace `${name}` placeholders in a title template
pub fn prepare_template(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}
