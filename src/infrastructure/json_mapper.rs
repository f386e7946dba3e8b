// Mapper to convert domain models to JSON response types
use crate::domain::chart::{AxisSide, ChartData, ChartKind, DateAxis, SeriesData, ValueAxis};
use crate::domain::dashboard::{Dashboard, DataTable, SourceLink};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DashboardDto {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLinkDto>,
    pub default_lag: usize,
    pub charts: Vec<ChartDto>,
    pub table: TableDto,
}

#[derive(Debug, Serialize)]
pub struct SourceLinkDto {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDto {
    pub id: String,
    pub title: String,
    pub kind: &'static str,
    pub x_axis: DateAxisDto,
    pub y_axis: ValueAxisDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y2_axis: Option<ValueAxisDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lag: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub series: Vec<SeriesDto>,
}

#[derive(Debug, Serialize)]
pub struct DateAxisDto {
    pub title: String,
    pub range: Option<[NaiveDate; 2]>,
}

#[derive(Debug, Serialize)]
pub struct ValueAxisDto {
    pub title: String,
    pub range: Option<[f64; 2]>,
}

#[derive(Debug, Serialize)]
pub struct SeriesDto {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub axis: &'static str,
    /// `[date, value]` pairs; a missing value is `null`
    pub points: Vec<(NaiveDate, Option<f64>)>,
}

#[derive(Debug, Serialize)]
pub struct TableDto {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

pub fn dashboard_to_dto(dashboard: Dashboard) -> DashboardDto {
    let charts: Vec<ChartDto> = dashboard.charts.into_iter().map(chart_to_dto).collect();

    DashboardDto {
        title: dashboard.title,
        subtitle: dashboard.subtitle,
        source: dashboard.source_link.map(source_to_dto),
        default_lag: dashboard.default_lag,
        charts,
        table: table_to_dto(dashboard.table),
    }
}

fn source_to_dto(link: SourceLink) -> SourceLinkDto {
    SourceLinkDto {
        label: link.label,
        url: link.url,
    }
}

fn chart_to_dto(chart: ChartData) -> ChartDto {
    let kind = match chart.kind {
        ChartKind::Line => "line",
        ChartKind::DualAxis => "dualAxis",
        ChartKind::PercentChange => "percentChange",
    };

    let series: Vec<SeriesDto> = chart.series.into_iter().map(series_to_dto).collect();

    ChartDto {
        id: chart.id,
        title: chart.title,
        kind,
        x_axis: date_axis_to_dto(chart.x_axis),
        y_axis: value_axis_to_dto(chart.y_axis),
        y2_axis: chart.y2_axis.map(value_axis_to_dto),
        lag: chart.lag,
        width: chart.width,
        height: chart.height,
        series,
    }
}

fn date_axis_to_dto(axis: DateAxis) -> DateAxisDto {
    DateAxisDto {
        title: axis.title,
        range: axis.range.map(|(start, end)| [start, end]),
    }
}

fn value_axis_to_dto(axis: ValueAxis) -> ValueAxisDto {
    ValueAxisDto {
        title: axis.title,
        range: axis.range.map(|(lo, hi)| [lo, hi]),
    }
}

fn series_to_dto(series: SeriesData) -> SeriesDto {
    let axis = match series.axis {
        AxisSide::Primary => "y",
        AxisSide::Secondary => "y2",
    };

    SeriesDto {
        id: series.id,
        name: series.name,
        color: series.color,
        axis,
        points: series
            .points
            .into_iter()
            .map(|p| (p.date, p.value.filter(|v| v.is_finite())))
            .collect(),
    }
}

/// Date first, then one cell per metric column
pub fn table_to_dto(table: DataTable) -> TableDto {
    let mut columns = Vec::with_capacity(table.columns.len() + 1);
    columns.push(table.date_column);
    columns.extend(table.columns);

    let rows = table
        .rows
        .into_iter()
        .map(|row| {
            let mut cells = Vec::with_capacity(row.values.len() + 1);
            cells.push(serde_json::Value::String(row.date.to_string()));
            cells.extend(row.values.into_iter().map(|v| match v {
                Some(v) => serde_json::json!(v),
                None => serde_json::Value::Null,
            }));
            cells
        })
        .collect();

    TableDto { columns, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::TimeSeriesPoint;
    use crate::domain::dashboard::DataTableRow;
    use serde_json::json;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
    }

    #[test]
    fn test_missing_points_serialize_as_null() {
        let chart = ChartData {
            id: "change".to_string(),
            title: "Change".to_string(),
            kind: ChartKind::PercentChange,
            x_axis: DateAxis {
                title: "Date".to_string(),
                range: Some((date(1), date(2))),
            },
            y_axis: ValueAxis {
                title: "%".to_string(),
                range: None,
            },
            y2_axis: None,
            lag: Some(7),
            width: Some(950),
            height: None,
            series: vec![SeriesData::new(
                "gpc".to_string(),
                "GPC % Change".to_string(),
                None,
                AxisSide::Primary,
                vec![
                    TimeSeriesPoint::new(date(1), None),
                    TimeSeriesPoint::new(date(2), Some(12.5)),
                ],
            )],
        };

        let value = serde_json::to_value(chart_to_dto(chart)).unwrap();
        assert_eq!(value["kind"], "percentChange");
        assert_eq!(value["lag"], 7);
        assert_eq!(value["xAxis"]["range"], json!(["2024-04-01", "2024-04-02"]));
        assert_eq!(
            value["series"][0]["points"],
            json!([["2024-04-01", null], ["2024-04-02", 12.5]])
        );
        assert!(value.get("y2Axis").is_none());
        assert!(value.get("height").is_none());
    }

    #[test]
    fn test_table_to_dto() {
        let table = DataTable {
            date_column: "Date".to_string(),
            columns: vec!["Sites_Scanned".to_string()],
            rows: vec![DataTableRow {
                date: date(3),
                values: vec![None],
            }],
        };

        let value = serde_json::to_value(table_to_dto(table)).unwrap();
        assert_eq!(value["columns"], json!(["Date", "Sites_Scanned"]));
        assert_eq!(value["rows"], json!([["2024-04-03", null]]));
    }
}
