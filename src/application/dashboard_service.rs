// Dashboard service - Use case for building the dashboard
use crate::application::row_source::RowSource;
use crate::domain::chart::{
    axis_range, AxisSide, ChartData, ChartKind, DateAxis, SeriesData, TimeSeriesPoint, ValueAxis,
};
use crate::domain::dashboard::{Dashboard, DataTable, DataTableRow, SourceLink};
use crate::domain::error::{DashboardError, DashboardResult};
use crate::domain::ingest::{ingest, IngestOptions};
use crate::domain::series::{MetricId, TimeSeriesTable};
use crate::infrastructure::config::{
    prepare_template, AxisConfig, ChartConfig, ChartKindConfig, WidgetsConfig,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

const DEFAULT_SOURCE_LABEL: &str = "Source of Data";

#[derive(Clone)]
pub struct DashboardService {
    source: Arc<dyn RowSource>,
    widgets_config: WidgetsConfig,
}

impl DashboardService {
    pub fn new(source: Arc<dyn RowSource>, widgets_config: WidgetsConfig) -> Self {
        Self {
            source,
            widgets_config,
        }
    }

    /// Fetch, derive and assemble the whole dashboard. `lag` overrides the
    /// configured lag window for every percent-change chart.
    pub async fn get_dashboard(&self, lag: Option<usize>) -> DashboardResult<Dashboard> {
        if lag == Some(0) {
            return Err(DashboardError::invalid("lag must be at least 1"));
        }

        let start_time = Instant::now();
        let settings = &self.widgets_config.dashboard;

        let mut table = self.load_table().await?;
        for chart_config in &self.widgets_config.charts {
            if chart_config.kind != ChartKindConfig::PercentChange {
                continue;
            }
            let chart_lag = self.chart_lag(chart_config, lag);
            for series_config in &chart_config.series {
                table = table.with_derived(&MetricId::new(series_config.metric.as_str()), chart_lag)?;
            }
        }

        let charts = self
            .widgets_config
            .charts
            .iter()
            .map(|c| self.build_chart(&table, c, lag))
            .collect::<DashboardResult<Vec<_>>>()?;
        let data_table = self.build_table(&table)?;

        let source_link = settings.source_url.clone().map(|url| SourceLink {
            label: settings
                .source_label
                .clone()
                .unwrap_or_else(|| DEFAULT_SOURCE_LABEL.to_string()),
            url,
        });

        tracing::info!(
            "Built dashboard from {} rows ({} derived columns) in {} ms",
            table.len(),
            table.derived().len(),
            start_time.elapsed().as_millis()
        );

        Ok(Dashboard {
            title: settings.title.clone(),
            subtitle: settings.subtitle.clone(),
            source_link,
            default_lag: lag.unwrap_or(settings.lag),
            charts,
            table: data_table,
        })
    }

    /// Only the raw table, without derived columns
    pub async fn get_table(&self) -> DashboardResult<DataTable> {
        let table = self.load_table().await?;
        self.build_table(&table)
    }

    async fn load_table(&self) -> DashboardResult<TimeSeriesTable> {
        let records = match self.source.fetch_records().await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!("Error fetching rows from {}: {}", self.source.describe(), e);
                return Err(e);
            }
        };

        tracing::debug!(
            "Fetched {} records from {}",
            records.len(),
            self.source.describe()
        );

        ingest(&records, &self.ingest_options())
    }

    fn ingest_options(&self) -> IngestOptions {
        let settings = &self.widgets_config.dashboard;
        let metrics = settings
            .metrics
            .as_ref()
            .map(|names| names.iter().map(|n| MetricId::new(n.as_str())).collect());
        IngestOptions::new(settings.date_column.clone(), metrics)
    }

    fn chart_lag(&self, chart_config: &ChartConfig, requested: Option<usize>) -> usize {
        requested
            .or(chart_config.lag)
            .unwrap_or(self.widgets_config.dashboard.lag)
    }

    fn build_chart(
        &self,
        table: &TimeSeriesTable,
        chart_config: &ChartConfig,
        requested_lag: Option<usize>,
    ) -> DashboardResult<ChartData> {
        let lag = self.chart_lag(chart_config, requested_lag);
        let dates: Vec<NaiveDate> = table.dates().collect();

        let mut series_list = Vec::with_capacity(chart_config.series.len());
        for series_config in &chart_config.series {
            let metric = MetricId::new(series_config.metric.as_str());

            let values: Vec<Option<f64>> = match chart_config.kind {
                ChartKindConfig::PercentChange => {
                    let column = table.derived_column(&metric, lag).ok_or_else(|| {
                        DashboardError::invalid(format!(
                            "no derived column for {} at lag {}",
                            metric, lag
                        ))
                    })?;
                    if let Some(last) = column.len().checked_sub(1) {
                        tracing::debug!(
                            "{} lag {}: latest {:?} against prior {:?}",
                            metric,
                            lag,
                            column.percent_change(last),
                            column.prior_values[last]
                        );
                    }
                    (0..column.len()).map(|i| column.percent_change(i)).collect()
                }
                ChartKindConfig::Line | ChartKindConfig::DualAxis => table.metric_values(&metric)?,
            };

            let axis = if series_config.secondary {
                if chart_config.y2_axis.is_none() {
                    return Err(DashboardError::invalid(format!(
                        "series {} is bound to a secondary axis but chart {} has none",
                        series_config.id, chart_config.id
                    )));
                }
                AxisSide::Secondary
            } else {
                AxisSide::Primary
            };

            let points = dates
                .iter()
                .zip(values)
                .map(|(date, value)| TimeSeriesPoint::new(*date, value))
                .collect();

            series_list.push(SeriesData::new(
                series_config.id.clone(),
                series_config.name.clone(),
                series_config.color.clone(),
                axis,
                points,
            ));
        }

        let kind = match chart_config.kind {
            ChartKindConfig::Line => ChartKind::Line,
            ChartKindConfig::DualAxis => ChartKind::DualAxis,
            ChartKindConfig::PercentChange => ChartKind::PercentChange,
        };

        let x_range = match (chart_config.x_start, table.last_date()) {
            (Some(start), Some(end)) if start <= end => Some((start, end)),
            _ => None,
        };

        let mut vars = HashMap::new();
        vars.insert("lag".to_string(), lag.to_string());

        Ok(ChartData {
            id: chart_config.id.clone(),
            title: prepare_template(&chart_config.title, &vars),
            kind,
            x_axis: DateAxis {
                title: chart_config.x_title.clone(),
                range: x_range,
            },
            y_axis: value_axis(&chart_config.y_axis, &series_list, AxisSide::Primary),
            y2_axis: chart_config
                .y2_axis
                .as_ref()
                .map(|axis| value_axis(axis, &series_list, AxisSide::Secondary)),
            lag: (kind == ChartKind::PercentChange).then_some(lag),
            width: chart_config.width,
            height: chart_config.height,
            series: series_list,
        })
    }

    fn build_table(&self, table: &TimeSeriesTable) -> DashboardResult<DataTable> {
        let configured = &self.widgets_config.table.metrics;
        let metrics: Vec<MetricId> = if configured.is_empty() {
            table.schema().iter().cloned().collect()
        } else {
            configured.iter().map(|n| MetricId::new(n.as_str())).collect()
        };

        if let Some(unknown) = metrics.iter().find(|m| !table.has_metric(m)) {
            return Err(DashboardError::invalid(format!(
                "table column {} is not an ingested metric",
                unknown
            )));
        }

        let rows = table
            .rows()
            .iter()
            .map(|row| DataTableRow {
                date: row.date,
                values: metrics.iter().map(|m| row.value(m)).collect(),
            })
            .collect();

        Ok(DataTable {
            date_column: self.widgets_config.dashboard.date_column.clone(),
            columns: metrics.iter().map(|m| m.to_string()).collect(),
            rows,
        })
    }
}

fn value_axis(config: &AxisConfig, series: &[SeriesData], side: AxisSide) -> ValueAxis {
    let range = if config.auto {
        None
    } else {
        axis_range(
            series
                .iter()
                .filter(|s| s.axis == side)
                .flat_map(|s| s.values()),
            config.min,
            config.headroom,
        )
    };

    ValueAxis {
        title: config.title.clone(),
        range,
    }
}
