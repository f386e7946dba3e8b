// Date-indexed time series and fixed-lag percentage change
use super::error::{DashboardError, DashboardResult};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of a numeric metric column, e.g. `Sites_Scanned`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricId(String);

impl MetricId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MetricId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// One observation. A metric present with an empty cell is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesRow {
    pub date: NaiveDate,
    pub metrics: BTreeMap<MetricId, Option<f64>>,
}

impl TimeSeriesRow {
    pub fn new(date: NaiveDate, metrics: BTreeMap<MetricId, Option<f64>>) -> Self {
        Self { date, metrics }
    }

    pub fn value(&self, metric: &MetricId) -> Option<f64> {
        self.metrics.get(metric).copied().flatten()
    }
}

/// Values derived from `metric` at a fixed `lag`, aligned index-for-index
/// with the table they were computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedColumn {
    pub metric: MetricId,
    pub lag: usize,
    pub prior_values: Vec<Option<f64>>,
    pub percent_changes: Vec<Option<f64>>,
}

impl DerivedColumn {
    pub fn len(&self) -> usize {
        self.percent_changes.len()
    }

    pub fn percent_change(&self, index: usize) -> Option<f64> {
        self.percent_changes.get(index).copied().flatten()
    }
}

/// Rows strictly ascending by date, all sharing the same metric set.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    rows: Vec<TimeSeriesRow>,
    schema: BTreeSet<MetricId>,
    derived: Vec<DerivedColumn>,
}

impl TimeSeriesTable {
    pub fn new(rows: Vec<TimeSeriesRow>) -> DashboardResult<Self> {
        ensure_ascending(&rows)?;

        let schema: BTreeSet<MetricId> = rows
            .first()
            .map(|row| row.metrics.keys().cloned().collect())
            .unwrap_or_default();

        for (idx, row) in rows.iter().enumerate() {
            if let Some(missing) = schema.iter().find(|m| !row.metrics.contains_key(*m)) {
                return Err(DashboardError::invalid(format!(
                    "metric {} is absent from row {} ({})",
                    missing,
                    idx + 1,
                    row.date
                )));
            }
            if let Some(extra) = row.metrics.keys().find(|m| !schema.contains(*m)) {
                return Err(DashboardError::invalid(format!(
                    "metric {} in row {} ({}) is absent from the first row",
                    extra,
                    idx + 1,
                    row.date
                )));
            }
        }

        Ok(Self {
            rows,
            schema,
            derived: Vec::new(),
        })
    }

    pub fn rows(&self) -> &[TimeSeriesRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn schema(&self) -> &BTreeSet<MetricId> {
        &self.schema
    }

    pub fn has_metric(&self, metric: &MetricId) -> bool {
        self.schema.contains(metric)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.iter().map(|row| row.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|row| row.date)
    }

    pub fn metric_values(&self, metric: &MetricId) -> DashboardResult<Vec<Option<f64>>> {
        if !self.has_metric(metric) {
            return Err(unknown_metric(metric));
        }
        Ok(self.rows.iter().map(|row| row.value(metric)).collect())
    }

    pub fn derived(&self) -> &[DerivedColumn] {
        &self.derived
    }

    pub fn derived_column(&self, metric: &MetricId, lag: usize) -> Option<&DerivedColumn> {
        self.derived
            .iter()
            .find(|c| &c.metric == metric && c.lag == lag)
    }

    /// Returns a new table carrying the `(metric, lag)` column in addition
    /// to any already derived. `self` is left untouched.
    pub fn with_derived(&self, metric: &MetricId, lag: usize) -> DashboardResult<Self> {
        let column = PercentChangeSeries::compute(self, metric, lag)?;

        let mut next = self.clone();
        next.derived
            .retain(|c| !(c.metric == column.metric && c.lag == column.lag));
        next.derived.push(column);
        Ok(next)
    }
}

pub struct PercentChangeSeries;

impl PercentChangeSeries {
    /// `(x[t] - x[t-lag]) / x[t-lag] * 100` for every row. The first `lag`
    /// rows, zero or missing priors, and missing current values yield `None`.
    pub fn compute(
        table: &TimeSeriesTable,
        metric: &MetricId,
        lag: usize,
    ) -> DashboardResult<DerivedColumn> {
        if lag < 1 {
            return Err(DashboardError::invalid("lag must be at least 1"));
        }
        if !table.has_metric(metric) {
            return Err(unknown_metric(metric));
        }
        ensure_ascending(table.rows())?;

        let rows = table.rows();
        let mut prior_values = Vec::with_capacity(rows.len());
        let mut percent_changes = Vec::with_capacity(rows.len());

        for (i, row) in rows.iter().enumerate() {
            if i < lag {
                prior_values.push(None);
                percent_changes.push(None);
                continue;
            }

            let prior = rows[i - lag].value(metric);
            prior_values.push(prior);
            percent_changes.push(percent_change(row.value(metric), prior));
        }

        Ok(DerivedColumn {
            metric: metric.clone(),
            lag,
            prior_values,
            percent_changes,
        })
    }
}

fn percent_change(current: Option<f64>, prior: Option<f64>) -> Option<f64> {
    let (current, prior) = (current?, prior?);
    if prior == 0.0 {
        return None;
    }
    let change = (current - prior) / prior * 100.0;
    change.is_finite().then_some(change)
}

fn unknown_metric(metric: &MetricId) -> DashboardError {
    DashboardError::invalid(format!("unknown metric column {}", metric))
}

fn ensure_ascending(rows: &[TimeSeriesRow]) -> DashboardResult<()> {
    for (idx, pair) in rows.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.date == prev.date {
            return Err(DashboardError::invalid(format!(
                "duplicate date {} at rows {} and {}",
                next.date,
                idx + 1,
                idx + 2
            )));
        }
        if next.date < prev.date {
            return Err(DashboardError::invalid(format!(
                "dates out of order: {} (row {}) follows {} (row {})",
                next.date,
                idx + 2,
                prev.date,
                idx + 1
            )));
        }
    }
    Ok(())
}
