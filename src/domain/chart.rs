// Chart description domain models
use chrono::NaiveDate;

/// A plotted point. `None` is a gap, never zero.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl TimeSeriesPoint {
    pub fn new(date: NaiveDate, value: Option<f64>) -> Self {
        Self { date, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSide {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesData {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub axis: AxisSide,
    pub points: Vec<TimeSeriesPoint>,
}

impl SeriesData {
    pub fn new(
        id: String,
        name: String,
        color: Option<String>,
        axis: AxisSide,
        points: Vec<TimeSeriesPoint>,
    ) -> Self {
        Self {
            id,
            name,
            color,
            axis,
            points,
        }
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().filter_map(|p| p.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueAxis {
    pub title: String,
    pub range: Option<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateAxis {
    pub title: String,
    pub range: Option<(NaiveDate, NaiveDate)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    DualAxis,
    PercentChange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub id: String,
    pub title: String,
    pub kind: ChartKind,
    pub x_axis: DateAxis,
    pub y_axis: ValueAxis,
    pub y2_axis: Option<ValueAxis>,
    /// Lag window of the derived series, for percent-change charts.
    pub lag: Option<usize>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub series: Vec<SeriesData>,
}

/// `[floor, max + headroom * |max|]` over the plotted values. `floor`
/// falls back to the observed minimum when unset or not below the upper
/// bound. `None` when nothing is plotted.
pub fn axis_range(
    values: impl IntoIterator<Item = f64>,
    floor: Option<f64>,
    headroom: f64,
) -> Option<(f64, f64)> {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;

    let upper = max + headroom * max.abs();
    let lower = floor.filter(|f| *f < upper).unwrap_or(min);
    Some((lower, upper))
}
