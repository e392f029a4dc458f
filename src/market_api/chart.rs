use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// What the renderer should read `PlotPoint::x` as.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    /// Seconds since the Unix epoch of the exchange-local timestamp.
    WallClock,
    /// Synthetic `sequence_index` of stitched session rows.
    Sequence,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlotPoint {
    pub x: f64,
    /// `None` breaks the line.
    pub y: Option<f64>,
    pub hover: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChartTrace {
    pub name: String,
    pub color: String,
    pub width: f64,
    pub dashed: bool,
    pub legend_group: Option<String>,
    pub show_legend: bool,
    /// Invisible trace that only carries hover text.
    pub hover_only: bool,
    pub points: Vec<PlotPoint>,
}

impl ChartTrace {
    pub fn line(name: impl Into<String>, color: impl Into<String>, width: f64) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            width,
            dashed: false,
            legend_group: None,
            show_legend: true,
            hover_only: false,
            points: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct AxisTicks {
    pub values: Vec<f64>,
    pub labels: Vec<String>,
}

impl AxisTicks {
    pub fn push(&mut self, value: f64, label: impl Into<String>) {
        self.values.push(value);
        self.labels.push(label.into());
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub x_axis: AxisKind,
    pub x_title: Option<String>,
    pub y_title: Option<String>,
    pub traces: Vec<ChartTrace>,
    pub x_ticks: Option<AxisTicks>,
    pub y_ticks: Option<AxisTicks>,
    pub x_range: Option<(f64, f64)>,
    pub y_range: Option<(f64, f64)>,
    /// Horizontal rule in shared-axis units.
    pub separator_y: Option<f64>,
}

impl ChartSpec {
    pub fn new(title: impl Into<String>, x_axis: AxisKind) -> Self {
        Self {
            title: title.into(),
            x_axis,
            x_title: None,
            y_title: None,
            traces: Vec::new(),
            x_ticks: None,
            y_ticks: None,
            x_range: None,
            y_range: None,
            separator_y: None,
        }
    }
}

pub fn wall_clock_x(ts: NaiveDateTime) -> f64 {
    ts.and_utc().timestamp() as f64
}
