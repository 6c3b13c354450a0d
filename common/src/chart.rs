//! Backend independent chart descriptions.
//!
//! A [`Chart`] carries everything needed to draw one figure, so renderers
//! never depend on state left behind by a previous chart.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// matplotlib's `tab10` cycle, used for series without an explicit color.
pub const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    #[error("chart {chart}: {axis} axis is logarithmic but contains {value}")]
    NonPositiveOnLogAxis {
        chart: String,
        axis: &'static str,
        value: f64,
    },
    #[error("chart {chart}: invalid logarithm base {base}")]
    InvalidLogBase { chart: String, base: f64 },
    #[error("chart {0}: nothing to draw")]
    Empty(String),
}

/// Figure-wide text settings, applied once per renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    pub font_size: f64,
    pub title_size: f64,
    pub label_size: f64,
    pub legend_size: f64,
    pub tick_size: f64,
    pub font_family: String,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            title_size: 20.0,
            label_size: 20.0,
            legend_size: 16.0,
            tick_size: 16.0,
            font_family: "DejaVu Sans".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Scale {
    Linear,
    Log { base: f64 },
}

impl Scale {
    pub fn log2() -> Self {
        Self::Log { base: 2.0 }
    }

    pub fn log10() -> Self {
        Self::Log { base: 10.0 }
    }

    pub fn is_log(&self) -> bool {
        matches!(self, Self::Log { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub value: f64,
    pub label: String,
}

impl Tick {
    pub fn new(value: f64, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }

    /// A tick labelled with its own value, without a trailing `.0` for
    /// integers.
    pub fn at(value: f64) -> Self {
        Self::new(value, format_value(value))
    }
}

pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub label: String,
    pub scale: Scale,
    /// Explicit tick positions; backends pick their own when `None`
    pub ticks: Option<Vec<Tick>>,
}

impl Axis {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            scale: Scale::Linear,
            ticks: None,
        }
    }

    pub fn scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    pub fn ticks(mut self, ticks: Vec<Tick>) -> Self {
        self.ticks = Some(ticks);
        self
    }

    pub fn ticks_at(self, values: &[f64]) -> Self {
        self.ticks(values.iter().map(|v| Tick::at(*v)).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Marker {
    Circle,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SeriesKind {
    Line,
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub label: Option<String>,
    pub points: Vec<(f64, f64)>,
    pub kind: SeriesKind,
    pub marker: Marker,
    pub color: Option<String>,
    pub line_width: f64,
    pub marker_size: f64,
}

impl Series {
    pub fn line(points: Vec<(f64, f64)>) -> Self {
        Self {
            label: None,
            points,
            kind: SeriesKind::Line,
            marker: Marker::Circle,
            color: None,
            line_width: 1.5,
            marker_size: 6.0,
        }
    }

    pub fn bars(points: Vec<(f64, f64)>) -> Self {
        Self {
            kind: SeriesKind::Bar,
            ..Self::line(points)
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        self.marker = marker;
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }

    pub fn marker_size(mut self, size: f64) -> Self {
        self.marker_size = size;
        self
    }
}

/// A horizontal line across the whole plot, e.g. a mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLine {
    pub y: f64,
    pub label: Option<String>,
    pub color: String,
    pub line_style: LineStyle,
    pub line_width: f64,
}

impl ReferenceLine {
    pub fn new(y: f64, color: impl Into<String>) -> Self {
        Self {
            y,
            label: None,
            color: color.into(),
            line_style: LineStyle::Dashed,
            line_width: 1.5,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GridLines {
    Major,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub which: GridLines,
    pub line_style: LineStyle,
    pub line_width: f64,
    pub alpha: f64,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            which: GridLines::Major,
            line_style: LineStyle::Solid,
            line_width: 0.8,
            alpha: 1.0,
        }
    }
}

impl Grid {
    /// Thin dashed lines on major and minor ticks.
    pub fn fine() -> Self {
        Self {
            which: GridLines::Both,
            line_style: LineStyle::Dashed,
            line_width: 0.5,
            alpha: 1.0,
        }
    }

    pub fn dotted() -> Self {
        Self {
            line_style: LineStyle::Dotted,
            alpha: 0.7,
            ..Self::default()
        }
    }
}

/// Subplot edges as fractions of the figure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl Margins {
    pub const REPORT: Margins = Margins {
        left: 0.09,
        bottom: 0.09,
        right: 0.95,
        top: 0.95,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Legend {
    /// Shown when there are at least two labelled entries
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    /// File stem of the rendered chart
    pub name: String,
    /// Figure size in inches
    pub size: (f64, f64),
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
    pub reference_lines: Vec<ReferenceLine>,
    pub grid: Option<Grid>,
    pub legend: Legend,
    pub margins: Option<Margins>,
}

impl Chart {
    pub fn new(name: impl Into<String>, x: Axis, y: Axis) -> Self {
        Self {
            name: name.into(),
            size: (10.0, 6.0),
            x,
            y,
            series: Vec::new(),
            reference_lines: Vec::new(),
            grid: None,
            legend: Legend::Auto,
            margins: None,
        }
    }

    pub fn series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    pub fn reference_line(mut self, line: ReferenceLine) -> Self {
        self.reference_lines.push(line);
        self
    }

    pub fn grid(mut self, grid: Grid) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn legend(mut self, legend: Legend) -> Self {
        self.legend = legend;
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.margins = Some(margins);
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.size = (width, height);
        self
    }

    /// Color of the `idx`-th series, falling back to the palette.
    pub fn series_color(&self, idx: usize) -> &str {
        self.series
            .get(idx)
            .and_then(|s| s.color.as_deref())
            .unwrap_or(PALETTE[idx % PALETTE.len()])
    }

    pub fn legend_entries(&self) -> Vec<&str> {
        self.series
            .iter()
            .filter_map(|s| s.label.as_deref())
            .chain(self.reference_lines.iter().filter_map(|l| l.label.as_deref()))
            .collect()
    }

    pub fn shows_legend(&self) -> bool {
        match self.legend {
            Legend::Auto => self.legend_entries().len() > 1,
            Legend::Always => !self.legend_entries().is_empty(),
            Legend::Never => false,
        }
    }

    /// Smallest and largest x over all points and explicit ticks.
    pub fn x_bounds(&self) -> Option<(f64, f64)> {
        let ticks = self.x.ticks.iter().flatten().map(|t| t.value);
        bounds(self.points().map(|(x, _)| x).chain(ticks))
    }

    /// Smallest and largest y over all points, reference lines and explicit
    /// ticks. Bar charts on a linear axis always include zero.
    pub fn y_bounds(&self) -> Option<(f64, f64)> {
        let ticks = self.y.ticks.iter().flatten().map(|t| t.value);
        let lines = self.reference_lines.iter().map(|l| l.y);
        let (lo, hi) = bounds(self.points().map(|(_, y)| y).chain(lines).chain(ticks))?;
        let has_bars = self.series.iter().any(|s| s.kind == SeriesKind::Bar);
        if has_bars && !self.y.scale.is_log() {
            Some((lo.min(0.0), hi.max(0.0)))
        } else {
            Some((lo, hi))
        }
    }

    fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.series.iter().flat_map(|s| s.points.iter().copied())
    }

    /// Checks the chart can be drawn with its scales.
    pub fn validate(&self) -> Result<(), ChartError> {
        if self.series.iter().all(|s| s.points.is_empty()) {
            return Err(ChartError::Empty(self.name.clone()));
        }
        for (axis, scale) in [("x", self.x.scale), ("y", self.y.scale)] {
            if let Scale::Log { base } = scale {
                if !(base > 0.0 && base != 1.0 && base.is_finite()) {
                    return Err(ChartError::InvalidLogBase {
                        chart: self.name.clone(),
                        base,
                    });
                }
                let values: Vec<f64> = match axis {
                    "x" => self.points().map(|(x, _)| x).collect(),
                    _ => self
                        .points()
                        .map(|(_, y)| y)
                        .chain(self.reference_lines.iter().map(|l| l.y))
                        .collect(),
                };
                if let Some(value) = values.into_iter().find(|v| *v <= 0.0) {
                    return Err(ChartError::NonPositiveOnLogAxis {
                        chart: self.name.clone(),
                        axis,
                        value,
                    });
                }
            }
        }
        Ok(())
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_series() -> Chart {
        Chart::new("rps", Axis::new("connections"), Axis::new("rps"))
            .series(Series::line(vec![(1.0, 10.0), (8.0, 40.0)]).label("1 thread"))
            .series(Series::line(vec![(2.0, 5.0)]).label("2 threads").color("red"))
    }

    #[test]
    fn legend_needs_two_entries() {
        let chart = two_series();
        assert_eq!(chart.legend_entries(), vec!["1 thread", "2 threads"]);
        assert!(chart.shows_legend());

        let single = Chart::new("t", Axis::new("x"), Axis::new("y"))
            .series(Series::line(vec![(1.0, 1.0)]).label("only"));
        assert!(!single.shows_legend());
        assert!(single.clone().legend(Legend::Always).shows_legend());

        let with_mean = single.reference_line(ReferenceLine::new(1.0, "red").label("Mean: 1.00"));
        assert!(with_mean.shows_legend());
        assert!(!with_mean.legend(Legend::Never).shows_legend());
    }

    #[test]
    fn colors_fall_back_to_palette() {
        let chart = two_series();
        assert_eq!(chart.series_color(0), PALETTE[0]);
        assert_eq!(chart.series_color(1), "red");
    }

    #[test]
    fn bounds_cover_points_lines_and_ticks() {
        let chart = two_series()
            .reference_line(ReferenceLine::new(50.0, "green"))
            .with_x(Axis::new("connections").ticks_at(&[0.5, 16.0]));
        assert_eq!(chart.x_bounds(), Some((0.5, 16.0)));
        assert_eq!(chart.y_bounds(), Some((5.0, 50.0)));

        let bars = Chart::new("b", Axis::new("x"), Axis::new("y"))
            .series(Series::bars(vec![(1.0, 3.0), (2.0, 4.0)]));
        assert_eq!(bars.y_bounds(), Some((0.0, 4.0)));
    }

    #[test]
    fn log_axes_reject_non_positive_values() {
        let chart = two_series();
        assert_eq!(chart.validate(), Ok(()));

        let mut log = chart.clone();
        log.x.scale = Scale::log2();
        assert_eq!(log.validate(), Ok(()));

        log.series.push(Series::line(vec![(0.0, 1.0)]));
        assert!(matches!(
            log.validate(),
            Err(ChartError::NonPositiveOnLogAxis { axis: "x", .. })
        ));

        let mut bad_base = chart;
        bad_base.y.scale = Scale::Log { base: 1.0 };
        assert!(matches!(
            bad_base.validate(),
            Err(ChartError::InvalidLogBase { .. })
        ));

        let empty = Chart::new("e", Axis::new("x"), Axis::new("y"));
        assert_eq!(empty.validate(), Err(ChartError::Empty("e".to_owned())));
    }

    #[test]
    fn tick_labels_drop_integer_fraction() {
        assert_eq!(Tick::at(64.0).label, "64");
        assert_eq!(Tick::at(0.25).label, "0.25");
    }

    impl Chart {
        fn with_x(mut self, axis: Axis) -> Self {
            self.x = axis;
            self
        }
    }
}
