use std::path::{Path, PathBuf};

use pyo3::{
    prelude::*,
    types::{PyDict, PyTuple},
};
use tracing::debug;

use super::{Backend, RenderError, RenderOptions, Renderer};
use crate::chart::{Chart, GridLines, LineStyle, Marker, Scale, SeriesKind, Style};

/// Draws charts with matplotlib.
///
/// Every chart gets its own figure and axes objects; nothing is drawn through
/// pyplot's implicit current figure.
pub struct PyPlotRenderer {
    format: String,
    show: bool,
    shown: usize,
}

impl PyPlotRenderer {
    pub fn new(style: &Style, options: &RenderOptions) -> Result<Self, RenderError> {
        Python::with_gil(|py| -> PyResult<()> {
            let plt = py.import("matplotlib.pyplot")?;
            let params = PyDict::new(py);
            params.set_item("font.size", style.font_size)?;
            params.set_item("font.family", style.font_family.as_str())?;
            params.set_item("axes.titlesize", style.title_size)?;
            params.set_item("axes.labelsize", style.label_size)?;
            params.set_item("legend.fontsize", style.legend_size)?;
            params.set_item("xtick.labelsize", style.tick_size)?;
            params.set_item("ytick.labelsize", style.tick_size)?;
            plt.getattr("rcParams")?.call_method1("update", (params,))?;
            Ok(())
        })?;
        Ok(Self {
            format: options
                .format
                .clone()
                .unwrap_or_else(|| Backend::Matplotlib.default_format().to_owned()),
            show: options.show,
            shown: 0,
        })
    }
}

impl Renderer for PyPlotRenderer {
    fn render(&mut self, chart: &Chart, dir: &Path) -> Result<PathBuf, RenderError> {
        chart.validate()?;
        let path = dir.join(format!("{}.{}", chart.name, self.format));
        Python::with_gil(|py| draw(py, chart, &path, self.show))?;
        if self.show {
            self.shown += 1;
        }
        debug!("Wrote {}", path.display());
        Ok(path)
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        if self.shown == 0 {
            return Ok(());
        }
        Python::with_gil(|py| -> PyResult<()> {
            py.import("matplotlib.pyplot")?.call_method0("show")?;
            Ok(())
        })?;
        Ok(())
    }
}

fn draw(py: Python<'_>, chart: &Chart, path: &Path, show: bool) -> PyResult<()> {
    let plt = py.import("matplotlib.pyplot")?;

    let kwargs = PyDict::new(py);
    kwargs.set_item("figsize", chart.size)?;
    let subplots = plt.call_method("subplots", (), Some(&kwargs))?;
    let subplots = subplots.downcast::<PyTuple>()?;
    let fig = subplots.get_item(0)?;
    let ax = subplots.get_item(1)?;

    for (idx, series) in chart.series.iter().enumerate() {
        let xs: Vec<f64> = series.points.iter().map(|(x, _)| *x).collect();
        let ys: Vec<f64> = series.points.iter().map(|(_, y)| *y).collect();
        let kwargs = PyDict::new(py);
        kwargs.set_item("color", chart.series_color(idx))?;
        if let Some(label) = &series.label {
            kwargs.set_item("label", label.as_str())?;
        }
        match series.kind {
            SeriesKind::Line => {
                kwargs.set_item("marker", marker(series.marker))?;
                kwargs.set_item("linewidth", series.line_width)?;
                kwargs.set_item("markersize", series.marker_size)?;
                ax.call_method("plot", (xs, ys), Some(&kwargs))?;
            }
            SeriesKind::Bar => {
                kwargs.set_item("width", bar_widths(&xs, chart.x.scale))?;
                ax.call_method("bar", (xs, ys), Some(&kwargs))?;
            }
        }
    }

    for line in &chart.reference_lines {
        let kwargs = PyDict::new(py);
        kwargs.set_item("color", line.color.as_str())?;
        kwargs.set_item("linestyle", line_style(line.line_style))?;
        kwargs.set_item("linewidth", line.line_width)?;
        if let Some(label) = &line.label {
            kwargs.set_item("label", label.as_str())?;
        }
        ax.call_method("axhline", (line.y,), Some(&kwargs))?;
    }

    for (setter, scale) in [("set_xscale", chart.x.scale), ("set_yscale", chart.y.scale)] {
        if let Scale::Log { base } = scale {
            let kwargs = PyDict::new(py);
            kwargs.set_item("base", base)?;
            ax.call_method(setter, ("log",), Some(&kwargs))?;
        }
    }

    ax.call_method1("set_xlabel", (chart.x.label.as_str(),))?;
    ax.call_method1("set_ylabel", (chart.y.label.as_str(),))?;
    if let Some(ticks) = &chart.x.ticks {
        let values: Vec<f64> = ticks.iter().map(|t| t.value).collect();
        let labels: Vec<&str> = ticks.iter().map(|t| t.label.as_str()).collect();
        ax.call_method1("set_xticks", (values,))?;
        ax.call_method1("set_xticklabels", (labels,))?;
    }
    if let Some(ticks) = &chart.y.ticks {
        let values: Vec<f64> = ticks.iter().map(|t| t.value).collect();
        let labels: Vec<&str> = ticks.iter().map(|t| t.label.as_str()).collect();
        ax.call_method1("set_yticks", (values,))?;
        ax.call_method1("set_yticklabels", (labels,))?;
    }

    if let Some(grid) = &chart.grid {
        let kwargs = PyDict::new(py);
        kwargs.set_item(
            "which",
            match grid.which {
                GridLines::Major => "major",
                GridLines::Both => "both",
            },
        )?;
        kwargs.set_item("linestyle", line_style(grid.line_style))?;
        kwargs.set_item("linewidth", grid.line_width)?;
        kwargs.set_item("alpha", grid.alpha)?;
        ax.call_method("grid", (true,), Some(&kwargs))?;
    }

    if chart.shows_legend() {
        ax.call_method0("legend")?;
    }

    if let Some(margins) = chart.margins {
        let kwargs = PyDict::new(py);
        kwargs.set_item("left", margins.left)?;
        kwargs.set_item("bottom", margins.bottom)?;
        kwargs.set_item("right", margins.right)?;
        kwargs.set_item("top", margins.top)?;
        fig.call_method("subplots_adjust", (), Some(&kwargs))?;
    } else {
        fig.call_method0("tight_layout")?;
    }

    fig.call_method1("savefig", (path.to_string_lossy().as_ref(),))?;
    if !show {
        plt.call_method1("close", (fig,))?;
    }
    Ok(())
}

fn marker(marker: Marker) -> &'static str {
    match marker {
        Marker::Circle => "o",
        Marker::Square => "s",
    }
}

fn line_style(style: LineStyle) -> &'static str {
    match style {
        LineStyle::Solid => "-",
        LineStyle::Dashed => "--",
        LineStyle::Dotted => ":",
    }
}

/// Bar widths in data units; on a log axis a fixed width would shrink towards
/// the left, so each bar is scaled to its position.
fn bar_widths(xs: &[f64], scale: Scale) -> Vec<f64> {
    let mut sorted = xs.to_vec();
    sorted.sort_by(f64::total_cmp);
    match scale {
        Scale::Linear => {
            let gap = sorted
                .windows(2)
                .map(|w| w[1] - w[0])
                .filter(|gap| *gap > 0.0)
                .fold(f64::INFINITY, f64::min);
            let width = if gap.is_finite() { gap * 0.8 } else { 0.8 };
            vec![width; xs.len()]
        }
        Scale::Log { .. } => xs.iter().map(|x| x * 0.5).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{Axis, Grid, Margins, ReferenceLine, Series, Tick};

    #[test]
    fn writes_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let options = RenderOptions::default();
        let mut renderer = PyPlotRenderer::new(&Style::default(), &options).unwrap();
        let chart = Chart::new(
            "time_vs_size",
            Axis::new("Size")
                .scale(Scale::log10())
                .ticks(vec![Tick::new(1024.0, "1 KB"), Tick::new(1048576.0, "1 MB")]),
            Axis::new("Time (ms)").scale(Scale::log10()),
        )
        .series(Series::line(vec![(1024.0, 0.5), (1048576.0, 12.0)]).label("Avg time"))
        .reference_line(ReferenceLine::new(3.0, "green").label("Mean: 3.00"))
        .grid(Grid::fine())
        .margins(Margins::REPORT);

        let path = renderer.render(&chart, dir.path()).unwrap();
        renderer.finish().unwrap();
        assert_eq!(path, dir.path().join("time_vs_size.pdf"));
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn bar_widths_follow_scale() {
        assert_eq!(bar_widths(&[1.0, 3.0, 2.0], Scale::Linear), vec![0.8; 3]);
        assert_eq!(bar_widths(&[10.0, 100.0], Scale::log10()), vec![5.0, 50.0]);
    }
}
