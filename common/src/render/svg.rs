use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use plotters::{
    coord::{
        Shift,
        ranged1d::{AsRangedCoord, BoldPoints, LightPoints, ValueFormatter},
    },
    element::DashedPathElement,
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};
use tracing::{debug, warn};

use super::{Backend, RenderError, RenderOptions, Renderer};
use crate::chart::{
    Chart, Grid, GridLines, LineStyle, Margins, Marker, PALETTE, Scale, SeriesKind, Style, Tick,
    format_value,
};

const DPI: f64 = 100.0;
const GRID_COLOR: RGBColor = RGBColor(176, 176, 176);
/// matplotlib's default subplot parameters
const DEFAULT_MARGINS: Margins = Margins {
    left: 0.125,
    bottom: 0.11,
    right: 0.9,
    top: 0.88,
};
/// plotters' mesh defaults
const MESH_LABELS: usize = 11;
const LIGHT_LINES: usize = 10;

/// Draws charts as SVG files with `plotters`.
pub struct SvgRenderer {
    style: Style,
}

impl SvgRenderer {
    pub fn new(style: Style, options: &RenderOptions) -> Result<Self, RenderError> {
        if let Some(format) = options.format.as_deref().filter(|f| *f != "svg") {
            return Err(RenderError::UnsupportedFormat {
                backend: Backend::Svg,
                format: format.to_owned(),
            });
        }
        if options.show {
            warn!("The svg backend cannot display charts, writing files only");
        }
        Ok(Self { style })
    }

    fn px(&self, points: f64) -> f64 {
        points * DPI / 72.0
    }

    fn stroke(&self, points: f64) -> u32 {
        self.px(points).round().max(1.0) as u32
    }

    fn draw<XR, YR>(
        &self,
        root: &DrawingArea<SVGBackend<'_>, Shift>,
        chart: &Chart,
        frame: &Frame,
        x_range: XR,
        y_range: YR,
    ) -> Result<(), RenderError>
    where
        XR: AsRangedCoord<Value = f64>,
        YR: AsRangedCoord<Value = f64>,
        XR::CoordDescType: ValueFormatter<f64>,
        YR::CoordDescType: ValueFormatter<f64>,
    {
        let (width, height) = root.dim_in_pixel();
        let (width, height) = (width as f64, height as f64);
        let margins = chart.margins.unwrap_or(DEFAULT_MARGINS);

        let mut ctx = ChartBuilder::on(root)
            .set_label_area_size(LabelAreaPosition::Left, (margins.left * width) as u32)
            .set_label_area_size(LabelAreaPosition::Bottom, (margins.bottom * height) as u32)
            .margin_right(((1.0 - margins.right) * width) as u32)
            .margin_top(((1.0 - margins.top) * height) as u32)
            .build_cartesian_2d(x_range, y_range)
            .map_err(|e| failed(chart, e))?;

        let family = self.style.font_family.as_str();
        let label_font = (family, self.px(self.style.label_size)).into_font();
        let tick_font = (family, self.px(self.style.tick_size)).into_font();

        // explicit ticks are drawn by hand below
        let x_formatter = |v: &f64| match chart.x.ticks {
            Some(_) => String::new(),
            None => short_label(*v),
        };
        let y_formatter = |v: &f64| match chart.y.ticks {
            Some(_) => String::new(),
            None => short_label(*v),
        };

        {
            let mut mesh = ctx.configure_mesh();
            mesh.x_desc(chart.x.label.as_str())
                .y_desc(chart.y.label.as_str())
                .axis_desc_style(label_font.clone())
                .label_style(tick_font.clone())
                .x_label_formatter(&x_formatter)
                .y_label_formatter(&y_formatter);
            match &chart.grid {
                Some(grid) if grid.line_style == LineStyle::Solid => {
                    mesh.bold_line_style(GRID_COLOR.mix(grid.alpha).stroke_width(self.stroke(grid.line_width)));
                    match grid.which {
                        GridLines::Major => mesh.light_line_style(TRANSPARENT.stroke_width(0)),
                        GridLines::Both => mesh.light_line_style(GRID_COLOR.mix(grid.alpha * 0.4).stroke_width(1)),
                    };
                }
                // dashed grids are drawn below
                _ => {
                    mesh.disable_mesh();
                }
            }
            mesh.draw().map_err(|e| failed(chart, e))?;
        }

        if let Some(grid) = chart.grid.as_ref().filter(|g| g.line_style != LineStyle::Solid) {
            let spec = ctx.as_coord_spec();
            let xs = grid_lines(spec.x_spec(), chart.x.ticks.as_deref(), grid.which);
            let ys = grid_lines(spec.y_spec(), chart.y.ticks.as_deref(), grid.which);
            let lines = xs
                .into_iter()
                .map(|(x, major)| (vec![(x, frame.y.0), (x, frame.y.1)], major))
                .chain(ys.into_iter().map(|(y, major)| (vec![(frame.x.0, y), (frame.x.1, y)], major)));
            for (points, major) in lines {
                self.draw_grid_line(&ctx, chart, grid, points, major)?;
            }
        }

        for (idx, series) in chart.series.iter().enumerate() {
            let color = parse_color(chart.series_color(idx))?;
            let width = self.stroke(series.line_width);
            let radius = (self.px(series.marker_size) / 2.0).round().max(1.0) as i32;

            let mut anno = match series.kind {
                SeriesKind::Line => {
                    match series.marker {
                        Marker::Circle => ctx.draw_series(series.points.iter().map(|&p| {
                            EmptyElement::at(p) + Circle::new((0, 0), radius, color.filled())
                        })),
                        Marker::Square => ctx.draw_series(series.points.iter().map(|&p| {
                            EmptyElement::at(p)
                                + Rectangle::new([(-radius, -radius), (radius, radius)], color.filled())
                        })),
                    }
                    .map_err(|e| failed(chart, e))?;
                    ctx.draw_series(LineSeries::new(
                        series.points.iter().copied(),
                        color.stroke_width(width),
                    ))
                    .map_err(|e| failed(chart, e))?
                }
                SeriesKind::Bar => {
                    let xs: Vec<f64> = series.points.iter().map(|(x, _)| *x).collect();
                    let base = frame.bar_base(chart.y.scale);
                    ctx.draw_series(series.points.iter().map(|&(x, y)| {
                        let (left, right) = bar_edges(x, &xs, chart.x.scale);
                        Rectangle::new([(left, base), (right, y)], color.mix(0.9).filled())
                    }))
                    .map_err(|e| failed(chart, e))?
                }
            };

            if let Some(label) = &series.label {
                anno.label(label.as_str()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(width))
                });
            }
        }

        for line in &chart.reference_lines {
            let width = self.stroke(line.line_width);
            let style = parse_color(&line.color)?.stroke_width(width);
            let points = vec![(frame.x.0, line.y), (frame.x.1, line.y)];
            let pattern = dash_pattern(line.line_style, width);
            let mut anno = match pattern {
                None => ctx.draw_series(LineSeries::new(points, style)),
                Some((dash, gap)) => ctx.draw_series(DashedLineSeries::new(points, dash, gap, style)),
            }
            .map_err(|e| failed(chart, e))?;

            if let Some(label) = &line.label {
                let anno = anno.label(label.as_str());
                match pattern {
                    None => anno.legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style)),
                    Some((dash, gap)) => anno.legend(move |(x, y)| {
                        DashedPathElement::new(vec![(x, y), (x + 20, y)], dash, gap, style)
                    }),
                };
            }
        }

        if let Some(ticks) = &chart.x.ticks {
            let style = TextStyle::from(tick_font.clone()).pos(Pos::new(HPos::Center, VPos::Top));
            for tick in ticks {
                let (x, y) = ctx.backend_coord(&(tick.value, frame.y.0));
                root.draw(&PathElement::new(vec![(x, y), (x, y + 5)], BLACK))
                    .map_err(|e| failed(chart, e))?;
                root.draw(&Text::new(tick.label.as_str(), (x, y + 8), style.clone()))
                    .map_err(|e| failed(chart, e))?;
            }
        }
        if let Some(ticks) = &chart.y.ticks {
            let style = TextStyle::from(tick_font.clone()).pos(Pos::new(HPos::Right, VPos::Center));
            for tick in ticks {
                let (x, y) = ctx.backend_coord(&(frame.x.0, tick.value));
                root.draw(&PathElement::new(vec![(x - 5, y), (x, y)], BLACK))
                    .map_err(|e| failed(chart, e))?;
                root.draw(&Text::new(tick.label.as_str(), (x - 8, y), style.clone()))
                    .map_err(|e| failed(chart, e))?;
            }
        }

        if chart.shows_legend() {
            ctx.configure_series_labels()
                .label_font((family, self.px(self.style.legend_size)).into_font())
                .position(SeriesLabelPosition::UpperLeft)
                .margin(10)
                .border_style(BLACK)
                .background_style(WHITE.mix(0.8).filled())
                .draw()
                .map_err(|e| failed(chart, e))?;
        }
        Ok(())
    }

    fn draw_grid_line<CT>(
        &self,
        ctx: &ChartContext<'_, SVGBackend<'_>, CT>,
        chart: &Chart,
        grid: &Grid,
        points: Vec<(f64, f64)>,
        major: bool,
    ) -> Result<(), RenderError>
    where
        CT: CoordTranslate<From = (f64, f64)>,
    {
        let (width, alpha) = match major {
            true => (self.stroke(grid.line_width), grid.alpha),
            false => (1, grid.alpha * 0.4),
        };
        let (dash, gap) = dash_pattern(grid.line_style, width).unwrap_or((width, 0));
        let style = GRID_COLOR.mix(alpha).stroke_width(width);
        ctx.plotting_area()
            .draw(&DashedPathElement::new(points, dash, gap, style))
            .map_err(|e| failed(chart, e))
    }
}

impl Renderer for SvgRenderer {
    fn render(&mut self, chart: &Chart, dir: &Path) -> Result<PathBuf, RenderError> {
        chart.validate()?;
        let frame = Frame::of(chart);
        let path = dir.join(format!("{}.svg", chart.name));
        let size = (
            (chart.size.0 * DPI).round() as u32,
            (chart.size.1 * DPI).round() as u32,
        );

        let root = SVGBackend::new(&path, size).into_drawing_area();
        root.fill(&WHITE).map_err(|e| failed(chart, e))?;
        let (x0, x1) = frame.x;
        let (y0, y1) = frame.y;
        match (chart.x.scale, chart.y.scale) {
            (Scale::Linear, Scale::Linear) => self.draw(&root, chart, &frame, x0..x1, y0..y1),
            (Scale::Log { base }, Scale::Linear) => {
                self.draw(&root, chart, &frame, (x0..x1).log_scale().base(base), y0..y1)
            }
            (Scale::Linear, Scale::Log { base }) => {
                self.draw(&root, chart, &frame, x0..x1, (y0..y1).log_scale().base(base))
            }
            (Scale::Log { base: x_base }, Scale::Log { base: y_base }) => self.draw(
                &root,
                chart,
                &frame,
                (x0..x1).log_scale().base(x_base),
                (y0..y1).log_scale().base(y_base),
            ),
        }?;
        root.present().map_err(|e| failed(chart, e))?;
        // the backend borrows `path` until dropped
        drop(root);
        debug!("Wrote {}", path.display());
        Ok(path)
    }
}

/// Padded data ranges of a chart.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Frame {
    x: (f64, f64),
    y: (f64, f64),
}

impl Frame {
    /// Only called on validated charts, which have at least one point.
    fn of(chart: &Chart) -> Self {
        let mut x = chart.x_bounds().unwrap_or((0.0, 1.0));
        for series in chart.series.iter().filter(|s| s.kind == SeriesKind::Bar) {
            let xs: Vec<f64> = series.points.iter().map(|(x, _)| *x).collect();
            for value in &xs {
                let (left, right) = bar_edges(*value, &xs, chart.x.scale);
                x = (x.0.min(left), x.1.max(right));
            }
        }
        let y = chart.y_bounds().unwrap_or((0.0, 1.0));
        Self {
            x: pad(x, chart.x.scale),
            y: pad(y, chart.y.scale),
        }
    }

    fn bar_base(&self, scale: Scale) -> f64 {
        match scale {
            Scale::Linear => 0.0,
            Scale::Log { .. } => self.y.0,
        }
    }
}

fn pad((lo, hi): (f64, f64), scale: Scale) -> (f64, f64) {
    match scale {
        Scale::Linear => {
            let span = if hi > lo { hi - lo } else { lo.abs().max(1.0) };
            (lo - span * 0.05, hi + span * 0.05)
        }
        Scale::Log { .. } => {
            let ratio = if hi > lo { (hi / lo).powf(0.05) } else { 2.0 };
            (lo / ratio, hi * ratio)
        }
    }
}

fn bar_edges(x: f64, xs: &[f64], scale: Scale) -> (f64, f64) {
    let mut sorted = xs.to_vec();
    sorted.sort_by(f64::total_cmp);
    match scale {
        Scale::Linear => {
            let gap = sorted
                .windows(2)
                .map(|w| w[1] - w[0])
                .filter(|gap| *gap > 0.0)
                .fold(f64::INFINITY, f64::min);
            let half = if gap.is_finite() { gap * 0.4 } else { 0.4 };
            (x - half, x + half)
        }
        Scale::Log { .. } => {
            let ratio = sorted
                .windows(2)
                .map(|w| w[1] / w[0])
                .filter(|ratio| *ratio > 1.0)
                .fold(f64::INFINITY, f64::min);
            let factor = if ratio.is_finite() { ratio.powf(0.4) } else { 1.5 };
            (x / factor, x * factor)
        }
    }
}

/// Dash and gap length in pixels, `None` for solid lines.
fn dash_pattern(style: LineStyle, width: u32) -> Option<(u32, u32)> {
    match style {
        LineStyle::Solid => None,
        LineStyle::Dashed => Some((width * 4, width * 2)),
        LineStyle::Dotted => Some((width, width * 2)),
    }
}

/// Grid positions on one axis, flagged `true` for major lines. Major lines
/// follow explicit ticks when the axis has them.
fn grid_lines<R: Ranged<ValueType = f64>>(
    range: &R,
    ticks: Option<&[Tick]>,
    which: GridLines,
) -> Vec<(f64, bool)> {
    let bounds = range.range();
    let major: Vec<f64> = match ticks {
        Some(ticks) => ticks
            .iter()
            .map(|t| t.value)
            .filter(|v| bounds.contains(v))
            .collect(),
        None => range.key_points(BoldPoints(MESH_LABELS)),
    };
    let mut lines: Vec<(f64, bool)> = major.iter().map(|v| (*v, true)).collect();
    if which == GridLines::Both {
        let minor = range.key_points(LightPoints::new(MESH_LABELS, MESH_LABELS * LIGHT_LINES));
        lines.extend(minor.into_iter().filter(|v| !major.contains(v)).map(|v| (v, false)));
    }
    lines
}

fn short_label(value: f64) -> String {
    format_value((value * 1e6).round() / 1e6)
}

fn failed<E: Display>(chart: &Chart, err: E) -> RenderError {
    RenderError::Draw {
        chart: chart.name.clone(),
        reason: err.to_string(),
    }
}

/// Accepts `#rrggbb` and the matplotlib color names the reports use.
pub fn parse_color(color: &str) -> Result<RGBColor, RenderError> {
    let tab = |idx: usize| parse_color(PALETTE[idx]);
    match color {
        "black" | "k" => Ok(BLACK),
        "white" | "w" => Ok(WHITE),
        "red" | "r" => Ok(RGBColor(255, 0, 0)),
        "green" | "g" => Ok(RGBColor(0, 128, 0)),
        "blue" | "b" => Ok(RGBColor(0, 0, 255)),
        "orange" => Ok(RGBColor(255, 165, 0)),
        "gray" | "grey" => Ok(RGBColor(128, 128, 128)),
        "tab:blue" => tab(0),
        "tab:orange" => tab(1),
        "tab:green" => tab(2),
        "tab:red" => tab(3),
        "tab:purple" => tab(4),
        "tab:brown" => tab(5),
        "tab:pink" => tab(6),
        "tab:gray" | "tab:grey" => tab(7),
        "tab:olive" => tab(8),
        "tab:cyan" => tab(9),
        hex => {
            let digits = hex
                .strip_prefix('#')
                .filter(|d| d.len() == 6 && d.is_ascii())
                .ok_or_else(|| RenderError::Color(color.to_owned()))?;
            let channel = |range: std::ops::Range<usize>| {
                u8::from_str_radix(&digits[range], 16).map_err(|_| RenderError::Color(color.to_owned()))
            };
            Ok(RGBColor(channel(0..2)?, channel(2..4)?, channel(4..6)?))
        }
    }
}
