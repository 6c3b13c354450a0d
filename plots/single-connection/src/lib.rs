use common::{
    chart::{Axis, Chart, Grid, Margins, ReferenceLine, Series},
    plot::Plot,
    series::{Column, select_series},
    table::Table,
    util::mean,
};
use eyre::{ContextCompat, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Repeated transfers over a single connection: throughput and duration of
/// every launch, each with its mean drawn across the chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleConnection {
    pub input: String,
    pub launch: String,
    pub throughput: String,
    pub time: String,
    pub x_label: String,
    pub throughput_label: String,
    pub time_label: String,
    /// Legend entry of the measured throughput
    pub throughput_name: String,
    /// Legend entry of the measured time
    pub time_name: String,
    /// Decimals of the mean in the legend
    pub mean_precision: usize,
}

impl Default for SingleConnection {
    fn default() -> Self {
        Self {
            input: "one_conn.csv".to_owned(),
            launch: "launch".to_owned(),
            throughput: "transfer/Sec".to_owned(),
            time: "time".to_owned(),
            x_label: "Launch".to_owned(),
            throughput_label: "Throughput, MB/s".to_owned(),
            time_label: "Execution time, ms".to_owned(),
            throughput_name: "Throughput".to_owned(),
            time_name: "Execution time".to_owned(),
            mean_precision: 2,
        }
    }
}

struct Measurement<'a> {
    chart: &'a str,
    column: &'a str,
    y_label: &'a str,
    name: &'a str,
    unit: &'a str,
    mean_line: ReferenceLine,
    grid: Grid,
}

impl SingleConnection {
    fn chart(&self, table: &Table, measurement: Measurement<'_>) -> Result<Chart> {
        let data = select_series(
            table,
            &Column::number(&self.launch),
            &Column::number(measurement.column),
            None,
        )?
        .pop()
        .with_context(|| format!("No launches for {}", measurement.chart))?;

        let average = mean(&data.ys()).with_context(|| format!("No samples for {}", measurement.chart))?;
        debug!("Mean {} over {} launches: {average}", measurement.column, data.points.len());

        let mut mean_line = measurement.mean_line;
        mean_line.y = average;
        let mean_line = mean_line.label(format!(
            "Mean: {average:.precision$} {}",
            measurement.unit,
            precision = self.mean_precision
        ));

        Ok(Chart::new(
            measurement.chart,
            Axis::new(&self.x_label).ticks_at(&data.xs()),
            Axis::new(measurement.y_label),
        )
        .series(
            Series::line(data.points)
                .label(measurement.name)
                .line_width(2.0)
                .marker_size(8.0),
        )
        .reference_line(mean_line)
        .grid(measurement.grid)
        .margins(Margins::REPORT))
    }
}

#[async_trait::async_trait]
#[typetag::serde]
impl Plot for SingleConnection {
    fn input(&self) -> &str {
        &self.input
    }

    fn required_columns(&self) -> Vec<&str> {
        vec![
            self.launch.as_str(),
            self.throughput.as_str(),
            self.time.as_str(),
        ]
    }

    fn charts(&self, table: &Table) -> Result<Vec<Chart>> {
        let throughput = self.chart(
            table,
            Measurement {
                chart: "throughput_per_launch",
                column: &self.throughput,
                y_label: &self.throughput_label,
                name: &self.throughput_name,
                unit: "MB/s",
                mean_line: ReferenceLine::new(0.0, "red").line_width(2.0),
                grid: Grid::dotted(),
            },
        )?;
        let time = self.chart(
            table,
            Measurement {
                chart: "time_per_launch",
                column: &self.time,
                y_label: &self.time_label,
                name: &self.time_name,
                unit: "ms",
                mean_line: ReferenceLine::new(0.0, "green"),
                grid: Grid::default(),
            },
        )?;
        Ok(vec![throughput, time])
    }
}

#[cfg(test)]
mod tests {
    use common::chart::LineStyle;

    use super::*;

    const LAUNCHES: &str = "launch,transfer/Sec,time\n\
                            1,510.2,196\n\
                            2,498.7,200.5\n\
                            3,520.0,192\n";

    #[test]
    fn mean_lines_are_labelled() {
        let table = Table::from_reader(LAUNCHES.as_bytes()).unwrap();
        let charts = SingleConnection::default().charts(&table).unwrap();
        assert_eq!(charts.len(), 2);

        let throughput = &charts[0];
        assert_eq!(throughput.name, "throughput_per_launch");
        let line = &throughput.reference_lines[0];
        assert!((line.y - 509.633).abs() < 1e-3);
        assert_eq!(line.label.as_deref(), Some("Mean: 509.63 MB/s"));
        assert_eq!(line.color, "red");
        assert_eq!(line.line_style, LineStyle::Dashed);
        assert_eq!(throughput.margins, Some(Margins::REPORT));
        assert!(throughput.shows_legend());

        let time = &charts[1];
        assert_eq!(time.reference_lines[0].label.as_deref(), Some("Mean: 196.17 ms"));
        assert_eq!(time.reference_lines[0].color, "green");
    }

    #[test]
    fn a_tick_for_every_launch() {
        let table = Table::from_reader(LAUNCHES.as_bytes()).unwrap();
        let charts = SingleConnection::default().charts(&table).unwrap();
        let ticks: Vec<_> = charts[1].x.ticks.iter().flatten().map(|t| t.label.as_str()).collect();
        assert_eq!(ticks, ["1", "2", "3"]);
    }

    #[test]
    fn mean_precision_is_configurable() {
        let table = Table::from_reader(LAUNCHES.as_bytes()).unwrap();
        let plot: SingleConnection = serde_json::from_str(r#"{"mean_precision": 0}"#).unwrap();
        let charts = plot.charts(&table).unwrap();
        assert_eq!(charts[0].reference_lines[0].label.as_deref(), Some("Mean: 510 MB/s"));
    }

    #[test]
    fn no_launches_is_an_error() {
        let table = Table::from_reader("launch,transfer/Sec,time\n".as_bytes()).unwrap();
        assert!(SingleConnection::default().charts(&table).is_err());
    }
}
