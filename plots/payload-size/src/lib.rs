use common::{
    chart::{Axis, Chart, Grid, Margins, Marker, Scale, Series, Tick},
    plot::Plot,
    series::{Column, select_series},
    table::Table,
    util::format_size,
};
use eyre::{ContextCompat, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Transfer time and throughput against the payload size, both on a log size
/// axis labelled with human readable sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadSize {
    pub input: String,
    /// Payload size in bytes
    pub size: String,
    pub time: String,
    pub throughput: String,
    /// Draw bars instead of lines
    pub bars: bool,
    pub x_label: String,
    pub time_label: String,
    pub throughput_label: String,
}

impl Default for PayloadSize {
    fn default() -> Self {
        Self {
            input: "payload_results.csv".to_owned(),
            size: "size_bytes".to_owned(),
            time: "avg_time_ms".to_owned(),
            throughput: "avg_throughput_mbs".to_owned(),
            bars: false,
            x_label: "File size".to_owned(),
            time_label: "Average transfer time, ms".to_owned(),
            throughput_label: "Average throughput, MB/s".to_owned(),
        }
    }
}

impl PayloadSize {
    fn series(&self, points: Vec<(f64, f64)>, marker: Marker, color: &str) -> Series {
        let series = if self.bars {
            Series::bars(points)
        } else {
            Series::line(points)
        };
        series
            .marker(marker)
            .color(color)
            .line_width(2.0)
            .marker_size(8.0)
    }

    /// `measure` is the y column, its label and scale, and the series marker
    /// and color.
    fn chart(
        &self,
        table: &Table,
        name: &str,
        ticks: &[Tick],
        measure: (&str, &str, Scale, Marker, &str),
    ) -> Result<Chart> {
        let (column, y_label, y_scale, marker, color) = measure;
        let data = select_series(
            table,
            &Column::number(&self.size),
            &Column::number(column),
            None,
        )?
        .pop()
        .with_context(|| format!("No payload sizes for {name}"))?;

        Ok(Chart::new(
            name,
            Axis::new(&self.x_label)
                .scale(Scale::log10())
                .ticks(ticks.to_vec()),
            Axis::new(y_label).scale(y_scale),
        )
        .series(self.series(data.points, marker, color))
        .grid(Grid::fine())
        .margins(Margins::REPORT))
    }
}

#[async_trait::async_trait]
#[typetag::serde]
impl Plot for PayloadSize {
    fn input(&self) -> &str {
        &self.input
    }

    fn required_columns(&self) -> Vec<&str> {
        vec![
            self.size.as_str(),
            self.time.as_str(),
            self.throughput.as_str(),
        ]
    }

    fn charts(&self, table: &Table) -> Result<Vec<Chart>> {
        let sizes = table.parse_column(&self.size, |size| size.parse::<u64>())?;
        let ticks: Vec<Tick> = sizes
            .into_iter()
            .sorted()
            .dedup()
            .map(|size| Tick::new(size as f64, format_size(size)))
            .collect();
        debug!("Got {} payload sizes", ticks.len());

        let time = self.chart(
            table,
            "time_vs_size",
            &ticks,
            (&self.time, &self.time_label, Scale::log10(), Marker::Circle, "tab:blue"),
        )?;
        let throughput = self.chart(
            table,
            "throughput_vs_size",
            &ticks,
            (
                &self.throughput,
                &self.throughput_label,
                Scale::Linear,
                Marker::Square,
                "tab:orange",
            ),
        )?;
        Ok(vec![time, throughput])
    }
}

#[cfg(test)]
mod tests {
    use common::chart::SeriesKind;

    use super::*;

    const PAYLOADS: &str = "name,size_bytes,avg_time_ms,avg_throughput_mbs\n\
                            100KB,102400,0.580,184.623\n\
                            10KB,10240,0.511,20.767\n\
                            1MB,1048576,1.134,999.074\n\
                            10MB,10485760,4.572,2366.636\n\
                            100MB,104857600,27.815,3648.628\n";

    #[test]
    fn sizes_become_tick_labels() {
        let table = Table::from_reader(PAYLOADS.as_bytes()).unwrap();
        let charts = PayloadSize::default().charts(&table).unwrap();

        let time = &charts[0];
        assert_eq!(time.name, "time_vs_size");
        assert_eq!(time.x.scale, Scale::log10());
        assert_eq!(time.y.scale, Scale::log10());
        let labels: Vec<_> = time.x.ticks.iter().flatten().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, ["10 KB", "100 KB", "1 MB", "10 MB", "100 MB"]);
        assert_eq!(time.series[0].points[0], (10240.0, 0.511));
        assert_eq!(time.series_color(0), "tab:blue");
        assert_eq!(time.series[0].kind, SeriesKind::Line);

        let throughput = &charts[1];
        assert_eq!(throughput.name, "throughput_vs_size");
        assert_eq!(throughput.y.scale, Scale::Linear);
        assert_eq!(throughput.series[0].marker, Marker::Square);
        assert_eq!(throughput.series[0].points[4], (104857600.0, 3648.628));
        assert!(throughput.validate().is_ok());
    }

    #[test]
    fn bars_option() {
        let table = Table::from_reader(PAYLOADS.as_bytes()).unwrap();
        let plot: PayloadSize = serde_json::from_str(r#"{"bars": true}"#).unwrap();
        let charts = plot.charts(&table).unwrap();
        assert!(charts.iter().all(|c| c.series[0].kind == SeriesKind::Bar));
    }

    #[test]
    fn fractional_sizes_are_rejected() {
        let table = Table::from_reader(
            "size_bytes,avg_time_ms,avg_throughput_mbs\n1.5,1,1\n".as_bytes(),
        )
        .unwrap();
        assert!(PayloadSize::default().charts(&table).is_err());
    }
}
