use common::{
    chart::{Axis, Chart, Grid, Marker, Scale, Series},
    plot::Plot,
    series::{Column, select_series},
    table::Table,
};
use eyre::{ContextCompat, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Total server throughput and the average throughput per connection against
/// the number of connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConnections {
    pub input: String,
    pub connections: String,
    pub transfer: String,
    pub average: String,
    pub x_label: String,
    pub transfer_label: String,
    pub average_label: String,
}

impl Default for TransferConnections {
    fn default() -> Self {
        Self {
            input: "throughput_results.csv".to_owned(),
            connections: "connections".to_owned(),
            transfer: "transfer".to_owned(),
            average: "aver transfer".to_owned(),
            x_label: "Connections".to_owned(),
            transfer_label: "Total throughput (MB/s)".to_owned(),
            average_label: "Average throughput per connection (MB/s)".to_owned(),
        }
    }
}

impl TransferConnections {
    fn chart(&self, table: &Table, name: &str, column: &str, y_label: &str) -> Result<(Chart, Vec<f64>)> {
        let data = select_series(
            table,
            &Column::number(&self.connections),
            &Column::number(column),
            None,
        )?
        .pop()
        .with_context(|| format!("No rows for {name}"))?;

        let connections: Vec<f64> = data.xs().into_iter().dedup().collect();
        let chart = Chart::new(
            name,
            Axis::new(&self.x_label)
                .scale(Scale::log2())
                .ticks_at(&connections),
            Axis::new(y_label),
        )
        .grid(Grid::fine());
        Ok((chart.series(Series::line(data.points).line_width(2.0)), connections))
    }
}

#[async_trait::async_trait]
#[typetag::serde]
impl Plot for TransferConnections {
    fn input(&self) -> &str {
        &self.input
    }

    fn required_columns(&self) -> Vec<&str> {
        vec![
            self.connections.as_str(),
            self.transfer.as_str(),
            self.average.as_str(),
        ]
    }

    fn charts(&self, table: &Table) -> Result<Vec<Chart>> {
        let (transfer, connections) =
            self.chart(table, "transfer_vs_connections", &self.transfer, &self.transfer_label)?;
        debug!("Got {} connection counts", connections.len());

        let (mut average, _) = self.chart(
            table,
            "avg_transfer_vs_connections",
            &self.average,
            &self.average_label,
        )?;
        for series in &mut average.series {
            series.marker = Marker::Square;
            series.color = Some("orange".to_owned());
        }
        Ok(vec![transfer, average])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS: &str = "connections,transfer,aver transfer\n\
                           1,120.5,120.5\n\
                           4,400,100\n\
                           2,230,115\n\
                           8,640,80\n";

    #[test]
    fn log2_axis_with_a_tick_per_connection_count() {
        let table = Table::from_reader(RESULTS.as_bytes()).unwrap();
        let charts = TransferConnections::default().charts(&table).unwrap();
        let names: Vec<_> = charts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["transfer_vs_connections", "avg_transfer_vs_connections"]);

        let transfer = &charts[0];
        assert_eq!(transfer.x.scale, Scale::log2());
        let ticks: Vec<_> = transfer.x.ticks.iter().flatten().map(|t| t.label.as_str()).collect();
        assert_eq!(ticks, ["1", "2", "4", "8"]);
        assert_eq!(
            transfer.series[0].points,
            vec![(1.0, 120.5), (2.0, 230.0), (4.0, 400.0), (8.0, 640.0)]
        );
        assert!(!transfer.shows_legend());

        let average = &charts[1];
        assert_eq!(average.series[0].marker, Marker::Square);
        assert_eq!(average.series_color(0), "orange");
        assert_eq!(average.series[0].points[3], (8.0, 80.0));
    }

    #[test]
    fn empty_results_fail() {
        let table = Table::from_reader("connections,transfer,aver transfer\n".as_bytes()).unwrap();
        assert!(TransferConnections::default().charts(&table).is_err());
    }
}
