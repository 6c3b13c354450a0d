use common::{
    chart::{Axis, Chart, Grid, Scale, Series, format_value},
    plot::Plot,
    series::{Column, SeriesData, select_series},
    table::Table,
};
use eyre::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Requests per second and average latency of a wrk run, against the number
/// of connections, one line per worker thread count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WrkConnections {
    pub input: String,
    pub connections: String,
    pub threads: String,
    pub requests: String,
    /// Latency column with unit suffixes; `None` skips the latency chart
    pub latency: Option<String>,
    pub x_label: String,
    pub requests_label: String,
    pub latency_label: String,
    /// Prefix of the per-thread-count legend entries
    pub threads_label: String,
}

impl Default for WrkConnections {
    fn default() -> Self {
        Self {
            input: "test1.csv".to_owned(),
            connections: "connections".to_owned(),
            threads: "threads".to_owned(),
            requests: "Requests/sec".to_owned(),
            latency: Some("latency, avg".to_owned()),
            x_label: "Network connections".to_owned(),
            requests_label: "Requests per second".to_owned(),
            latency_label: "Average latency (ms)".to_owned(),
            threads_label: "Worker threads in pool".to_owned(),
        }
    }
}

impl WrkConnections {
    fn chart(&self, name: &str, y_label: &str, groups: Vec<SeriesData>) -> Chart {
        let chart = Chart::new(
            name,
            Axis::new(&self.x_label).scale(Scale::log10()),
            Axis::new(y_label),
        )
        .grid(Grid::default());

        groups.into_iter().fold(chart, |chart, group| {
            let label = match group.key {
                Some(threads) => format!("{}: {}", self.threads_label, format_value(threads)),
                None => self.threads_label.clone(),
            };
            chart.series(Series::line(group.points).label(label))
        })
    }
}

#[async_trait::async_trait]
#[typetag::serde]
impl Plot for WrkConnections {
    fn input(&self) -> &str {
        &self.input
    }

    fn required_columns(&self) -> Vec<&str> {
        let mut columns = vec![
            self.connections.as_str(),
            self.threads.as_str(),
            self.requests.as_str(),
        ];
        columns.extend(self.latency.as_deref());
        columns
    }

    fn charts(&self, table: &Table) -> Result<Vec<Chart>> {
        let connections = Column::number(&self.connections);
        let requests = select_series(
            table,
            &connections,
            &Column::number(&self.requests),
            Some(self.threads.as_str()),
        )?;
        debug!("Got {} thread counts", requests.len());

        let mut charts = vec![self.chart("rps_vs_connections", &self.requests_label, requests)];
        if let Some(latency) = &self.latency {
            let latency = select_series(
                table,
                &connections,
                &Column::latency(latency),
                Some(self.threads.as_str()),
            )?;
            charts.push(self.chart("latency_vs_connections", &self.latency_label, latency));
        }
        Ok(charts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUNS: &str = "threads,connections,Requests/sec,\"latency, avg\"\n\
                        2,10,2010,400us\n\
                        2,100,2100,1.1ms\n\
                        2,1000,2999,12ms\n\
                        4,1000,4999,9.5ms\n\
                        4,10,4010,300us\n\
                        4,100,4100,2.5\n";

    #[test]
    fn one_series_per_thread_count() {
        let table = Table::from_reader(RUNS.as_bytes()).unwrap();
        let charts = WrkConnections::default().charts(&table).unwrap();
        assert_eq!(charts.len(), 2);

        let rps = &charts[0];
        assert_eq!(rps.name, "rps_vs_connections");
        assert_eq!(rps.x.scale, Scale::log10());
        assert_eq!(rps.series.len(), 2);
        assert_eq!(
            rps.series[0].label.as_deref(),
            Some("Worker threads in pool: 2")
        );
        assert_eq!(
            rps.series[1].points,
            vec![(10.0, 4010.0), (100.0, 4100.0), (1000.0, 4999.0)]
        );
        assert!(rps.shows_legend());

        let latency = &charts[1];
        assert_eq!(latency.name, "latency_vs_connections");
        assert_eq!(
            latency.series[1].points,
            vec![(10.0, 0.3), (100.0, 2.5), (1000.0, 9.5)]
        );
    }

    #[test]
    fn latency_chart_can_be_disabled() {
        let plot: WrkConnections = serde_json::from_str(r#"{"latency": null}"#).unwrap();
        assert_eq!(plot.required_columns(), vec!["connections", "threads", "Requests/sec"]);

        let table = Table::from_reader("threads,connections,Requests/sec\n1,8,100\n".as_bytes()).unwrap();
        let charts = plot.charts(&table).unwrap();
        assert_eq!(charts.len(), 1);
        assert!(!charts[0].shows_legend());
    }

    #[test]
    fn bad_latency_unit_fails() {
        let table = Table::from_reader(
            "threads,connections,Requests/sec,\"latency, avg\"\n1,8,100,2s\n".as_bytes(),
        )
        .unwrap();
        assert!(WrkConnections::default().charts(&table).is_err());
    }
}
