pub use payload_size::PayloadSize;
pub use single_connection::SingleConnection;
pub use transfer_connections::TransferConnections;
pub use wrk_connections::WrkConnections;

/// `type` tags of every bundled plot.
pub const PLOT_NAMES: &[&str] = &[
    "WrkConnections",
    "TransferConnections",
    "SingleConnection",
    "PayloadSize",
];

/// Links every plot crate into the binary so their typetag registrations are
/// visible when the config is parsed.
pub fn init_plots() {
    let _ = serde_json::to_string(&WrkConnections::default());
    let _ = serde_json::to_string(&TransferConnections::default());
    let _ = serde_json::to_string(&SingleConnection::default());
    let _ = serde_json::to_string(&PayloadSize::default());
}

#[cfg(test)]
mod tests {
    use common::config::Config;

    use super::*;

    #[test]
    fn every_plot_parses_from_config() {
        init_plots();
        let reports: String = PLOT_NAMES
            .iter()
            .map(|name| format!("  - name: {name}\n    plots:\n      - type: {name}\n"))
            .collect();
        let config = Config::from_yaml(&format!("name: all\nreports:\n{reports}")).unwrap();

        assert_eq!(config.reports.len(), PLOT_NAMES.len());
        for (report, name) in config.reports.iter().zip(PLOT_NAMES) {
            assert_eq!(report.plots[0].typetag_name(), *name);
        }
    }

    #[test]
    fn plot_options_override_defaults() {
        let yaml = r#"
name: lab
reports:
  - name: payload
    plots:
      - type: PayloadSize
        input: sizes.csv
        bars: true
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let plot = &config.reports[0].plots[0];
        assert_eq!(plot.input(), "sizes.csv");
        assert_eq!(
            plot.required_columns(),
            vec!["size_bytes", "avg_time_ms", "avg_throughput_mbs"]
        );
    }

    #[test]
    fn unknown_plot_type_is_rejected() {
        let yaml = "name: x\nreports:\n  - name: r\n    plots:\n      - type: Heatmap\n";
        assert!(Config::from_yaml(yaml).is_err());
    }
}
