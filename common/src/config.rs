use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::{
    chart::Style,
    plot::Plot,
    render::{Backend, RenderOptions},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub name: String,
    #[serde(default)]
    pub settings: Settings,
    pub reports: Vec<Report>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where the benchmark CSV files live
    pub data_dir: PathBuf,
    /// Charts go to `<output_dir>/<report name>`
    pub output_dir: PathBuf,
    pub backend: Backend,
    /// Output file format, `svg` for the svg backend and `pdf` for matplotlib
    /// when unset
    pub format: Option<String>,
    pub show: bool,
    pub style: Style,
}

impl Default for Settings {
    fn default() -> Self {
        let options = RenderOptions::default();
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("charts"),
            backend: Backend::default(),
            format: options.format,
            show: options.show,
            style: Style::default(),
        }
    }
}

impl Settings {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            format: self.format.clone(),
            show: self.show,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub name: String,
    #[serde(default)]
    pub plots: Vec<Box<dyn Plot>>,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yml::from_str(yaml)?;
        let mut names = HashSet::new();
        for report in &config.reports {
            if !names.insert(report.name.as_str()) {
                bail!("Duplicate report name {}", report.name);
            }
        }
        Ok(config)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let yaml = tokio::fs::read_to_string(path)
            .await
            .wrap_err_with(|| format!("Reading config {}", path.display()))?;
        Self::from_yaml(&yaml).wrap_err_with(|| format!("Parsing config {}", path.display()))
    }

    /// Directory the charts of `report` are written to.
    pub fn plot_dir(&self, report: &Report) -> PathBuf {
        self.settings.output_dir.join(&report.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_when_missing() {
        let config = Config::from_yaml("name: empty\nreports: []\n").unwrap();
        assert_eq!(config.name, "empty");
        assert_eq!(config.settings.data_dir, PathBuf::from("data"));
        assert_eq!(config.settings.backend, Backend::Svg);
        assert_eq!(config.settings.render_options(), RenderOptions::default());
        assert_eq!(config.settings.style, Style::default());
    }

    #[test]
    fn partial_settings_and_style() {
        let yaml = r#"
name: lab
settings:
  output_dir: out
  backend: Matplotlib
  show: true
  style:
    font_size: 10
reports:
  - name: empty
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.settings.backend, Backend::Matplotlib);
        assert!(config.settings.show);
        assert_eq!(config.settings.format, None);
        assert_eq!(config.settings.style.font_size, 10.0);
        assert_eq!(config.settings.style.label_size, 20.0);
        assert!(config.reports[0].plots.is_empty());
        assert_eq!(
            config.plot_dir(&config.reports[0]),
            PathBuf::from("out/empty")
        );
    }

    #[test]
    fn explicit_format() {
        let yaml = "name: x\nsettings:\n  format: svg\nreports: []\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.settings.render_options().format.as_deref(), Some("svg"));
    }

    #[test]
    fn duplicate_report_names_are_rejected() {
        let yaml = r#"
name: lab
reports:
  - name: wrk
  - name: payload
  - name: wrk
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("Duplicate report name wrk"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let yaml = "name: x\nsettings:\n  backend: Gnuplot\nreports: []\n";
        assert!(Config::from_yaml(yaml).is_err());
    }
}
