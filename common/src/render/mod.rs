//! Chart renderers.
//!
//! A renderer is created once per run with the figure-wide [`Style`] and then
//! draws any number of [`Chart`]s, each into its own file.

#[cfg(feature = "matplotlib")]
pub mod pyplot;
pub mod svg;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chart::{Chart, ChartError, Style};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error("unknown color {0:?}")]
    Color(String),
    #[error("drawing {chart}: {reason}")]
    Draw { chart: String, reason: String },
    #[error("backend {0:?} is not available in this build")]
    Unavailable(Backend),
    #[error("backend {backend:?} cannot write {format:?} files")]
    UnsupportedFormat { backend: Backend, format: String },
    #[cfg(feature = "matplotlib")]
    #[error(transparent)]
    Python(#[from] pyo3::PyErr),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    /// Pure Rust SVG output
    #[default]
    Svg,
    /// matplotlib through an embedded Python interpreter
    Matplotlib,
}

impl Backend {
    /// File format written when the configuration names none.
    pub fn default_format(self) -> &'static str {
        match self {
            Backend::Svg => "svg",
            Backend::Matplotlib => "pdf",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderOptions {
    /// Output file format (`pdf`, `png`, ...), the backend's default when unset
    pub format: Option<String>,
    /// Open an interactive window per chart
    pub show: bool,
}

pub trait Renderer {
    /// Draws `chart` into `dir` and returns the written file.
    fn render(&mut self, chart: &Chart, dir: &Path) -> Result<PathBuf, RenderError>;

    /// Called once after the last chart; interactive backends block here until
    /// their windows are closed.
    fn finish(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

pub fn renderer(
    backend: Backend,
    style: &Style,
    options: &RenderOptions,
) -> Result<Box<dyn Renderer>, RenderError> {
    match backend {
        Backend::Svg => Ok(Box::new(svg::SvgRenderer::new(style.clone(), options)?)),
        #[cfg(feature = "matplotlib")]
        Backend::Matplotlib => Ok(Box::new(pyplot::PyPlotRenderer::new(style, options)?)),
        #[cfg(not(feature = "matplotlib"))]
        Backend::Matplotlib => Err(RenderError::Unavailable(backend)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svg_backend_is_always_available() {
        let style = Style::default();
        let options = RenderOptions::default();
        assert!(renderer(Backend::Svg, &style, &options).is_ok());
    }

    #[test]
    fn svg_backend_rejects_other_formats() {
        let options = RenderOptions {
            format: Some("pdf".to_owned()),
            show: false,
        };
        let result = renderer(Backend::Svg, &Style::default(), &options);
        assert!(matches!(
            result,
            Err(RenderError::UnsupportedFormat { backend: Backend::Svg, ref format }) if format == "pdf"
        ));

        let options = RenderOptions {
            format: Some("svg".to_owned()),
            show: false,
        };
        assert!(renderer(Backend::Svg, &Style::default(), &options).is_ok());
    }

    #[test]
    fn default_formats() {
        assert_eq!(Backend::Svg.default_format(), "svg");
        assert_eq!(Backend::Matplotlib.default_format(), "pdf");
    }

    #[cfg(not(feature = "matplotlib"))]
    #[test]
    fn matplotlib_needs_the_feature() {
        let result = renderer(Backend::Matplotlib, &Style::default(), &RenderOptions::default());
        assert!(matches!(
            result,
            Err(RenderError::Unavailable(Backend::Matplotlib))
        ));
    }
}
