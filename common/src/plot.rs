use core::fmt::Debug;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use dyn_clone::{DynClone, clone_trait_object};
use eyre::{Context, Result, bail};
use tokio::fs::{create_dir_all, read, write};
use tracing::{debug, info};

use crate::{chart::Chart, render::Renderer, table::Table};

#[typetag::serde(tag = "type")]
#[async_trait::async_trait]
pub trait Plot: Debug + DynClone + Send + Sync {
    /// The CSV file this plot reads, relative to the data dir
    fn input(&self) -> &str;

    /// Columns the input has to provide
    fn required_columns(&self) -> Vec<&str>;

    /// Builds the charts from the loaded input
    ///
    /// Arguments:
    /// * `table` - The input, already checked for [`Plot::required_columns`]
    fn charts(&self, table: &Table) -> Result<Vec<Chart>>;

    /// Reads and checks the input
    ///
    /// Arguments:
    /// * `data_dir` - The directory holding the benchmark results, ie. ./data
    async fn load(&self, data_dir: &Path) -> Result<Table> {
        let path = data_dir.join(self.input());
        let contents = read(&path)
            .await
            .wrap_err_with(|| format!("Reading {}", path.display()))?;
        let table = Table::from_reader(contents.as_slice())
            .wrap_err_with(|| format!("Parsing {}", path.display()))?;
        table
            .require(&self.required_columns())
            .wrap_err_with(|| format!("Checking {}", path.display()))?;
        debug!("Loaded {} rows from {}", table.len(), path.display());
        Ok(table)
    }
}
clone_trait_object!(Plot);

/// Runs every plot of a report, one after another, and returns the written
/// chart files.
///
/// All charts are built before the first one is written, so a failing plot or
/// two charts sharing a name leave `plot_dir` untouched. Each chart's
/// description is also written as json to `plot_dir/plot_data`.
pub async fn plot(
    plots: &[Box<dyn Plot>],
    data_dir: &Path,
    plot_dir: &Path,
    renderer: &mut dyn Renderer,
) -> Result<Vec<PathBuf>> {
    if plots.is_empty() {
        debug!("No plots");
        return Ok(Vec::new());
    }

    let mut charts = Vec::new();
    let mut names = HashSet::new();
    for plot in plots {
        let table = plot.load(data_dir).await?;
        let built = plot
            .charts(&table)
            .wrap_err_with(|| format!("Building charts from {}", plot.input()))?;
        debug!("Got {} charts from {}", built.len(), plot.input());
        for chart in &built {
            if !names.insert(chart.name.clone()) {
                bail!("Duplicate chart name {} from {}", chart.name, plot.input());
            }
        }
        charts.extend(built);
    }

    let plot_data_dir = plot_dir.join("plot_data");
    create_dir_all(&plot_data_dir)
        .await
        .wrap_err_with(|| format!("Creating {}", plot_data_dir.display()))?;

    let mut written = Vec::new();
    for chart in charts {
        let data_path = plot_data_dir.join(format!("{}.json", chart.name));
        write(&data_path, serde_json::to_string(&chart)?).await?;
        let path = renderer
            .render(&chart, plot_dir)
            .wrap_err_with(|| format!("Rendering {}", chart.name))?;
        info!("Plotted {}", path.display());
        written.push(path);
    }
    Ok(written)
}
