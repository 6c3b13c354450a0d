use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{Parser, Subcommand};
use common::{config::Config, render::renderer};
use eyre::{Context, Result};
use tokio::fs::{create_dir_all, remove_dir_all};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const MODULES: &[&str] = &[
    "common",
    "default_plots",
    "wrk_connections",
    "transfer_connections",
    "single_connection",
    "payload_size",
];
const DEFAULT_CONFIG: &str = "report.yaml";

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    #[arg(short, long)]
    log: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured reports and their plots
    Ls {
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config_file: PathBuf,
    },
    /// Render every configured report
    Plot {
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config_file: PathBuf,
        /// Overrides `settings.output_dir`
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Also open the charts on screen
        #[arg(long, default_value_t = false)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();
    let file_appender = tracing_appender::rolling::never(".", "log.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let mut env_filter = EnvFilter::new(format!("bench_report={log_level}"));

    for log in &args.log {
        env_filter = env_filter.add_directive(log.parse()?);
    }

    for module in MODULES {
        if !args.log.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(layer().with_writer(non_blocking))
        .init();

    default_plots::init_plots();

    let command = args.command.unwrap_or(Commands::Plot {
        config_file: PathBuf::from(DEFAULT_CONFIG),
        output_dir: None,
        show: false,
    });
    let result = match command {
        Commands::Ls { config_file } => list_reports(&config_file).await,
        Commands::Plot {
            config_file,
            output_dir,
            show,
        } => plot(&config_file, output_dir, show).await,
    };
    if let Err(err) = result {
        error!("{err:#?}");
        return Err(err);
    }

    Ok(())
}

async fn list_reports(config_file: &Path) -> Result<()> {
    let config = Config::load(config_file).await?;
    println!("{}", config.name);
    for report in &config.reports {
        let plots: Vec<&str> = report.plots.iter().map(|p| p.typetag_name()).collect();
        println!("{} -> {}", report.name, plots.join(", "));
    }
    Ok(())
}

async fn plot(config_file: &Path, output_dir: Option<PathBuf>, show: bool) -> Result<()> {
    let mut config = Config::load(config_file).await?;
    if let Some(output_dir) = output_dir {
        config.settings.output_dir = output_dir;
    }
    config.settings.show |= show;

    let settings = &config.settings;
    let mut renderer = renderer(settings.backend, &settings.style, &settings.render_options())?;
    info!(
        "Plotting {} with {:?} at {}",
        config.name,
        settings.backend,
        Local::now().format("%F %T")
    );

    for report in &config.reports {
        let plot_dir = config.plot_dir(report);
        _ = remove_dir_all(&plot_dir).await;
        create_dir_all(&plot_dir).await?;

        let written = common::plot::plot(
            &report.plots,
            &settings.data_dir,
            &plot_dir,
            renderer.as_mut(),
        )
        .await
        .wrap_err_with(|| format!("Plotting report {}", report.name))?;
        info!("{}: {} charts in {}", report.name, written.len(), plot_dir.display());
    }

    renderer.finish()?;
    Ok(())
}
