mod analysis;
mod chart;
mod config;
mod parallel;
mod pipeline;
mod provider;
mod render;
mod report;
mod series;
mod symbols;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::{Interval, Market, RunConfig, Window, WindowUnit};

/// Ranks a symbol universe by percentage return and renders a candlestick
/// chart per symbol.
#[derive(Parser, Debug)]
#[command(name = "candle-rank", version)]
struct Cli {
    /// Market universe: 'us' or 'india'
    #[arg(long, default_value = "us")]
    market: String,

    /// Symbol CSV path, defaults to the market's bundled list
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Maximum number of symbols to analyze
    #[arg(long, default_value_t = 100)]
    count: usize,

    /// Length of the ranking window
    #[arg(long, default_value_t = 30)]
    analysis_duration: u32,

    /// Unit of the ranking window: days, weeks or months
    #[arg(long, default_value = "days")]
    analysis_unit: String,

    /// Length of the chart window
    #[arg(long, default_value_t = 30)]
    chart_duration: u32,

    /// Unit of the chart window: days, weeks or months
    #[arg(long, default_value = "days")]
    chart_unit: String,

    /// Bar interval for charts, e.g. 1d, 4h, 15m
    #[arg(long, default_value = "1d")]
    interval: String,

    /// Root directory for chart output
    #[arg(long, default_value = "graph_stock")]
    out_root: PathBuf,

    /// Do not open the output folder when the run finishes
    #[arg(long)]
    no_open: bool,
}

impl Cli {
    fn into_config(self) -> Result<RunConfig> {
        let market = Market::parse(&self.market)?;
        let csv_path = self.csv.unwrap_or_else(|| market.default_csv());
        Ok(RunConfig {
            market,
            csv_path,
            symbol_cap: self.count,
            analysis_window: Window::new(self.analysis_duration, WindowUnit::parse(&self.analysis_unit)?),
            chart_window: Window::new(self.chart_duration, WindowUnit::parse(&self.chart_unit)?),
            interval: Interval::parse(&self.interval).with_context(|| {
                let codes: Vec<_> = Interval::ALL.iter().map(|i| i.code()).collect();
                format!("supported intervals: {}", codes.join(", "))
            })?,
            output_root: self.out_root,
        })
    }
}

/// Best effort only: a headless machine without a file manager is not an
/// error worth failing the run over.
fn open_output_folder(dir: &Path) {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    };
    if let Err(err) = std::process::Command::new(opener).arg(dir).spawn() {
        tracing::debug!(error = %err, "could not open output folder");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let open_folder = !cli.no_open;
    let config = cli.into_config()?;

    let outcome = pipeline::run(&config).await?;
    report::print_summary(
        &outcome.ranked,
        &outcome.failed_data,
        &outcome.render,
        &outcome.out_dir,
    );

    if open_folder {
        open_output_folder(&outcome.out_dir);
    }
    Ok(())
}
