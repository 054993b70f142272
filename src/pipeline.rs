//! End-to-end run orchestration.
//!
//! One call takes a validated [`RunConfig`] through the whole run: load the
//! symbol universe, download bars for the ranking and chart windows, compute
//! and rank returns, then render every chart into a fresh output directory.
//! The caller gets a [`PipelineReport`] describing everything that happened;
//! only a run that can produce nothing at all returns an error.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::analysis::{self, RankedRecord, ReturnRecord};
use crate::config::{Interval, RunConfig};
use crate::provider::{self, RawDataset};
use crate::render::{self, RenderReport};
use crate::series::{self, FieldSet};
use crate::{parallel, symbols};

/// Everything a finished run has to say for itself.
#[derive(Debug)]
pub struct PipelineReport {
    pub ranked: Vec<RankedRecord>,
    pub failed_data: Vec<String>,
    pub render: RenderReport,
    pub out_dir: PathBuf,
}

/// Joins the two downloads per symbol. A symbol missing a usable series in
/// either window is excluded from the ranking and reported instead; the
/// ranking percent always comes from the analysis window.
fn build_records(
    bare: &[String],
    suffixed: &[String],
    analysis_raw: &RawDataset,
    chart_raw: &RawDataset,
) -> (Vec<ReturnRecord>, Vec<String>) {
    let mut records = Vec::with_capacity(bare.len());
    let mut failed = Vec::new();

    for (symbol, provider_symbol) in bare.iter().zip(suffixed) {
        let analysis_series = series::extract(analysis_raw, provider_symbol, FieldSet::Ohlc);
        let chart_series = series::extract(chart_raw, provider_symbol, FieldSet::OhlcVolume);

        match (analysis_series, chart_series) {
            (Some(analysis_series), Some(chart_series)) => records.push(ReturnRecord {
                symbol: symbol.clone(),
                percent: analysis::percent_return(&analysis_series),
                chart_series,
            }),
            _ => {
                warn!(symbol = %provider_symbol, "no usable data");
                failed.push(provider_symbol.clone());
            }
        }
    }

    (records, failed)
}

/// Recreates `dir` empty, so a rerun never mixes old charts with new ones.
fn prepare_output_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)
            .with_context(|| format!("could not clear output directory {}", dir.display()))?;
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("could not create output directory {}", dir.display()))?;
    Ok(())
}

pub async fn run(config: &RunConfig) -> Result<PipelineReport> {
    config.validate()?;

    println!("Step 1/4: loading symbols from {}", config.csv_path.display());
    let bare = symbols::load_symbols(&config.csv_path, config.symbol_cap)?;
    if bare.is_empty() {
        bail!("symbol file {} contains no symbols", config.csv_path.display());
    }
    let suffixed: Vec<String> = bare.iter().map(|s| config.market.with_suffix(s)).collect();
    info!(count = suffixed.len(), "symbol universe loaded");

    let client = provider::new_client()?;
    let now = Utc::now();

    println!("Step 2/4: downloading bars for {} symbols", suffixed.len());
    let analysis_raw = provider::fetch_bars(
        &client,
        &suffixed,
        now - config.analysis_window.to_duration(),
        Interval::Day1,
    )
    .await
    .context("ranking-window download failed")?;

    let chart_raw = provider::fetch_bars(
        &client,
        &suffixed,
        now - config.chart_window.to_duration(),
        config.interval,
    )
    .await
    .context("chart-window download failed")?;

    println!("Step 3/4: computing and ranking returns");
    let (records, failed_data) = build_records(&bare, &suffixed, &analysis_raw, &chart_raw);
    let ranked = analysis::rank(records);
    info!(ranked = ranked.len(), failed = failed_data.len(), "ranking complete");

    println!("Step 4/4: rendering {} charts", ranked.len());
    let out_dir = config.output_dir();
    prepare_output_dir(&out_dir)?;
    let render = render::render_all(ranked.clone(), &out_dir, parallel::default_workers()).await;

    Ok(PipelineReport {
        ranked,
        failed_data,
        render,
        out_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::RawBar;
    use chrono::DateTime;
    use indexmap::IndexMap;

    fn raw_bars(closes: &[f64]) -> Vec<RawBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| RawBar {
                timestamp: DateTime::from_timestamp(86_400 * (i as i64 + 1), 0).unwrap(),
                open: Some(close),
                high: Some(close),
                low: Some(close),
                close: Some(close),
                volume: Some(1_000.0),
            })
            .collect()
    }

    fn keyed(entries: &[(&str, &[f64])]) -> RawDataset {
        let mut map = IndexMap::new();
        for (symbol, closes) in entries {
            map.insert(symbol.to_string(), raw_bars(closes));
        }
        RawDataset::Keyed(map)
    }

    #[test]
    fn symbols_missing_either_window_are_reported() {
        let bare = vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()];
        let suffixed = bare.clone();
        let analysis_raw = keyed(&[("AAA", &[10.0, 12.0]), ("BBB", &[10.0, 9.0])]);
        let chart_raw = keyed(&[("AAA", &[10.0, 12.0]), ("CCC", &[5.0, 5.0])]);

        let (records, failed) = build_records(&bare, &suffixed, &analysis_raw, &chart_raw);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].symbol, "AAA");
        assert_eq!(records[0].percent, 20.0);
        assert_eq!(failed, vec!["BBB", "CCC"]);
    }

    #[test]
    fn provider_suffix_is_stripped_from_records() {
        let bare = vec!["RELIANCE".to_string()];
        let suffixed = vec!["RELIANCE.NS".to_string()];
        let dataset = keyed(&[("RELIANCE.NS", &[100.0, 110.0])]);

        let (records, failed) = build_records(&bare, &suffixed, &dataset, &dataset);

        assert!(failed.is_empty());
        assert_eq!(records[0].symbol, "RELIANCE");
    }

    #[test]
    fn output_dir_is_recreated_fresh() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("Analysis_30days_1d");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("stale.png"), b"old").unwrap();

        prepare_output_dir(&dir).unwrap();

        assert!(dir.exists());
        assert!(!dir.join("stale.png").exists());
    }
}
