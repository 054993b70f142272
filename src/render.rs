//! Batch chart rendering over the bounded worker pool.
//!
//! Every ranked record becomes one PNG named `<rank>_<symbol>.png`, zero
//! padded so a directory listing follows the ranking. A chart that fails to
//! draw is recorded and skipped; the rest of the batch still renders.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::analysis::RankedRecord;
use crate::{chart, parallel};

/// Outcome of one rendering batch.
#[derive(Debug, Default)]
pub struct RenderReport {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<(String, String)>,
}

fn chart_path(out_dir: &Path, record: &RankedRecord) -> PathBuf {
    out_dir.join(format!("{:03}_{}.png", record.rank, record.symbol))
}

/// Renders every record into `out_dir`, at most `workers` at a time.
pub async fn render_all(records: Vec<RankedRecord>, out_dir: &Path, workers: usize) -> RenderReport {
    let symbols: Vec<String> = records.iter().map(|r| r.symbol.clone()).collect();
    let out_dir = out_dir.to_path_buf();

    let outcomes = parallel::map_bounded(records, workers, move |record| {
        let path = chart_path(&out_dir, &record);
        chart::render(&record.chart_series, &record.symbol, record.percent, &path)
            .map(|_| path)
            .map_err(|err| err.to_string())
    })
    .await;

    let mut report = RenderReport::default();
    for (symbol, outcome) in symbols.into_iter().zip(outcomes) {
        match outcome {
            Ok(path) => {
                debug!(symbol = %symbol, path = %path.display(), "chart rendered");
                report.succeeded.push(path);
            }
            Err(reason) => {
                warn!(symbol = %symbol, reason = %reason, "chart failed");
                report.failed.push((symbol, reason));
            }
        }
    }
    report
}
