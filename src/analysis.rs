//! Return calculation and ranking.
//!
//! Each surviving symbol gets a percentage return over its analysis series,
//! then the whole set is sorted descending and assigned dense 1-based ranks.

use std::cmp::Ordering;

use crate::series::CleanSeries;

/// A symbol that survived extraction, carrying its computed return and the
/// series destined for chart rendering.
#[derive(Debug, Clone)]
pub struct ReturnRecord {
    pub symbol: String,
    pub percent: f64,
    pub chart_series: CleanSeries,
}

/// A [`ReturnRecord`] after ranking. Ranks start at 1 and are dense over the
/// records that made it this far, not over the requested universe.
#[derive(Debug, Clone)]
pub struct RankedRecord {
    pub rank: usize,
    pub symbol: String,
    pub percent: f64,
    pub chart_series: CleanSeries,
}

/// Percentage change from the first close to the last close.
///
/// A series too short to express a change, or one starting at a zero close,
/// reports 0.0 rather than an error: such symbols stay in the ranking as
/// flat performers instead of vanishing.
pub fn percent_return(series: &CleanSeries) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let first = series.first_close();
    if first == 0.0 {
        return 0.0;
    }
    (series.last_close() - first) / first * 100.0
}

/// Sorts records by return, best first, and assigns ranks.
///
/// The sort is stable, so symbols with equal returns keep their arrival
/// order. Non-comparable returns are left where they are.
pub fn rank(mut records: Vec<ReturnRecord>) -> Vec<RankedRecord> {
    records.sort_by(|a, b| b.percent.partial_cmp(&a.percent).unwrap_or(Ordering::Equal));

    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| RankedRecord {
            rank: i + 1,
            symbol: record.symbol,
            percent: record.percent,
            chart_series: record.chart_series,
        })
        .collect()
}
