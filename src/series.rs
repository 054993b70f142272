//! Clean series extraction.
//!
//! Turns the lenient [`RawDataset`](crate::provider::RawDataset) into a
//! validated, time-ascending OHLCV series for a single symbol, or reports
//! absence. Extraction never fails loudly: a symbol the provider skipped or
//! a series with no usable rows is simply `None`.

use chrono::{DateTime, Utc};

use crate::provider::{RawBar, RawDataset};

/// Which fields a row must carry to survive extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSet {
    Ohlc,
    OhlcVolume,
}

/// A fully validated bar. All price fields are finite numbers; volume is
/// only guaranteed present when the series was extracted with
/// [`FieldSet::OhlcVolume`].
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

/// Time-ascending series of validated bars, never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanSeries {
    bars: Vec<Bar>,
}

impl CleanSeries {
    /// Builds a series from already-validated bars. Returns `None` when
    /// `bars` is empty, preserving the non-empty invariant.
    pub fn new(bars: Vec<Bar>) -> Option<Self> {
        if bars.is_empty() { None } else { Some(Self { bars }) }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_close(&self) -> f64 {
        self.bars[0].close
    }

    pub fn last_close(&self) -> f64 {
        self.bars[self.bars.len() - 1].close
    }
}

fn validate_row(row: &RawBar, fields: FieldSet) -> Option<Bar> {
    let (open, high, low, close) = (row.open?, row.high?, row.low?, row.close?);
    if ![open, high, low, close].iter().all(|v| v.is_finite()) {
        return None;
    }

    let volume = match fields {
        FieldSet::OhlcVolume => Some(row.volume?),
        FieldSet::Ohlc => row.volume,
    };

    Some(Bar {
        timestamp: row.timestamp,
        open,
        high,
        low,
        close,
        volume,
    })
}

/// Extracts the clean series for `symbol` from a bulk dataset.
///
/// Rows missing a required field, carrying non-finite numbers, or breaking
/// the strictly-increasing timestamp order are dropped. Returns `None` when
/// the symbol is absent or nothing usable remains.
pub fn extract(raw: &RawDataset, symbol: &str, fields: FieldSet) -> Option<CleanSeries> {
    let rows = match raw {
        RawDataset::Keyed(map) => map.get(symbol)?.as_slice(),
        RawDataset::Flat(rows) => rows.as_slice(),
    };

    let mut bars = Vec::with_capacity(rows.len());
    let mut last_timestamp: Option<DateTime<Utc>> = None;

    for row in rows {
        let Some(bar) = validate_row(row, fields) else {
            continue;
        };
        if last_timestamp.is_some_and(|t| bar.timestamp <= t) {
            continue;
        }
        last_timestamp = Some(bar.timestamp);
        bars.push(bar);
    }

    CleanSeries::new(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn raw_bar(ts: i64, close: Option<f64>) -> RawBar {
        RawBar {
            timestamp: DateTime::from_timestamp(ts, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: Some(100.0),
        }
    }

    fn keyed(symbol: &str, rows: Vec<RawBar>) -> RawDataset {
        let mut map = IndexMap::new();
        map.insert(symbol.to_string(), rows);
        RawDataset::Keyed(map)
    }

    #[test]
    fn absent_symbol_returns_none() {
        let raw = keyed("AAA", vec![raw_bar(1_000, Some(10.0))]);
        assert!(extract(&raw, "BBB", FieldSet::Ohlc).is_none());
    }

    #[test]
    fn flat_dataset_is_used_directly() {
        let raw = RawDataset::Flat(vec![raw_bar(1_000, Some(10.0)), raw_bar(2_000, Some(11.0))]);
        let series = extract(&raw, "ANY", FieldSet::Ohlc).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.last_close(), 11.0);
    }

    #[test]
    fn rows_with_missing_fields_are_dropped() {
        let raw = keyed(
            "AAA",
            vec![
                raw_bar(1_000, Some(10.0)),
                raw_bar(2_000, None),
                raw_bar(3_000, Some(12.0)),
            ],
        );
        let series = extract(&raw, "AAA", FieldSet::Ohlc).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.first_close(), 10.0);
        assert_eq!(series.last_close(), 12.0);
    }

    #[test]
    fn all_rows_invalid_returns_none() {
        let raw = keyed("AAA", vec![raw_bar(1_000, None), raw_bar(2_000, Some(f64::NAN))]);
        assert!(extract(&raw, "AAA", FieldSet::Ohlc).is_none());
    }

    #[test]
    fn volume_requirement_drops_rows_without_volume() {
        let mut no_volume = raw_bar(2_000, Some(11.0));
        no_volume.volume = None;
        let raw = keyed("AAA", vec![raw_bar(1_000, Some(10.0)), no_volume]);

        let series = extract(&raw, "AAA", FieldSet::OhlcVolume).unwrap();
        assert_eq!(series.len(), 1);

        // Without the volume requirement the row survives.
        let series = extract(&raw, "AAA", FieldSet::Ohlc).unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn out_of_order_timestamps_are_dropped() {
        let raw = keyed(
            "AAA",
            vec![
                raw_bar(1_000, Some(10.0)),
                raw_bar(3_000, Some(11.0)),
                raw_bar(2_000, Some(9.0)),
                raw_bar(4_000, Some(12.0)),
            ],
        );
        let series = extract(&raw, "AAA", FieldSet::Ohlc).unwrap();
        assert_eq!(series.len(), 3);
        let timestamps: Vec<_> = series.bars().iter().map(|b| b.timestamp).collect();
        assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
    }
}
