//! Bulk historical-bar download.
//!
//! One logical bulk request fans out into concurrent per-symbol calls
//! against the provider's chart endpoint; the responses are merged into a
//! single [`RawDataset`] keyed by symbol. The provider gives no guarantee
//! that every requested symbol comes back, and individual rows may carry
//! null fields, so everything here is parsed leniently and validated later
//! by the series extractor.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use indexmap::IndexMap;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Interval;

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

// Symbols fetched concurrently per batch.
const BATCH_SIZE: usize = 64;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned an error: {0}")]
    Api(String),

    #[error("provider returned no data for any requested symbol")]
    Empty,
}

/// One bar as the provider sent it. Any field may be missing; rows are
/// validated when a clean series is extracted, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBar {
    pub timestamp: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

/// The shape of a bulk result, resolved once at the fetch boundary: a
/// multi-symbol request produces a keyed map (in request order), a
/// single-symbol request a flat table.
#[derive(Debug, Clone, PartialEq)]
pub enum RawDataset {
    Keyed(IndexMap<String, Vec<RawBar>>),
    Flat(Vec<RawBar>),
}

// Provider response layout: chart.result[0] holds parallel arrays of
// timestamps and quote fields, chart.error a machine-readable failure.

#[derive(Deserialize)]
struct ChartResponse {
    chart: ChartNode,
}

#[derive(Deserialize)]
struct ChartNode {
    result: Option<Vec<ChartResult>>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Deserialize, Default)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

pub fn new_client() -> Result<Client, FetchError> {
    // The chart endpoint rejects clients without a browser-ish user agent.
    let client = Client::builder()
        .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36")
        .pool_max_idle_per_host(50)
        .build()?;
    Ok(client)
}

fn bars_from_response(response: ChartResponse) -> Result<Vec<RawBar>, FetchError> {
    if let Some(err) = response.chart.error {
        return Err(FetchError::Api(format!("{}: {}", err.code, err.description)));
    }

    let result = response
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
        .ok_or(FetchError::Empty)?;

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let Some(timestamp) = DateTime::from_timestamp(*ts, 0) else {
            continue;
        };
        bars.push(RawBar {
            timestamp,
            open: quote.open.get(i).copied().flatten(),
            high: quote.high.get(i).copied().flatten(),
            low: quote.low.get(i).copied().flatten(),
            close: quote.close.get(i).copied().flatten(),
            volume: quote.volume.get(i).copied().flatten(),
        });
    }

    if bars.is_empty() {
        return Err(FetchError::Empty);
    }
    Ok(bars)
}

async fn fetch_one(
    client: &Client,
    symbol: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval: Interval,
) -> Result<Vec<RawBar>, FetchError> {
    let url = format!("{}/{}", BASE_URL, symbol);
    let query = [
        ("period1", start.timestamp().to_string()),
        ("period2", end.timestamp().to_string()),
        ("interval", interval.code().to_string()),
        ("events", "history".to_string()),
        ("includeAdjustedClose", "true".to_string()),
    ];

    let response = client.get(&url).query(&query).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(FetchError::Api(format!("HTTP {status}: {body}")));
    }

    bars_from_response(response.json::<ChartResponse>().await?)
}

/// Issues one bulk historical-bar request for `symbols` from `start` to now.
///
/// Symbols whose individual request fails in any way are absent from the
/// returned dataset; only a dataset empty of every requested symbol is a
/// fatal error. The keyed map preserves the request order of the symbols
/// that did come back.
pub async fn fetch_bars(
    client: &Client,
    symbols: &[String],
    start: DateTime<Utc>,
    interval: Interval,
) -> Result<RawDataset, FetchError> {
    let end = Utc::now();
    let mut dataset: IndexMap<String, Vec<RawBar>> = IndexMap::new();
    let mut first_failure: Option<FetchError> = None;

    for batch in symbols.chunks(BATCH_SIZE) {
        let tasks: Vec<_> = batch
            .iter()
            .map(|symbol| fetch_one(client, symbol, start, end, interval))
            .collect();

        for (symbol, outcome) in batch.iter().zip(join_all(tasks).await) {
            match outcome {
                Ok(bars) => {
                    debug!(symbol = %symbol, bars = bars.len(), "downloaded");
                    dataset.insert(symbol.clone(), bars);
                }
                Err(err) => {
                    warn!(symbol = %symbol, error = %err, "download failed");
                    first_failure.get_or_insert(err);
                }
            }
        }
    }

    if dataset.is_empty() {
        return Err(first_failure.unwrap_or(FetchError::Empty));
    }

    if symbols.len() == 1 {
        let (_, bars) = dataset.swap_remove_index(0).unwrap_or_default();
        return Ok(RawDataset::Flat(bars));
    }
    Ok(RawDataset::Keyed(dataset))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "AAPL"},
                "timestamp": [1700000000, 1700086400, 1700172800],
                "indicators": {
                    "quote": [{
                        "open":   [10.0, null, 12.0],
                        "high":   [11.0, 11.5, 12.5],
                        "low":    [ 9.5, 10.5, 11.5],
                        "close":  [10.5, 11.0, 12.0],
                        "volume": [1000, 2000, null]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn parses_nullable_rows() {
        let response: ChartResponse = serde_json::from_str(SAMPLE).unwrap();
        let bars = bars_from_response(response).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].open, Some(10.0));
        assert_eq!(bars[1].open, None);
        assert_eq!(bars[2].volume, None);
        assert!(bars[0].timestamp < bars[1].timestamp);
    }

    #[test]
    fn api_error_surfaces_as_fetch_error() {
        let body = r#"{
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
            }
        }"#;
        let response: ChartResponse = serde_json::from_str(body).unwrap();
        match bars_from_response(response) {
            Err(FetchError::Api(message)) => assert!(message.contains("Not Found")),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn empty_result_is_an_error() {
        let body = r#"{"chart": {"result": [], "error": null}}"#;
        let response: ChartResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(bars_from_response(response), Err(FetchError::Empty)));

        let body = r#"{
            "chart": {
                "result": [{"timestamp": [], "indicators": {"quote": [{}]}}],
                "error": null
            }
        }"#;
        let response: ChartResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(bars_from_response(response), Err(FetchError::Empty)));
    }
}
