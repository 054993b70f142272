//! Candlestick chart rendering.
//!
//! Draws one PNG per symbol with a dark exchange-style palette. Rendering
//! runs on blocking worker threads, so every error is flattened into a
//! sendable [`ChartError`] instead of borrowing from the drawing backend.

use std::path::Path;

use plotters::prelude::*;
use thiserror::Error;

use crate::series::CleanSeries;

pub const WIDTH: u32 = 1600;
pub const HEIGHT: u32 = 720;

// Dark palette matching the usual exchange chart colors.
const UP: RGBColor = RGBColor(0x3d, 0xc9, 0x85);
const DOWN: RGBColor = RGBColor(0xef, 0x4f, 0x60);
const PLOT_BG: RGBColor = RGBColor(0x1b, 0x1f, 0x24);
const FIGURE_BG: RGBColor = RGBColor(0x16, 0x1a, 0x1e);
const GRID: RGBColor = RGBColor(0x2c, 0x2e, 0x31);
const EDGE: RGBColor = RGBColor(0x47, 0x4d, 0x56);
const TITLE: RGBColor = RGBColor(0xd9, 0x32, 0x32);
const LABEL: RGBColor = RGBColor(0xc8, 0xcc, 0xd0);

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("series has no bars to draw")]
    EmptySeries,

    #[error("drawing failed: {0}")]
    Draw(String),
}

fn draw_error<E: std::error::Error>(err: E) -> ChartError {
    ChartError::Draw(err.to_string())
}

/// Price range covered by the bars, padded so wicks never touch the frame.
fn price_range(series: &CleanSeries) -> (f64, f64) {
    let mut low = f64::INFINITY;
    let mut high = f64::NEG_INFINITY;
    for bar in series.bars() {
        low = low.min(bar.low);
        high = high.max(bar.high);
    }

    let span = high - low;
    let pad = if span > 0.0 { span * 0.05 } else { low.abs().max(1.0) * 0.01 };
    (low - pad, high + pad)
}

fn candle_width(bar_count: usize) -> u32 {
    let usable = WIDTH as usize * 3 / 4;
    (usable / bar_count.max(1)).clamp(1, 12) as u32
}

/// Renders `series` as a candlestick chart PNG at `path`.
///
/// The title carries the symbol and its ranking-window return, so a chart
/// can be read on its own without the summary table.
pub fn render(
    series: &CleanSeries,
    symbol: &str,
    percent: f64,
    path: &Path,
) -> Result<(), ChartError> {
    if series.is_empty() {
        return Err(ChartError::EmptySeries);
    }

    let bars = series.bars();
    let (y_min, y_max) = price_range(series);

    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&FIGURE_BG).map_err(draw_error)?;

    let title = format!("{} - Return: {:.2}%", symbol, percent);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28).into_font().color(&TITLE))
        .margin(16)
        .x_label_area_size(48)
        .right_y_label_area_size(72)
        .build_cartesian_2d(0..bars.len(), y_min..y_max)
        .map_err(draw_error)?;

    chart
        .plotting_area()
        .fill(&PLOT_BG)
        .map_err(draw_error)?;

    chart
        .configure_mesh()
        .light_line_style(GRID.mix(0.5))
        .bold_line_style(GRID)
        .axis_style(EDGE)
        .label_style(("sans-serif", 14).into_font().color(&LABEL))
        .x_label_formatter(&|i| {
            bars.get(*i)
                .map(|bar| bar.timestamp.format("%m-%d %H:%M").to_string())
                .unwrap_or_default()
        })
        .y_label_formatter(&|price| format!("{price:.2}"))
        .draw()
        .map_err(draw_error)?;

    let width = candle_width(bars.len());
    chart
        .draw_series(bars.iter().enumerate().map(|(i, bar)| {
            CandleStick::new(
                i,
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                UP.filled(),
                DOWN.filled(),
                width,
            )
        }))
        .map_err(draw_error)?;

    root.present().map_err(draw_error)?;
    Ok(())
}
