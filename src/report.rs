//! Terminal run summary.
//!
//! Prints the top of the ranking as a table, then the symbols that produced
//! no usable data and the charts that failed to render, so a run always
//! ends with a full account of what happened.

use std::path::Path;

use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table,
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_BORDERS_ONLY,
};

use crate::analysis::RankedRecord;
use crate::render::RenderReport;

/// Ranked rows shown in the terminal table; charts still cover everything.
pub const TOP_DISPLAY: usize = 20;

fn percent_cell(percent: f64) -> Cell {
    let color = if percent > 0.0 {
        Color::Green
    } else if percent < 0.0 {
        Color::Red
    } else {
        Color::DarkGrey
    };
    Cell::new(format!("{percent:.2}%"))
        .fg(color)
        .set_alignment(CellAlignment::Right)
}

pub fn summary_table(ranked: &[RankedRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Rank").add_attribute(Attribute::Bold),
            Cell::new("Symbol").add_attribute(Attribute::Bold),
            Cell::new("Return (%)")
                .add_attribute(Attribute::Bold)
                .set_alignment(CellAlignment::Right),
        ]);

    for record in ranked.iter().take(TOP_DISPLAY) {
        table.add_row(vec![
            Cell::new(record.rank).fg(Color::DarkGrey),
            Cell::new(&record.symbol).fg(Color::Cyan),
            percent_cell(record.percent),
        ]);
    }

    table
}

pub fn print_summary(
    ranked: &[RankedRecord],
    failed_data: &[String],
    render: &RenderReport,
    out_dir: &Path,
) {
    let shown = ranked.len().min(TOP_DISPLAY);
    println!("\nTop {} of {} ranked symbols:", shown, ranked.len());
    println!("{}", summary_table(ranked));

    if failed_data.is_empty() {
        println!("All requested symbols produced usable data.");
    } else {
        println!("No usable data for {} symbol(s):", failed_data.len());
        for symbol in failed_data {
            println!("  - {symbol}");
        }
    }

    if render.failed.is_empty() {
        println!("Rendered {} chart(s).", render.succeeded.len());
    } else {
        println!(
            "Rendered {} chart(s), {} failed:",
            render.succeeded.len(),
            render.failed.len()
        );
        for (symbol, reason) in &render.failed {
            println!("  - {symbol}: {reason}");
        }
    }

    println!("Charts written to {}", out_dir.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{Bar, CleanSeries};
    use chrono::DateTime;

    fn record(rank: usize, symbol: &str, percent: f64) -> RankedRecord {
        let bar = Bar {
            timestamp: DateTime::from_timestamp(1_000, 0).unwrap(),
            open: 10.0,
            high: 11.0,
            low: 9.0,
            close: 10.5,
            volume: None,
        };
        RankedRecord {
            rank,
            symbol: symbol.to_string(),
            percent,
            chart_series: CleanSeries::new(vec![bar]).unwrap(),
        }
    }

    #[test]
    fn table_shows_rank_symbol_and_percent() {
        let table = summary_table(&[record(1, "AAA", 20.0), record(2, "BBB", -3.5)]);
        let rendered = table.to_string();
        assert!(rendered.contains("AAA"));
        assert!(rendered.contains("20.00%"));
        assert!(rendered.contains("-3.50%"));
    }

    #[test]
    fn table_caps_at_top_display() {
        let ranked: Vec<_> = (1..=TOP_DISPLAY + 10)
            .map(|rank| record(rank, &format!("SYM{rank}"), rank as f64))
            .collect();
        let table = summary_table(&ranked);
        assert_eq!(table.row_iter().count(), TOP_DISPLAY);
    }

    #[test]
    fn empty_ranking_yields_header_only_table() {
        let table = summary_table(&[]);
        assert_eq!(table.row_iter().count(), 0);
    }
}
