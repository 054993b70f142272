//! Symbol list loading.
//!
//! The symbol universe comes from a CSV file with a `Symbol` header column
//! (any other columns are ignored). Symbols are uppercased and deduplicated
//! while preserving file order, then capped to the requested count.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, anyhow};

pub fn load_symbols(path: &Path, cap: usize) -> anyhow::Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("could not open symbol file {}", path.display()))?;

    let headers = reader.headers()?;
    let column = headers
        .iter()
        .position(|h| h.trim() == "Symbol")
        .ok_or_else(|| anyhow!("symbol file {} has no 'Symbol' column", path.display()))?;

    let mut seen = HashSet::new();
    let mut symbols = Vec::new();

    for record in reader.records() {
        let record = record?;
        let Some(raw) = record.get(column) else {
            continue;
        };
        let symbol = raw.trim().to_uppercase();
        if symbol.is_empty() {
            continue;
        }
        if seen.insert(symbol.clone()) {
            symbols.push(symbol);
        }
        if symbols.len() == cap {
            break;
        }
    }

    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn uppercases_dedups_and_preserves_order() {
        let file = write_csv("Symbol,Name\naapl,Apple\nMSFT,Microsoft\nAAPL,Apple\n googl ,Alphabet\n");
        let symbols = load_symbols(file.path(), 10).unwrap();
        assert_eq!(symbols, vec!["AAPL", "MSFT", "GOOGL"]);
    }

    #[test]
    fn caps_to_requested_count() {
        let file = write_csv("Symbol\nA\nB\nC\nD\n");
        let symbols = load_symbols(file.path(), 2).unwrap();
        assert_eq!(symbols, vec!["A", "B"]);
    }

    #[test]
    fn missing_symbol_column_is_an_error() {
        let file = write_csv("Ticker\nAAPL\n");
        let err = load_symbols(file.path(), 10).unwrap_err();
        assert!(err.to_string().contains("Symbol"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_symbols(Path::new("does/not/exist.csv"), 10).is_err());
    }

    #[test]
    fn blank_rows_are_skipped() {
        let file = write_csv("Symbol\nAAPL\n  \nMSFT\n");
        let symbols = load_symbols(file.path(), 10).unwrap();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    }
}
