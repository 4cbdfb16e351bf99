//! Watch-list extraction from a portfolio Markdown document.
//!
//! The list lives in the section whose `##` heading mentions "Watchlist":
//!
//! ```text
//! ## 관심 종목 (Watchlist)
//!
//! | 종목명   | 종목코드 |
//! |----------|----------|
//! | 삼성전자 | 005930   |
//! ```
//!
//! The section runs until the next `##` heading; US documents also end it at a
//! `---` rule. Domestic codes are any 6-digit cell; US tickers are upper-case
//! symbols in the last column.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use stockwatch_core::domain::Market;
use thiserror::Error;

static KR_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{6}$").unwrap());
static US_TICKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9.\-]{0,9}$").unwrap());

#[derive(Debug, Error)]
pub enum WatchlistError {
    #[error("failed to read watch-list {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no Watchlist section found")]
    SectionNotFound,
}

/// Read `path` and extract the market's symbols.
pub fn load_watchlist(path: &Path, market: Market) -> Result<Vec<String>, WatchlistError> {
    let content = std::fs::read_to_string(path).map_err(|source| WatchlistError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    extract_symbols(&content, market)
}

/// Symbols listed in the Watchlist section, de-duplicated in document order.
pub fn extract_symbols(markdown: &str, market: Market) -> Result<Vec<String>, WatchlistError> {
    let mut lines = markdown.lines();
    lines
        .by_ref()
        .find(|line| is_watchlist_heading(line))
        .ok_or(WatchlistError::SectionNotFound)?;

    let mut symbols: Vec<String> = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.starts_with("##") || (market == Market::Us && line.starts_with("---")) {
            break;
        }
        if !line.starts_with('|') {
            continue;
        }

        let cells: Vec<&str> = line
            .trim_matches('|')
            .split('|')
            .map(str::trim)
            .collect();

        let found: Vec<&str> = match market {
            Market::Kr => cells.into_iter().filter(|c| KR_CODE.is_match(c)).collect(),
            Market::Us => cells
                .into_iter()
                .rev()
                .find(|c| !c.is_empty())
                .filter(|c| US_TICKER.is_match(c))
                .into_iter()
                .collect(),
        };

        for symbol in found {
            if !symbols.iter().any(|s| s == symbol) {
                symbols.push(symbol.to_string());
            }
        }
    }

    tracing::debug!(market = %market, count = symbols.len(), "watch-list extracted");
    Ok(symbols)
}

fn is_watchlist_heading(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("## ") && line.to_ascii_lowercase().contains("watchlist")
}
