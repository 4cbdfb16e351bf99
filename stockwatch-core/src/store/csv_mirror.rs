//! CSV rendering of a window, for spreadsheet users.
//!
//! Same row order and columns as the JSON file. The output starts with a
//! UTF-8 byte-order mark so spreadsheet tools pick the right encoding for
//! Korean display names.

use crate::domain::{QuoteRecord, RollingWindow};
use chrono::NaiveDate;
use serde::Serialize;

const BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Serialize)]
struct CsvRow<'a> {
    symbol: &'a str,
    name: &'a str,
    date: NaiveDate,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<u64>,
    ma5: Option<f64>,
    ma10: Option<f64>,
    ma20: Option<f64>,
}

impl<'a> From<&'a QuoteRecord> for CsvRow<'a> {
    fn from(r: &'a QuoteRecord) -> Self {
        Self {
            symbol: &r.symbol,
            name: r.name.as_deref().unwrap_or_default(),
            date: r.date,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
            ma5: r.ma5,
            ma10: r.ma10,
            ma20: r.ma20,
        }
    }
}

/// Render `window` as CSV bytes, most recent date first. Missing values are
/// empty cells.
pub fn render(window: &RollingWindow) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(BOM.to_vec());
    if window.is_empty() {
        writer.write_record([
            "symbol", "name", "date", "open", "high", "low", "close", "volume", "ma5", "ma10",
            "ma20",
        ])?;
    }
    for record in window.records() {
        writer.serialize(CsvRow::from(record))?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
