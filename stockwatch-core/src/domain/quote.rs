//! QuoteRecord — one symbol's daily OHLCV plus derived moving averages.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Daily quote for a single symbol on a single trading date.
///
/// `close` is optional only because sources occasionally report a row without
/// one; such records never enter a rolling window. The `ma*` fields are owned
/// by the moving-average deriver and are always recomputed, never trusted
/// from a source or from a previous merge. `None` means "not available" and
/// serializes as an explicit `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub close: Option<f64>,
    #[serde(default)]
    pub volume: Option<u64>,
    #[serde(default)]
    pub ma5: Option<f64>,
    #[serde(default)]
    pub ma10: Option<f64>,
    #[serde(default)]
    pub ma20: Option<f64>,
}

/// Structural problems with a record at an adapter or store boundary.
#[derive(Debug, Error, PartialEq)]
pub enum QuoteError {
    #[error("unparseable trading date '{raw}'")]
    InvalidDate { raw: String },

    #[error("unparseable {field} value '{raw}'")]
    InvalidNumber { field: &'static str, raw: String },
}

impl QuoteRecord {
    /// A record carrying only a close price; OHLV and averages unset.
    pub fn new(symbol: impl Into<String>, date: NaiveDate, close: f64) -> Self {
        Self {
            symbol: symbol.into(),
            name: None,
            date,
            open: None,
            high: None,
            low: None,
            close: Some(close),
            volume: None,
            ma5: None,
            ma10: None,
            ma20: None,
        }
    }

    /// Set open/high/low in one go.
    pub fn with_ohl(mut self, open: f64, high: f64, low: f64) -> Self {
        self.open = Some(open);
        self.high = Some(high);
        self.low = Some(low);
        self
    }

    pub fn with_volume(mut self, volume: u64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Parse a compact `YYYYMMDD` date as used by chart feeds. The date is
    /// the merge key and cannot be defaulted, so failures are hard errors.
    pub fn parse_compact_date(raw: &str) -> Result<NaiveDate, QuoteError> {
        NaiveDate::parse_from_str(raw.trim(), "%Y%m%d").map_err(|_| QuoteError::InvalidDate {
            raw: raw.to_string(),
        })
    }

    /// Whether this record may enter a rolling window.
    pub fn has_close(&self) -> bool {
        self.close.is_some_and(f64::is_finite)
    }

    /// The close, if present and finite.
    pub fn valid_close(&self) -> Option<f64> {
        self.close.filter(|c| c.is_finite())
    }

    /// Forget any moving averages carried in from elsewhere.
    pub fn clear_moving_averages(&mut self) {
        self.ma5 = None;
        self.ma10 = None;
        self.ma20 = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample_record() -> QuoteRecord {
        QuoteRecord::new("005930", d(2024, 1, 2), 103.0)
            .with_ohl(100.0, 105.0, 98.0)
            .with_volume(50_000)
    }

    #[test]
    fn missing_close_is_rejected() {
        let mut rec = sample_record();
        rec.close = None;
        assert!(!rec.has_close());
        assert_eq!(rec.valid_close(), None);
    }

    #[test]
    fn nan_close_counts_as_missing() {
        let mut rec = sample_record();
        rec.close = Some(f64::NAN);
        assert!(!rec.has_close());
        assert_eq!(rec.valid_close(), None);
    }

    #[test]
    fn parse_compact_dates() {
        assert_eq!(QuoteRecord::parse_compact_date("20240110"), Ok(d(2024, 1, 10)));
        assert!(matches!(
            QuoteRecord::parse_compact_date("2024-01-10"),
            Err(QuoteError::InvalidDate { .. })
        ));
    }

    #[test]
    fn absent_averages_serialize_as_null() {
        let json = serde_json::to_value(sample_record()).unwrap();
        assert!(json["ma5"].is_null());
        assert!(json.as_object().unwrap().contains_key("ma20"));
        assert_eq!(json["date"], "2024-01-02");
    }

    #[test]
    fn averages_default_when_missing_on_disk() {
        let raw = r#"{"symbol":"AAPL","date":"2024-01-02","close":185.64}"#;
        let rec: QuoteRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(rec.close, Some(185.64));
        assert_eq!(rec.ma5, None);
        assert_eq!(rec.volume, None);
    }
}
