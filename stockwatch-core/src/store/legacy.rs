//! Records written by the earlier fetch scripts.
//!
//! Those files use Korean keys (`종목코드` or `티커`, `날짜`, `종가`, ...) and
//! hold prices either as numbers or as comma-grouped strings (`"78,200"`).
//! Their `MA5`/`MA10`/`MA20` fields are pre-formatted text and are ignored;
//! averages are re-derived on the next merge.

use crate::domain::QuoteRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
pub(crate) struct LegacyRecord {
    #[serde(rename = "종목코드", alias = "티커")]
    symbol: String,
    #[serde(rename = "종목명", default)]
    name: Option<String>,
    #[serde(rename = "날짜")]
    date: NaiveDate,
    #[serde(rename = "시가", default, deserialize_with = "lenient_number")]
    open: Option<f64>,
    #[serde(rename = "고가", default, deserialize_with = "lenient_number")]
    high: Option<f64>,
    #[serde(rename = "저가", default, deserialize_with = "lenient_number")]
    low: Option<f64>,
    #[serde(rename = "종가", default, deserialize_with = "lenient_number")]
    close: Option<f64>,
    #[serde(rename = "거래량", default, deserialize_with = "lenient_number")]
    volume: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Number(f64),
    Text(String),
}

/// Number, numeric string with thousands separators, or anything else as
/// missing (`"N/A"`, `null`).
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Lenient>::deserialize(deserializer)? {
        Some(Lenient::Number(n)) => Some(n),
        Some(Lenient::Text(s)) => s.trim().replace(',', "").parse::<f64>().ok(),
        None => None,
    }
    .filter(|n| n.is_finite()))
}

impl From<LegacyRecord> for QuoteRecord {
    fn from(r: LegacyRecord) -> Self {
        QuoteRecord {
            symbol: r.symbol,
            name: r.name.filter(|n| !n.trim().is_empty()),
            date: r.date,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume.filter(|v| *v >= 0.0).map(|v| v.round() as u64),
            ma5: None,
            ma10: None,
            ma20: None,
        }
    }
}
