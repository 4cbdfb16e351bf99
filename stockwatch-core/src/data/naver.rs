//! Naver chart-feed source for domestic (KRX) codes.
//!
//! The daily feed is a small XML document:
//!
//! ```text
//! <chartdata symbol="005930" name="..." count="20" timeframe="day" ...>
//!   <item data="20240102|78200|79800|78200|79600|17142847" />
//! </chartdata>
//! ```
//!
//! Each item is `date|open|high|low|close|volume`. The feed's `count` is in
//! trading days, so a span maps onto it directly; `Latest` asks for one item.

use super::circuit_breaker::CircuitBreaker;
use super::http::{HttpFetcher, HttpSettings};
use super::provider::{keep_most_recent, DataError, DataSource, FetchResult, FetchSpan, QuoteSource};
use crate::domain::{QuoteError, QuoteRecord};
use regex::Regex;
use std::sync::{Arc, LazyLock};

pub const DEFAULT_BASE_URL: &str = "https://fchart.stock.naver.com";

static CHARTDATA_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<chartdata\b[^>]*?\bname="([^"]*)""#).unwrap());
static ITEM_DATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<item\s+data="([^"]*)""#).unwrap());

pub struct NaverSource {
    http: HttpFetcher,
    base_url: String,
}

impl NaverSource {
    pub fn new(
        base_url: impl Into<String>,
        settings: &HttpSettings,
        breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, DataError> {
        Ok(Self {
            http: HttpFetcher::new(settings, breaker)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn sise_url(base: &str, code: &str, count: usize) -> String {
        format!("{base}/sise.nhn?symbol={code}&timeframe=day&count={count}&requestType=0")
    }

    /// Parse an EUC-KR feed body into oldest-first records.
    ///
    /// Only the display name needs more than ASCII; a name that does not
    /// decode cleanly is dropped rather than garbled.
    fn parse_feed(code: &str, body: &[u8]) -> Result<FetchResult, DataError> {
        let (text, _, had_errors) = encoding_rs::EUC_KR.decode(body);
        if had_errors {
            tracing::debug!(symbol = code, "feed contained bytes outside EUC-KR");
        }

        if !text.contains("<chartdata") {
            return Err(DataError::ResponseFormatChanged(
                "chart data element missing".into(),
            ));
        }

        let name = CHARTDATA_NAME
            .captures(&text)
            .map(|c| c[1].trim().to_string())
            .filter(|n| !n.is_empty() && !n.contains(char::REPLACEMENT_CHARACTER));

        let mut records = Vec::new();
        for caps in ITEM_DATA.captures_iter(&text) {
            let mut record = parse_item(code, &caps[1]).map_err(|e| {
                DataError::ResponseFormatChanged(format!("bad item for {code}: {e}"))
            })?;
            record.name = name.clone();
            records.push(record);
        }

        if records.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: code.to_string(),
            });
        }

        records.sort_by_key(|r| r.date);

        Ok(FetchResult {
            symbol: code.to_string(),
            name,
            records,
            source: DataSource::Naver,
        })
    }
}

/// `date|open|high|low|close|volume`; blank or `null` fields become `None`.
fn parse_item(code: &str, raw: &str) -> Result<QuoteRecord, QuoteError> {
    let parts: Vec<&str> = raw.split('|').map(str::trim).collect();
    if parts.len() < 6 {
        return Err(QuoteError::InvalidNumber {
            field: "item",
            raw: raw.to_string(),
        });
    }

    let date = QuoteRecord::parse_compact_date(parts[0])?;

    Ok(QuoteRecord {
        symbol: code.to_string(),
        name: None,
        date,
        open: parse_price("open", parts[1])?,
        high: parse_price("high", parts[2])?,
        low: parse_price("low", parts[3])?,
        close: parse_price("close", parts[4])?,
        volume: parse_volume(parts[5])?,
        ma5: None,
        ma10: None,
        ma20: None,
    })
}

fn is_blank(raw: &str) -> bool {
    raw.is_empty() || raw.eq_ignore_ascii_case("null")
}

fn parse_price(field: &'static str, raw: &str) -> Result<Option<f64>, QuoteError> {
    if is_blank(raw) {
        return Ok(None);
    }
    raw.replace(',', "")
        .parse::<f64>()
        .map(Some)
        .map_err(|_| QuoteError::InvalidNumber {
            field,
            raw: raw.to_string(),
        })
}

fn parse_volume(raw: &str) -> Result<Option<u64>, QuoteError> {
    if is_blank(raw) {
        return Ok(None);
    }
    raw.replace(',', "")
        .parse::<u64>()
        .map(Some)
        .map_err(|_| QuoteError::InvalidNumber {
            field: "volume",
            raw: raw.to_string(),
        })
}

impl QuoteSource for NaverSource {
    fn name(&self) -> &str {
        "naver_chart"
    }

    fn fetch(&self, symbol: &str, span: FetchSpan) -> Result<FetchResult, DataError> {
        let count = span.trading_days();
        let url = Self::sise_url(&self.base_url, symbol, count);

        tracing::debug!(symbol, %span, %url, "requesting naver chart feed");
        let body = self.http.get_bytes(&url, symbol)?;

        let mut result = Self::parse_feed(symbol, &body)?;
        result.records = keep_most_recent(result.records, count);
        Ok(result)
    }

    fn is_available(&self) -> bool {
        self.http.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const FEED: &str = r#"<?xml version="1.0" encoding="EUC-KR" ?>
<protocol>
    <chartdata symbol="005930" name="Samsung Elec" count="3" timeframe="day" precision="0" origintime="19900103">
        <item data="20240104|76100|77300|76000|77000|15324439" />
        <item data="20240102|78200|79800|78200|79600|17142847" />
        <item data="20240103|78500|78800|77000|77000|21753644" />
    </chartdata>
</protocol>"#;

    #[test]
    fn parses_items_oldest_first() {
        let result = NaverSource::parse_feed("005930", FEED.as_bytes()).unwrap();
        assert_eq!(result.source, DataSource::Naver);
        assert_eq!(result.name.as_deref(), Some("Samsung Elec"));
        let dates: Vec<_> = result.records.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-01-02", "2024-01-03", "2024-01-04"]);

        let first = &result.records[0];
        assert_eq!(first.open, Some(78200.0));
        assert_eq!(first.close, Some(79600.0));
        assert_eq!(first.volume, Some(17_142_847));
        assert_eq!(first.symbol, "005930");
    }

    /// Replace the chart name with raw bytes, as the feed sends them.
    fn feed_with_name(name: &[u8]) -> Vec<u8> {
        let (head, tail) = FEED.split_once("Samsung Elec").unwrap();
        [head.as_bytes(), name, tail.as_bytes()].concat()
    }

    #[test]
    fn korean_name_is_decoded_from_euc_kr() {
        // 삼성전자
        let body = feed_with_name(&[0xBB, 0xEF, 0xBC, 0xBA, 0xC0, 0xFC, 0xC0, 0xDA]);
        let result = NaverSource::parse_feed("005930", &body).unwrap();
        assert_eq!(result.name.as_deref(), Some("삼성전자"));
        assert!(result
            .records
            .iter()
            .all(|r| r.name.as_deref() == Some("삼성전자")));
    }

    #[test]
    fn undecodable_name_is_dropped() {
        let body = feed_with_name(&[0xFF, 0xFF]);
        let result = NaverSource::parse_feed("005930", &body).unwrap();
        assert_eq!(result.name, None);
        assert_eq!(result.records.len(), 3);
    }

    #[test]
    fn blank_close_becomes_none() {
        let rec = parse_item("005930", "20240105|1|2|1||100").unwrap();
        assert_eq!(rec.close, None);
        assert_eq!(rec.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn malformed_item_is_a_format_change() {
        let body = FEED.replace("20240103|78500", "2024-x3|78500");
        assert!(matches!(
            NaverSource::parse_feed("005930", body.as_bytes()),
            Err(DataError::ResponseFormatChanged(_))
        ));
        assert!(parse_item("005930", "20240105|1|2").is_err());
        assert!(parse_item("005930", "20240105|1|2|1|abc|100").is_err());
    }

    #[test]
    fn empty_feed_is_not_found() {
        let body = r#"<protocol><chartdata symbol="999999" name="" count="0"></chartdata></protocol>"#;
        assert!(matches!(
            NaverSource::parse_feed("999999", body.as_bytes()),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn missing_chartdata_is_a_format_change() {
        assert!(matches!(
            NaverSource::parse_feed("005930", b"<html>blocked</html>"),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn url_uses_trading_day_count() {
        assert_eq!(
            NaverSource::sise_url(DEFAULT_BASE_URL, "005930", 20),
            "https://fchart.stock.naver.com/sise.nhn?symbol=005930&timeframe=day&count=20&requestType=0"
        );
    }
}
