//! Yahoo Finance chart source for foreign tickers.
//!
//! Fetches daily OHLCV from the v8 chart API. Yahoo has no official API and is
//! subject to unannounced format changes; every structural surprise maps to
//! `DataError::ResponseFormatChanged`.

use super::circuit_breaker::CircuitBreaker;
use super::http::{HttpFetcher, HttpSettings};
use super::provider::{keep_most_recent, DataError, DataSource, FetchResult, FetchSpan, QuoteSource};
use crate::domain::QuoteRecord;
use crate::engine::round_cents;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    short_name: Option<String>,
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

pub struct YahooSource {
    http: HttpFetcher,
    base_url: String,
    /// Last calendar day requested; the current UTC date when unset.
    end_date: Option<NaiveDate>,
}

impl YahooSource {
    pub fn new(
        base_url: impl Into<String>,
        settings: &HttpSettings,
        breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, DataError> {
        Ok(Self {
            http: HttpFetcher::new(settings, breaker)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            end_date: None,
        })
    }

    /// Request history ending at `date` instead of today.
    pub fn with_end_date(mut self, date: Option<NaiveDate>) -> Self {
        self.end_date = date;
        self
    }

    fn request_url(&self, symbol: &str, span: FetchSpan) -> String {
        let end = self
            .end_date
            .unwrap_or_else(|| chrono::Utc::now().date_naive());
        let start = end - chrono::Duration::days(Self::calendar_lookback(span.trading_days()));
        Self::chart_url(&self.base_url, symbol, start, end)
    }

    /// Chart URL covering `start..=end` at daily resolution.
    fn chart_url(base: &str, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .and_hms_opt(23, 59, 59)
            .unwrap_or_else(|| end.and_time(chrono::NaiveTime::MIN))
            .and_utc()
            .timestamp();
        format!(
            "{base}/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d&includePrePost=false"
        )
    }

    /// Calendar days that safely contain `trading_days` sessions.
    fn calendar_lookback(trading_days: usize) -> i64 {
        (trading_days as i64 * 7) / 5 + 10
    }

    /// Parse the chart response into oldest-first records.
    ///
    /// Rows with every field null are non-trading days and skipped; rows
    /// missing only the close are kept with `close: None` for the caller to
    /// drop and report.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<FetchResult, DataError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        let timestamps = data
            .timestamp
            .ok_or_else(|| DataError::ResponseFormatChanged("no timestamps".into()))?;

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let name = data.meta.short_name;
        let offset = data.meta.gmtoffset;
        let mut records = Vec::with_capacity(timestamps.len());

        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts + offset, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            if open.is_none() && high.is_none() && low.is_none() && close.is_none() && volume.is_none()
            {
                continue;
            }

            records.push(QuoteRecord {
                symbol: symbol.to_string(),
                name: name.clone(),
                date,
                open: open.map(round_cents),
                high: high.map(round_cents),
                low: low.map(round_cents),
                close: close.map(round_cents),
                volume,
                ma5: None,
                ma10: None,
                ma20: None,
            });
        }

        if records.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        // The live session can appear twice (last bar + regular-market bar).
        records.dedup_by(|later, earlier| {
            if later.date != earlier.date {
                return false;
            }
            std::mem::swap(later, earlier);
            true
        });

        Ok(FetchResult {
            symbol: symbol.to_string(),
            name,
            records,
            source: DataSource::Yahoo,
        })
    }
}

impl QuoteSource for YahooSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(&self, symbol: &str, span: FetchSpan) -> Result<FetchResult, DataError> {
        let url = self.request_url(symbol, span);

        tracing::debug!(symbol, %span, %url, "requesting yahoo chart");
        let body = self.http.get_bytes(&url, symbol)?;
        let chart: ChartResponse = serde_json::from_slice(&body).map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;

        let mut result = Self::parse_response(symbol, chart)?;
        result.records = keep_most_recent(result.records, span.trading_days());
        Ok(result)
    }

    fn is_available(&self) -> bool {
        self.http.is_available()
    }
}
