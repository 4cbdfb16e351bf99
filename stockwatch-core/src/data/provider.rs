//! Quote source trait and structured error types.
//!
//! The QuoteSource trait abstracts over upstreams (Naver chart feed, Yahoo
//! chart API) so the update pipeline can be driven by mocks in tests.

use crate::domain::{QuoteRecord, SymbolError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// How much history to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchSpan {
    /// The most recent `n` trading days.
    Days(usize),
    /// Only the latest trading day's snapshot.
    Latest,
}

impl FetchSpan {
    /// Number of trading days this span asks for.
    pub fn trading_days(&self) -> usize {
        match *self {
            FetchSpan::Days(n) => n,
            FetchSpan::Latest => 1,
        }
    }
}

impl fmt::Display for FetchSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchSpan::Days(n) => write!(f, "{n} days"),
            FetchSpan::Latest => f.write_str("latest"),
        }
    }
}

/// Structured error types for fetches.
///
/// The update pipeline treats every variant the same way (no new records this
/// run); the distinction is for logs and the batch summary.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error(transparent)]
    InvalidSymbol(#[from] SymbolError),

    #[error("http client setup failed: {0}")]
    Client(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Records returned by one fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    /// Display name reported by the source, if any.
    pub name: Option<String>,
    /// Oldest first. May contain records without a close.
    pub records: Vec<QuoteRecord>,
    pub source: DataSource,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Naver,
    Yahoo,
    Fixture,
}

/// An upstream that produces daily quote records.
///
/// Implementations know nothing about windows or persistence.
pub trait QuoteSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch up to `span` trading days of quotes for `symbol`, oldest first.
    fn fetch(&self, symbol: &str, span: FetchSpan) -> Result<FetchResult, DataError>;

    /// Whether the source is currently accepting requests.
    fn is_available(&self) -> bool;
}

/// Keep the last `n` entries of an oldest-first list.
pub(crate) fn keep_most_recent<T>(mut items: Vec<T>, n: usize) -> Vec<T> {
    let excess = items.len().saturating_sub(n);
    items.drain(..excess);
    items
}
