//! Upstream quote sources and the HTTP plumbing they share

pub mod circuit_breaker;
pub mod http;
pub mod naver;
pub mod provider;
pub mod yahoo;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use http::{HttpFetcher, HttpSettings};
pub use naver::NaverSource;
pub use provider::{DataError, DataSource, FetchResult, FetchSpan, QuoteSource};
pub use yahoo::YahooSource;
