//! Which upstream serves which market.

use crate::config::WatchConfig;
use chrono::NaiveDate;
use stockwatch_core::data::{DataError, NaverSource, QuoteSource, YahooSource};
use stockwatch_core::domain::Market;

/// Build the source for `market` from config. Each call gets its own circuit
/// breaker, shared by every worker that uses the returned source.
///
/// `as_of` pins the last day of date-ranged requests (Yahoo). The Naver feed
/// is count-based and always returns the most recent sessions.
pub fn source_for(
    config: &WatchConfig,
    market: Market,
    as_of: Option<NaiveDate>,
) -> Result<Box<dyn QuoteSource>, DataError> {
    let breaker = config.breaker();
    let source: Box<dyn QuoteSource> = match market {
        Market::Kr => Box::new(NaverSource::new(
            config.sources.naver_base_url.clone(),
            &config.http,
            breaker,
        )?),
        Market::Us => Box::new(
            YahooSource::new(config.sources.yahoo_base_url.clone(), &config.http, breaker)?
                .with_end_date(as_of),
        ),
    };
    tracing::debug!(market = %market, source = source.name(), "source ready");
    Ok(source)
}
