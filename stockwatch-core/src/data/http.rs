//! Blocking HTTP fetch with retries, exponential backoff and a circuit breaker.

use super::circuit_breaker::CircuitBreaker;
use super::provider::DataError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound for `HttpSettings::max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Transport settings shared by every source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_retries: 3,
            base_delay_ms: 500,
        }
    }
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl HttpFetcher {
    pub fn new(settings: &HttpSettings, breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| DataError::Client(e.to_string()))?;

        Ok(Self {
            client,
            breaker,
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
        })
    }

    pub fn is_available(&self) -> bool {
        self.breaker.is_allowed()
    }

    /// GET `url` and return the body bytes.
    ///
    /// 403 trips the breaker and fails at once; 404 maps to `SymbolNotFound`;
    /// 429, other non-2xx statuses and connect/timeout errors are retried.
    pub fn get_bytes(&self, url: &str, symbol: &str) -> Result<Vec<u8>, DataError> {
        if !self.breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.base_delay, attempt);
                tracing::debug!(symbol, attempt, delay_ms = delay.as_millis() as u64, "retrying");
                std::thread::sleep(delay);
            }

            if !self.breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.breaker.record_failure();
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();

            if status == reqwest::StatusCode::FORBIDDEN {
                self.breaker.trip();
                tracing::error!(symbol, "provider returned 403, circuit breaker tripped");
                return Err(DataError::CircuitBreakerTripped);
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                });
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if !status.is_success() {
                self.breaker.record_failure();
                last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                continue;
            }

            let body = resp
                .bytes()
                .map_err(|e| DataError::NetworkUnreachable(format!("reading body: {e}")))?;
            self.breaker.record_success();
            return Ok(body.to_vec());
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt - 1)`,
/// saturating instead of overflowing.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}
