//! Logging setup.

use anyhow::{anyhow, Result};

/// Env var that overrides `--log-level` with a full filter directive.
pub const LOG_ENV: &str = "STOCKWATCH_LOG";

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays pipeable.
pub fn init_tracing(log_level: &str, log_format: &str) -> Result<()> {
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| anyhow!("invalid log filter: {err}"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format.trim().to_lowercase().as_str() {
        "json" => builder.json().init(),
        "text" => builder.init(),
        other => return Err(anyhow!("unknown log format '{other}' (expected text or json)")),
    }
    Ok(())
}
