//! Durable per-symbol window storage.
//!
//! Layout: `{root}/stock_{SYMBOL}.json`, optionally mirrored to
//! `{root}/stock_{SYMBOL}.csv`.
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Corrupt files are quarantined (`{filename}.quarantined`) and read as absent
//! - Korean-keyed files from the earlier fetch scripts (arrays or a single
//!   snapshot object) are read and rewritten in the current shape on save

pub mod csv_mirror;
pub mod json;
mod legacy;

pub use json::JsonStore;

use crate::domain::RollingWindow;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("'{0}' cannot be used as a file name")]
    InvalidSymbol(String),

    #[error("failed to create {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to serialize window for {symbol}: {source}")]
    Serialize {
        symbol: String,
        source: serde_json::Error,
    },

    #[error("failed to write csv mirror for {symbol}: {source}")]
    Csv { symbol: String, source: csv::Error },
}

/// Load/save of rolling windows, one entry per symbol.
///
/// `load` never fails: a missing or unreadable entry is simply absent, which
/// the gap detector turns into a cold start. `save` failures are reported to
/// the caller and are not retried.
pub trait WindowStore: Send + Sync {
    fn load(&self, symbol: &str) -> Option<RollingWindow>;

    fn save(&self, window: &RollingWindow) -> Result<(), StoreError>;
}

/// Symbols end up in file names; reject anything that could leave the root.
pub(crate) fn check_file_symbol(symbol: &str) -> Result<(), StoreError> {
    let bad = symbol.is_empty()
        || symbol.starts_with('.')
        || symbol
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':') || c.is_control() || c.is_whitespace());
    if bad {
        return Err(StoreError::InvalidSymbol(symbol.to_string()));
    }
    Ok(())
}
