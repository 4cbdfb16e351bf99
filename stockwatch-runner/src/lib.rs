//! stockwatch runner: keeps rolling quote windows current.
//!
//! Builds on `stockwatch-core` to provide:
//! - TOML configuration with defaults for every setting
//! - Watch-list extraction from portfolio Markdown documents
//! - The per-symbol update pipeline (load, plan, fetch, merge, save)
//! - Parallel batch updates with progress reporting

pub mod batch;
pub mod config;
pub mod sources;
pub mod update;
pub mod watchlist;

pub use batch::{dedup_symbols, update_batch, BatchSummary, LogProgress, UpdateProgress};
pub use config::{ConfigError, WatchConfig};
pub use sources::source_for;
pub use update::{Pipeline, SymbolReport, UpdateError, UpdateOutcome};
pub use watchlist::{extract_symbols, load_watchlist, WatchlistError};
