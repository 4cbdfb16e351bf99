//! stockwatch core: rolling quote windows and the merge-and-derive engine.
//!
//! - Domain types (quote records, rolling windows, markets)
//! - Engine: gap detection, window merge, moving-average derivation
//! - Quote sources (Naver chart feed, Yahoo chart API) behind one trait
//! - Per-symbol JSON store with quarantine and an optional CSV mirror
//!
//! The engine never touches the network or the filesystem; sources and the
//! store are adapters around it.

pub mod data;
pub mod domain;
pub mod engine;
pub mod store;
