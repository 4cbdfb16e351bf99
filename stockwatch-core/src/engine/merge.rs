//! Window merger — folds a batch of fetched quotes into a rolling window.
//!
//! Order of operations matters: overwrite by date, derive moving averages over
//! the full merged set, and only then truncate to capacity. Truncating first
//! would starve the averages near the cut of their look-back.

use super::moving_average::derive;
use crate::domain::{QuoteRecord, RollingWindow, WINDOW_CAPACITY};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MergeError {
    #[error("record for '{found}' on {date} cannot merge into the window of '{expected}'")]
    SymbolMismatch {
        expected: String,
        found: String,
        date: NaiveDate,
    },
}

/// What a merge did, alongside the resulting window.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub window: RollingWindow,
    /// Dates that were not in the existing window, ascending.
    pub inserted: Vec<NaiveDate>,
    /// Dates whose existing record was replaced, ascending.
    pub replaced: Vec<NaiveDate>,
    /// Incoming records discarded for lack of a close.
    pub dropped_without_close: usize,
    /// Dates pushed out by truncation, ascending.
    pub evicted: Vec<NaiveDate>,
}

impl MergeReport {
    /// Inserted dates that survived truncation.
    pub fn retained_new_dates(&self) -> Vec<NaiveDate> {
        self.inserted
            .iter()
            .copied()
            .filter(|d| !self.evicted.contains(d))
            .collect()
    }
}

/// Merges incoming quotes into a window of bounded capacity.
#[derive(Debug, Clone, Copy)]
pub struct WindowMerger {
    capacity: usize,
}

impl Default for WindowMerger {
    fn default() -> Self {
        Self::new(WINDOW_CAPACITY)
    }
}

impl WindowMerger {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "window capacity must be >= 1");
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Merge `incoming` into `existing`.
    ///
    /// Each incoming record fully replaces any existing record of the same
    /// date; among incoming duplicates the last one wins. Records without a
    /// close are dropped and counted. An effectively empty batch returns the
    /// existing window untouched.
    pub fn merge(
        &self,
        existing: RollingWindow,
        incoming: Vec<QuoteRecord>,
    ) -> Result<MergeReport, MergeError> {
        if let Some(stranger) = incoming.iter().find(|r| r.symbol != existing.symbol()) {
            return Err(MergeError::SymbolMismatch {
                expected: existing.symbol().to_string(),
                found: stranger.symbol.clone(),
                date: stranger.date,
            });
        }

        let incoming_len = incoming.len();
        let accepted: Vec<QuoteRecord> = incoming.into_iter().filter(QuoteRecord::has_close).collect();
        let dropped_without_close = incoming_len - accepted.len();

        if accepted.is_empty() {
            return Ok(MergeReport {
                window: existing,
                inserted: Vec::new(),
                replaced: Vec::new(),
                dropped_without_close,
                evicted: Vec::new(),
            });
        }

        let symbol = existing.symbol().to_string();
        let mut by_date: BTreeMap<NaiveDate, QuoteRecord> = existing
            .into_ascending()
            .into_iter()
            .map(|r| (r.date, r))
            .collect();

        let mut inserted = Vec::new();
        let mut replaced = Vec::new();
        for mut record in accepted {
            record.clear_moving_averages();
            let date = record.date;
            match by_date.insert(date, record) {
                Some(_) if !inserted.contains(&date) => replaced.push(date),
                Some(_) => {}
                None => inserted.push(date),
            }
        }
        inserted.sort_unstable();
        replaced.sort_unstable();
        replaced.dedup();

        let mut ascending = derive(by_date.into_values().collect());

        let overflow = ascending.len().saturating_sub(self.capacity);
        let evicted: Vec<NaiveDate> = ascending.drain(..overflow).map(|r| r.date).collect();

        Ok(MergeReport {
            window: RollingWindow::from_ascending(symbol, ascending),
            inserted,
            replaced,
            dropped_without_close,
            evicted,
        })
    }
}

/// Merge with the default 20-day capacity, returning only the window.
pub fn merge(
    existing: RollingWindow,
    incoming: Vec<QuoteRecord>,
) -> Result<RollingWindow, MergeError> {
    WindowMerger::default()
        .merge(existing, incoming)
        .map(|report| report.window)
}
