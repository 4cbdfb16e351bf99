//! RollingWindow — a symbol's most recent daily quotes, one per date.

use super::quote::QuoteRecord;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Maximum number of trading days retained per symbol.
pub const WINDOW_CAPACITY: usize = 20;

/// Date-unique set of quote records for one symbol.
///
/// Records are held most-recent-date first, which is also the order they are
/// listed and serialized in. Only the window merger produces windows whose
/// size and moving averages are guaranteed; `from_records` just normalizes
/// ordering and uniqueness of whatever it is handed.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindow {
    symbol: String,
    records: Vec<QuoteRecord>,
}

impl RollingWindow {
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            records: Vec::new(),
        }
    }

    /// Build a window from records in any order. Later duplicates of a date
    /// replace earlier ones.
    pub fn from_records(symbol: impl Into<String>, records: Vec<QuoteRecord>) -> Self {
        let by_date: BTreeMap<NaiveDate, QuoteRecord> =
            records.into_iter().map(|r| (r.date, r)).collect();
        Self::from_ascending(symbol, by_date.into_values().collect())
    }

    /// Build from records already sorted oldest-first with unique dates.
    pub(crate) fn from_ascending(symbol: impl Into<String>, mut ascending: Vec<QuoteRecord>) -> Self {
        ascending.reverse();
        Self {
            symbol: symbol.into(),
            records: ascending,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records, most recent first.
    pub fn records(&self) -> &[QuoteRecord] {
        &self.records
    }

    /// Records, oldest first.
    pub fn iter_ascending(&self) -> impl Iterator<Item = &QuoteRecord> {
        self.records.iter().rev()
    }

    /// Consume into records, oldest first.
    pub fn into_ascending(self) -> Vec<QuoteRecord> {
        let mut records = self.records;
        records.reverse();
        records
    }

    pub fn into_records(self) -> Vec<QuoteRecord> {
        self.records
    }

    pub fn latest(&self) -> Option<&QuoteRecord> {
        self.records.first()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.latest().map(|r| r.date)
    }

    pub fn oldest_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    pub fn get(&self, date: NaiveDate) -> Option<&QuoteRecord> {
        self.records.iter().find(|r| r.date == date)
    }

    /// Display name reported by the most recent record that carries one.
    pub fn display_name(&self) -> Option<&str> {
        self.records.iter().find_map(|r| r.name.as_deref())
    }

    /// BLAKE3 fingerprint over every field of every record.
    ///
    /// Two windows with equal fingerprints serialize identically, so callers
    /// can skip rewriting a store entry that did not change.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.symbol.as_bytes());
        for r in &self.records {
            hasher.update(r.date.to_string().as_bytes());
            hasher.update(r.name.as_deref().unwrap_or_default().as_bytes());
            hasher.update(&[0]);
            for value in [r.open, r.high, r.low, r.close, r.ma5, r.ma10, r.ma20] {
                hash_optional(&mut hasher, value.map(f64::to_bits));
            }
            hash_optional(&mut hasher, r.volume);
        }
        hasher.finalize().to_hex().to_string()
    }
}

fn hash_optional(hasher: &mut blake3::Hasher, value: Option<u64>) {
    match value {
        Some(v) => {
            hasher.update(&[1]);
            hasher.update(&v.to_le_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
}
