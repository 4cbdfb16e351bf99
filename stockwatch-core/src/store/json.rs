//! JSON file store.

use super::csv_mirror;
use super::legacy::LegacyRecord;
use super::{check_file_symbol, StoreError, WindowStore};
use crate::domain::{QuoteRecord, RollingWindow};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// On-disk shapes accepted by `load`.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredWindow {
    Many(Vec<QuoteRecord>),
    /// Files from the earlier fetch scripts, Korean-keyed.
    LegacyMany(Vec<LegacyRecord>),
    /// Those scripts sometimes saved a single snapshot object.
    LegacyOne(LegacyRecord),
}

impl StoredWindow {
    fn into_records(self) -> Vec<QuoteRecord> {
        match self {
            StoredWindow::Many(records) => records,
            StoredWindow::LegacyMany(records) => records.into_iter().map(QuoteRecord::from).collect(),
            StoredWindow::LegacyOne(record) => vec![record.into()],
        }
    }
}

/// Stores each symbol's window as a pretty-printed JSON array, most recent
/// date first.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
    csv_mirror: bool,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            csv_mirror: false,
        }
    }

    /// Also write `stock_{SYMBOL}.csv` next to every saved JSON file.
    pub fn with_csv_mirror(mut self, enabled: bool) -> Self {
        self.csv_mirror = enabled;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/stock_{SYMBOL}.json`
    pub fn json_path(&self, symbol: &str) -> PathBuf {
        self.root.join(format!("stock_{symbol}.json"))
    }

    /// `{root}/stock_{SYMBOL}.csv`
    pub fn csv_path(&self, symbol: &str) -> PathBuf {
        self.root.join(format!("stock_{symbol}.csv"))
    }

    fn quarantine(&self, path: &Path, reason: &str) {
        let mut target = path.as_os_str().to_owned();
        target.push(".quarantined");
        tracing::warn!(path = %path.display(), reason, "quarantining corrupt window file");
        if let Err(e) = fs::rename(path, &target) {
            tracing::warn!(path = %path.display(), error = %e, "quarantine rename failed");
        }
    }

    fn read_records(&self, symbol: &str, path: &Path) -> Option<Vec<QuoteRecord>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(symbol, "no stored window");
                return None;
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                self.quarantine(path, "not valid utf-8");
                return None;
            }
            Err(e) => {
                tracing::warn!(symbol, error = %e, "stored window unreadable");
                return None;
            }
        };

        match serde_json::from_str::<StoredWindow>(content.trim_start_matches('\u{feff}')) {
            Ok(stored) => Some(stored.into_records()),
            Err(e) => {
                self.quarantine(path, &e.to_string());
                None
            }
        }
    }
}

impl WindowStore for JsonStore {
    fn load(&self, symbol: &str) -> Option<RollingWindow> {
        check_file_symbol(symbol).ok()?;
        let path = self.json_path(symbol);
        let records = self.read_records(symbol, &path)?;

        let total = records.len();
        let usable: Vec<QuoteRecord> = records
            .into_iter()
            .filter(|r| r.symbol == symbol && r.has_close())
            .collect();
        if usable.len() < total {
            tracing::warn!(
                symbol,
                skipped = total - usable.len(),
                "stored records with another symbol or no close were skipped"
            );
        }
        if usable.is_empty() {
            return None;
        }

        Some(RollingWindow::from_records(symbol, usable))
    }

    fn save(&self, window: &RollingWindow) -> Result<(), StoreError> {
        let symbol = window.symbol();
        check_file_symbol(symbol)?;

        fs::create_dir_all(&self.root).map_err(|source| StoreError::CreateDir {
            path: self.root.clone(),
            source,
        })?;

        let json =
            serde_json::to_vec_pretty(window.records()).map_err(|source| StoreError::Serialize {
                symbol: symbol.to_string(),
                source,
            })?;
        write_atomic(&self.json_path(symbol), &json)?;

        if self.csv_mirror {
            let csv = csv_mirror::render(window).map_err(|source| StoreError::Csv {
                symbol: symbol.to_string(),
                source,
            })?;
            write_atomic(&self.csv_path(symbol), &csv)?;
        }

        tracing::debug!(symbol, records = window.len(), "window saved");
        Ok(())
    }
}

/// Write to `{path}.tmp` and rename into place.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).map_err(|source| StoreError::Write {
        path: tmp.clone(),
        source,
    })?;

    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        StoreError::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}
