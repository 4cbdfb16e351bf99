//! Per-symbol update pipeline.
//!
//! load → plan → fetch → merge → save. A failed fetch is not an error here:
//! the merge sees an empty batch and the stored window is left alone. Only
//! structural corruption (a source handing back another symbol's records)
//! comes back as `Err`.

use chrono::NaiveDate;
use serde::Serialize;
use stockwatch_core::data::{FetchSpan, QuoteSource};
use stockwatch_core::domain::{QuoteRecord, RollingWindow};
use stockwatch_core::engine::{FetchPlan, GapPolicy, MergeError, WindowMerger};
use stockwatch_core::store::WindowStore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),

    #[error("history span must be at least one day")]
    EmptySpan,
}

/// How a symbol's update ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// The window changed and was written.
    Saved,
    /// Nothing to write: the merged window matches what was stored.
    Unchanged,
    /// The source returned nothing usable; the stored window is untouched.
    FetchFailed(String),
    /// The merged window could not be written.
    SaveFailed(String),
}

impl UpdateOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, UpdateOutcome::FetchFailed(_) | UpdateOutcome::SaveFailed(_))
    }
}

/// What happened to one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolReport {
    pub symbol: String,
    /// `None` for explicit history fetches.
    pub plan: Option<FetchPlan>,
    pub span: FetchSpan,
    /// Records the source returned.
    pub fetched: usize,
    /// New dates that made it into the window.
    pub inserted: Vec<NaiveDate>,
    pub replaced: Vec<NaiveDate>,
    pub dropped_without_close: usize,
    pub window_len: usize,
    /// Most recent record after the update, for console summaries.
    pub latest: Option<QuoteRecord>,
    pub name: Option<String>,
    pub outcome: UpdateOutcome,
}

/// The collaborators one update needs.
pub struct Pipeline<'a> {
    source: &'a dyn QuoteSource,
    store: &'a dyn WindowStore,
    merger: WindowMerger,
    policy: GapPolicy,
}

impl<'a> Pipeline<'a> {
    pub fn new(source: &'a dyn QuoteSource, store: &'a dyn WindowStore) -> Self {
        Self {
            source,
            store,
            merger: WindowMerger::default(),
            policy: GapPolicy::default(),
        }
    }

    pub fn with_merger(mut self, merger: WindowMerger) -> Self {
        self.merger = merger;
        self
    }

    pub fn with_policy(mut self, policy: GapPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// The plan `update_symbol` would follow today, without fetching.
    pub fn plan(&self, symbol: &str, today: NaiveDate) -> FetchPlan {
        let persisted = self.store.load(symbol);
        self.policy.plan_fetch(symbol, persisted.as_ref(), today)
    }

    /// Bring one symbol's window up to date.
    pub fn update_symbol(&self, symbol: &str, today: NaiveDate) -> Result<SymbolReport, UpdateError> {
        let persisted = self.store.load(symbol);
        let plan = self.policy.plan_fetch(symbol, persisted.as_ref(), today);
        tracing::info!(symbol, plan = plan.label(), "updating");

        self.run(symbol, persisted, Some(plan), plan.span(), None)
    }

    /// Fetch an explicit span of history and merge it. With `target`, only the
    /// record for that date is kept from the fetched batch.
    pub fn fetch_history(
        &self,
        symbol: &str,
        days: usize,
        target: Option<NaiveDate>,
    ) -> Result<SymbolReport, UpdateError> {
        if days == 0 {
            return Err(UpdateError::EmptySpan);
        }
        let persisted = self.store.load(symbol);
        tracing::info!(symbol, days, target = ?target, "fetching history");

        self.run(symbol, persisted, None, FetchSpan::Days(days), target)
    }

    fn run(
        &self,
        symbol: &str,
        persisted: Option<RollingWindow>,
        plan: Option<FetchPlan>,
        span: FetchSpan,
        target: Option<NaiveDate>,
    ) -> Result<SymbolReport, UpdateError> {
        let loaded_fingerprint = persisted.as_ref().map(RollingWindow::fingerprint);
        let existing = persisted.unwrap_or_else(|| RollingWindow::empty(symbol));

        let (incoming, mut name, fetch_error) = match self.source.fetch(symbol, span) {
            Ok(result) => {
                let mut records = result.records;
                if let Some(date) = target {
                    records.retain(|r| r.date == date);
                }
                let error = match target {
                    Some(date) if records.is_empty() => Some(format!("no quote for {date}")),
                    _ => None,
                };
                (records, result.name, error)
            }
            Err(e) => {
                tracing::warn!(symbol, source = self.source.name(), error = %e, "fetch failed");
                (Vec::new(), None, Some(e.to_string()))
            }
        };
        let fetched = incoming.len();

        let report = self.merger.merge(existing, incoming)?;
        if report.dropped_without_close > 0 {
            tracing::warn!(
                symbol,
                dropped = report.dropped_without_close,
                "records without a close were discarded"
            );
        }

        let inserted = report.retained_new_dates();
        let window = report.window;

        let outcome = if let Some(reason) = fetch_error {
            UpdateOutcome::FetchFailed(reason)
        } else if window.is_empty() {
            UpdateOutcome::FetchFailed("no records with a close".into())
        } else if loaded_fingerprint.as_deref() == Some(window.fingerprint().as_str()) {
            tracing::debug!(symbol, "window unchanged, skipping save");
            UpdateOutcome::Unchanged
        } else {
            match self.store.save(&window) {
                Ok(()) => {
                    tracing::info!(
                        symbol,
                        new = inserted.len(),
                        replaced = report.replaced.len(),
                        records = window.len(),
                        "window saved"
                    );
                    UpdateOutcome::Saved
                }
                Err(e) => {
                    tracing::error!(symbol, error = %e, "save failed");
                    UpdateOutcome::SaveFailed(e.to_string())
                }
            }
        };

        if name.is_none() {
            name = window.display_name().map(str::to_string);
        }

        Ok(SymbolReport {
            symbol: symbol.to_string(),
            plan,
            span,
            fetched,
            inserted,
            replaced: report.replaced,
            dropped_without_close: report.dropped_without_close,
            window_len: window.len(),
            latest: window.latest().cloned(),
            name,
            outcome,
        })
    }
}
