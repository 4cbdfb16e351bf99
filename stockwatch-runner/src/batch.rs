//! Parallel updates across many symbols.
//!
//! Symbols are independent: each worker owns one symbol's load/merge/save, and
//! the symbol list is de-duplicated first so no two workers ever write the
//! same file.

use crate::update::{Pipeline, SymbolReport, UpdateError, UpdateOutcome};
use chrono::NaiveDate;
use rayon::prelude::*;

/// Progress callbacks for batch updates. Called from worker threads.
pub trait UpdateProgress: Send + Sync {
    /// Called when a symbol's update starts.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol's update completes.
    fn on_complete(
        &self,
        symbol: &str,
        index: usize,
        total: usize,
        result: &Result<SymbolReport, UpdateError>,
    );

    /// Called once, after every symbol has finished.
    fn on_batch_complete(&self, summary: &BatchSummary);
}

/// Reports progress through `tracing`.
pub struct LogProgress;

impl UpdateProgress for LogProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        tracing::debug!(symbol, "[{}/{}] starting", index + 1, total);
    }

    fn on_complete(
        &self,
        symbol: &str,
        index: usize,
        total: usize,
        result: &Result<SymbolReport, UpdateError>,
    ) {
        match result {
            Ok(report) if report.outcome.is_failure() => {
                tracing::warn!(symbol, outcome = ?report.outcome, "[{}/{}] failed", index + 1, total)
            }
            Ok(report) => tracing::info!(
                symbol,
                new = report.inserted.len(),
                records = report.window_len,
                "[{}/{}] done",
                index + 1,
                total
            ),
            Err(e) => tracing::error!(symbol, error = %e, "[{}/{}] failed", index + 1, total),
        }
    }

    fn on_batch_complete(&self, summary: &BatchSummary) {
        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "batch complete"
        );
    }
}

/// Outcome of a batch, in input order.
#[derive(Debug)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<(String, Result<SymbolReport, UpdateError>)>,
}

impl BatchSummary {
    fn from_results(results: Vec<(String, Result<SymbolReport, UpdateError>)>) -> Self {
        let failed = results
            .iter()
            .filter(|(_, r)| r.as_ref().map_or(true, |report| report.outcome.is_failure()))
            .count();
        Self {
            total: results.len(),
            succeeded: results.len() - failed,
            failed,
            results,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// True when there was work and none of it succeeded.
    pub fn all_failed(&self) -> bool {
        self.total > 0 && self.succeeded == 0
    }

    pub fn reports(&self) -> impl Iterator<Item = &SymbolReport> {
        self.results.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    /// Symbols that failed, with a reason.
    pub fn failures(&self) -> Vec<(&str, String)> {
        self.results
            .iter()
            .filter_map(|(symbol, r)| match r {
                Ok(report) => match &report.outcome {
                    UpdateOutcome::FetchFailed(reason) | UpdateOutcome::SaveFailed(reason) => {
                        Some((symbol.as_str(), reason.clone()))
                    }
                    _ => None,
                },
                Err(e) => Some((symbol.as_str(), e.to_string())),
            })
            .collect()
    }
}

/// Drop repeated symbols, keeping first occurrences in order.
pub fn dedup_symbols(symbols: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    symbols
        .iter()
        .filter(|s| seen.insert(s.as_str()))
        .cloned()
        .collect()
}

/// Update every symbol, `parallelism` at a time (0 = rayon's default pool).
pub fn update_batch(
    pipeline: &Pipeline<'_>,
    symbols: &[String],
    today: NaiveDate,
    parallelism: usize,
    progress: &dyn UpdateProgress,
) -> BatchSummary {
    let symbols = dedup_symbols(symbols);
    let total = symbols.len();

    let run_one = |(index, symbol): (usize, &String)| {
        progress.on_start(symbol, index, total);
        let result = pipeline.update_symbol(symbol, today);
        progress.on_complete(symbol, index, total, &result);
        (symbol.clone(), result)
    };

    let results: Vec<(String, Result<SymbolReport, UpdateError>)> = if parallelism == 1 || total <= 1 {
        symbols.iter().enumerate().map(run_one).collect()
    } else if parallelism == 0 {
        symbols.par_iter().enumerate().map(run_one).collect()
    } else {
        match rayon::ThreadPoolBuilder::new().num_threads(parallelism).build() {
            Ok(pool) => pool.install(|| symbols.par_iter().enumerate().map(run_one).collect()),
            Err(e) => {
                tracing::warn!(error = %e, "thread pool unavailable, updating sequentially");
                symbols.iter().enumerate().map(run_one).collect()
            }
        }
    };

    let summary = BatchSummary::from_results(results);
    progress.on_batch_complete(&summary);
    summary
}
