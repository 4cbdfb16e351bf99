//! Integration tests for batch updates against a JSON store.
//!
//! A fixture source stands in for the network: it serves a fixed close ramp
//! per symbol and fails for symbols it does not know.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;
use stockwatch_core::data::{DataError, DataSource, FetchResult, FetchSpan, QuoteSource};
use stockwatch_core::domain::{Market, QuoteRecord};
use stockwatch_core::engine::FetchPlan;
use stockwatch_core::store::{JsonStore, WindowStore};
use stockwatch_runner::{
    extract_symbols, update_batch, BatchSummary, Pipeline, SymbolReport, UpdateError,
    UpdateOutcome, UpdateProgress, WatchConfig,
};
use tempfile::TempDir;

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

struct FixtureSource {
    series: HashMap<String, Vec<QuoteRecord>>,
}

impl FixtureSource {
    fn new(symbols: &[&str], last_day: u32) -> Self {
        let series = symbols
            .iter()
            .enumerate()
            .map(|(i, symbol)| {
                let base = 100.0 * (i + 1) as f64;
                let records = (1..=last_day)
                    .map(|day| QuoteRecord::new(*symbol, d(day), base + day as f64))
                    .collect();
                (symbol.to_string(), records)
            })
            .collect();
        Self { series }
    }
}

impl QuoteSource for FixtureSource {
    fn name(&self) -> &str {
        "fixture"
    }

    fn fetch(&self, symbol: &str, span: FetchSpan) -> Result<FetchResult, DataError> {
        let records = self
            .series
            .get(symbol)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        let skip = records.len().saturating_sub(span.trading_days());
        Ok(FetchResult {
            symbol: symbol.to_string(),
            name: None,
            records: records[skip..].to_vec(),
            source: DataSource::Fixture,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[derive(Default)]
struct RecordingProgress {
    started: Mutex<Vec<String>>,
    completed: Mutex<usize>,
    batch_total: Mutex<Option<usize>>,
}

impl UpdateProgress for RecordingProgress {
    fn on_start(&self, symbol: &str, _index: usize, _total: usize) {
        self.started.lock().unwrap().push(symbol.to_string());
    }

    fn on_complete(
        &self,
        _symbol: &str,
        _index: usize,
        _total: usize,
        _result: &Result<SymbolReport, UpdateError>,
    ) {
        *self.completed.lock().unwrap() += 1;
    }

    fn on_batch_complete(&self, summary: &BatchSummary) {
        *self.batch_total.lock().unwrap() = Some(summary.total);
    }
}

fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn batch_updates_every_symbol_in_parallel() {
    let dir = TempDir::new().unwrap();
    let store = JsonStore::new(dir.path());
    let source = FixtureSource::new(&["AAPL", "MSFT", "NVDA"], 20);
    let pipeline = Pipeline::new(&source, &store);
    let progress = RecordingProgress::default();

    let summary = update_batch(
        &pipeline,
        &symbols(&["AAPL", "MSFT", "NVDA", "AAPL"]),
        d(20),
        2,
        &progress,
    );

    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 3);
    assert!(summary.all_succeeded());
    assert_eq!(progress.started.lock().unwrap().len(), 3);
    assert_eq!(*progress.completed.lock().unwrap(), 3);
    assert_eq!(*progress.batch_total.lock().unwrap(), Some(3));

    let order: Vec<&str> = summary.results.iter().map(|(s, _)| s.as_str()).collect();
    assert_eq!(order, vec!["AAPL", "MSFT", "NVDA"]);

    for report in summary.reports() {
        assert_eq!(report.plan, Some(FetchPlan::ColdStart { span: 20 }));
        assert_eq!(report.outcome, UpdateOutcome::Saved);
        assert_eq!(store.load(&report.symbol).unwrap().len(), 20);
    }

    // MSFT's ramp starts at 201: ma20 on the latest day is mean(201..=220)
    let msft = store.load("MSFT").unwrap();
    assert_eq!(msft.latest().unwrap().ma20, Some(210.5));
}

#[test]
fn one_failing_symbol_does_not_block_the_rest() {
    let dir = TempDir::new().unwrap();
    let store = JsonStore::new(dir.path());
    let source = FixtureSource::new(&["AAPL", "NVDA"], 20);
    let pipeline = Pipeline::new(&source, &store);

    let summary = update_batch(
        &pipeline,
        &symbols(&["AAPL", "ZZZZ", "NVDA"]),
        d(20),
        0,
        &RecordingProgress::default(),
    );

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert!(!summary.all_failed());
    let failures = summary.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "ZZZZ");
    assert!(store.load("ZZZZ").is_none());
}

#[test]
fn all_failures_are_flagged() {
    let dir = TempDir::new().unwrap();
    let store = JsonStore::new(dir.path());
    let source = FixtureSource::new(&[], 20);
    let pipeline = Pipeline::new(&source, &store);

    let summary = update_batch(
        &pipeline,
        &symbols(&["AAPL", "NVDA"]),
        d(20),
        1,
        &RecordingProgress::default(),
    );
    assert!(summary.all_failed());
}

#[test]
fn second_day_gap_fill_then_no_op() {
    let dir = TempDir::new().unwrap();
    let store = JsonStore::new(dir.path());

    let day_one = FixtureSource::new(&["AAPL"], 20);
    Pipeline::new(&day_one, &store).update_symbol("AAPL", d(20)).unwrap();

    let day_two = FixtureSource::new(&["AAPL"], 22);
    let pipeline = Pipeline::new(&day_two, &store);
    let report = pipeline.update_symbol("AAPL", d(22)).unwrap();
    assert_eq!(report.plan, Some(FetchPlan::GapFill { span: 10 }));
    assert_eq!(report.inserted, vec![d(21), d(22)]);
    assert_eq!(report.outcome, UpdateOutcome::Saved);

    let window = store.load("AAPL").unwrap();
    assert_eq!(window.len(), 20);
    assert_eq!(window.oldest_date(), Some(d(3)));

    // The oldest kept records were averaged over dates that have since been
    // evicted; the next merge recomputes them over the window alone, and
    // from then on an identical run changes nothing.
    let again = pipeline.update_symbol("AAPL", d(22)).unwrap();
    assert_eq!(again.plan, Some(FetchPlan::LatestOnly));
    assert_eq!(again.outcome, UpdateOutcome::Saved);
    assert_eq!(store.load("AAPL").unwrap().get(d(6)).unwrap().ma5, None);

    let settled = pipeline.update_symbol("AAPL", d(22)).unwrap();
    assert_eq!(settled.outcome, UpdateOutcome::Unchanged);
}

#[test]
fn configured_store_and_watchlist_drive_a_batch() {
    let dir = TempDir::new().unwrap();
    let config = WatchConfig::from_toml(&format!(
        "data_root = {:?}\ncsv_mirror = true\nparallelism = 2\n",
        dir.path().display().to_string()
    ))
    .unwrap();

    let doc = "## Watchlist\n\n| Name | Ticker |\n|---|---|\n| Apple | AAPL |\n| Nvidia | NVDA |\n";
    let tickers = extract_symbols(doc, Market::Us).unwrap();

    let store = config.store(Market::Us);
    let source = FixtureSource::new(&["AAPL", "NVDA"], 20);
    let pipeline = Pipeline::new(&source, &store)
        .with_merger(config.merger())
        .with_policy(config.engine.gap);

    let summary = update_batch(
        &pipeline,
        &tickers,
        d(20),
        config.parallelism,
        &RecordingProgress::default(),
    );
    assert!(summary.all_succeeded());
    assert!(dir.path().join("us").join("stock_AAPL.json").exists());
    assert!(dir.path().join("us").join("stock_NVDA.csv").exists());
}
