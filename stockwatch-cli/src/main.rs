//! stockwatch CLI: keep rolling 20-day quote windows with moving averages.
//!
//! Commands:
//! - `update` — bring listed symbols (or the market's watch-list) up to date
//! - `history` — fetch an explicit span of history, or a single date
//! - `show` — print a stored window
//! - `plan` — print what the next update would fetch
//! - `watchlist` — print the symbols extracted from a portfolio document

mod format;
mod obs;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stockwatch_core::domain::Market;
use stockwatch_core::store::WindowStore;
use stockwatch_runner::{
    load_watchlist, source_for, update_batch, LogProgress, Pipeline, WatchConfig,
};

#[derive(Parser)]
#[command(
    name = "stockwatch",
    version,
    about = "Rolling daily quote windows with 5/10/20-day moving averages"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data root directory (overrides the config's data_root).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Treat this date (YYYY-MM-DD) as today. Defaults to the local date.
    /// US fetches also end at this date; the Korean feed always returns the
    /// most recent sessions.
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    /// Log filter, e.g. info or stockwatch_runner=debug. STOCKWATCH_LOG wins if set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format: text or json.
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Update symbols; with none given, update the market's watch-list.
    Update {
        /// Symbols to update (e.g. 005930 000660, or AAPL NVDA).
        symbols: Vec<String>,

        /// Market the symbols belong to: kr or us.
        #[arg(long, default_value = "kr")]
        market: Market,

        /// Print the per-symbol reports as JSON on stdout.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Fetch the most recent N trading days (or one date within them) and merge.
    History {
        symbol: String,

        #[arg(long, default_value = "kr")]
        market: Market,

        /// Trading days to request.
        #[arg(long, default_value_t = 30)]
        days: usize,

        /// Keep only this date (YYYY-MM-DD) from the fetched span.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print a stored window, most recent first.
    Show {
        symbol: String,

        #[arg(long, default_value = "kr")]
        market: Market,

        /// Print only this date (YYYY-MM-DD).
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Print at most this many records.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print the fetch plan the next update would follow, without fetching.
    Plan {
        symbol: String,

        #[arg(long, default_value = "kr")]
        market: Market,
    },
    /// Print the watch-list's symbols, comma-separated.
    Watchlist {
        /// Portfolio Markdown document. Defaults to the configured path.
        path: Option<PathBuf>,

        #[arg(long, default_value = "kr")]
        market: Market,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    obs::init_tracing(&cli.log_level, &cli.log_format)?;

    let mut config = match &cli.config {
        Some(path) => WatchConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => WatchConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_root = dir;
    }
    let as_of = cli.today;
    let today = as_of.unwrap_or_else(|| chrono::Local::now().date_naive());
    tracing::debug!(data_root = %config.data_root.display(), %today, "config loaded");

    match cli.command {
        Commands::Update {
            symbols,
            market,
            json,
        } => run_update(&config, market, symbols, today, as_of, json),
        Commands::History {
            symbol,
            market,
            days,
            date,
        } => run_history(&config, market, &symbol, days, date, as_of),
        Commands::Show {
            symbol,
            market,
            date,
            limit,
        } => run_show(&config, market, &symbol, date, limit),
        Commands::Plan { symbol, market } => run_plan(&config, market, &symbol, today),
        Commands::Watchlist { path, market } => run_watchlist(&config, market, path),
    }
}

fn normalize(market: Market, raw: &str) -> Result<String> {
    market
        .normalize_symbol(raw)
        .with_context(|| format!("invalid {market} symbol"))
}

fn run_update(
    config: &WatchConfig,
    market: Market,
    symbols: Vec<String>,
    today: NaiveDate,
    as_of: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let symbols = if symbols.is_empty() {
        let path = config.watchlist_path(market);
        let listed = load_watchlist(path, market)
            .with_context(|| format!("reading watch-list {}", path.display()))?;
        if listed.is_empty() {
            bail!("watch-list {} lists no {market} symbols", path.display());
        }
        listed
    } else {
        symbols
            .iter()
            .map(|raw| normalize(market, raw))
            .collect::<Result<Vec<_>>>()?
    };

    let source = source_for(config, market, as_of).context("building quote source")?;
    let store = config.store(market);
    let pipeline = Pipeline::new(source.as_ref(), &store)
        .with_merger(config.merger())
        .with_policy(config.engine.gap);
    tracing::info!(
        %market,
        source = pipeline.source_name(),
        symbols = symbols.len(),
        "starting update"
    );

    let summary = update_batch(&pipeline, &symbols, today, config.parallelism, &LogProgress);

    if json {
        let reports: Vec<_> = summary.reports().collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in summary.reports() {
            for line in format::report_lines(market, report) {
                println!("{line}");
            }
        }
    }

    for (symbol, reason) in summary.failures() {
        eprintln!("Error for {symbol}: {reason}");
    }
    if summary.all_failed() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_history(
    config: &WatchConfig,
    market: Market,
    symbol: &str,
    days: usize,
    date: Option<NaiveDate>,
    as_of: Option<NaiveDate>,
) -> Result<()> {
    let symbol = normalize(market, symbol)?;
    let source = source_for(config, market, as_of).context("building quote source")?;
    let store = config.store(market);
    let pipeline = Pipeline::new(source.as_ref(), &store).with_merger(config.merger());

    let report = pipeline.fetch_history(&symbol, days, date)?;
    for line in format::report_lines(market, &report) {
        println!("{line}");
    }
    if report.outcome.is_failure() {
        bail!("history fetch for {symbol} failed");
    }
    Ok(())
}

fn run_show(
    config: &WatchConfig,
    market: Market,
    symbol: &str,
    date: Option<NaiveDate>,
    limit: usize,
) -> Result<()> {
    let symbol = normalize(market, symbol)?;
    let store = config.store(market);
    let Some(window) = store.load(&symbol) else {
        bail!(
            "no stored window for {symbol} under {}",
            store.root().display()
        );
    };

    println!("{}", format::window_header(&window));
    match date {
        Some(date) => match window.get(date) {
            Some(record) => println!("{}", format::record_line(market, record)),
            None => bail!("{symbol} has no record for {date}"),
        },
        None => {
            for record in window.records().iter().take(limit) {
                println!("{}", format::record_line(market, record));
            }
            if window.len() > limit {
                println!("... ({} records in total)", window.len());
            }
        }
    }
    Ok(())
}

fn run_plan(config: &WatchConfig, market: Market, symbol: &str, today: NaiveDate) -> Result<()> {
    let symbol = normalize(market, symbol)?;
    let source = source_for(config, market, None).context("building quote source")?;
    let store = config.store(market);
    let plan = Pipeline::new(source.as_ref(), &store)
        .with_policy(config.engine.gap)
        .plan(&symbol, today);
    let window = store.load(&symbol);

    let state = match &window {
        Some(w) => format!(
            "{} records, latest {}",
            w.len(),
            w.latest_date().map_or_else(|| "-".to_string(), |d| d.to_string())
        ),
        None => "no stored window".to_string(),
    };
    println!("{symbol}: {plan} ({state}; today {today})");
    Ok(())
}

fn run_watchlist(config: &WatchConfig, market: Market, path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| config.watchlist_path(market).to_path_buf());
    let symbols = load_watchlist(&path, market)
        .with_context(|| format!("reading watch-list {}", path.display()))?;
    if symbols.is_empty() {
        bail!("watch-list {} lists no {market} symbols", path.display());
    }
    println!("{}", symbols.join(","));
    Ok(())
}
