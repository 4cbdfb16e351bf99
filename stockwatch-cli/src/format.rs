//! Console presentation of prices, moving averages and update reports.

use stockwatch_core::domain::{Market, QuoteRecord, RollingWindow};
use stockwatch_runner::{SymbolReport, UpdateOutcome};

/// KRW as a rounded integer with thousands separators (`1,234원`), USD with
/// two decimals (`$12.34`), missing values as `N/A`.
pub fn format_price(market: Market, value: Option<f64>) -> String {
    match value {
        None => "N/A".to_string(),
        Some(v) => match market {
            Market::Kr => format!("{}원", group_thousands(v.round() as i64)),
            Market::Us => format!("${v:.2}"),
        },
    }
}

pub fn format_volume(volume: Option<u64>) -> String {
    volume.map_or_else(|| "N/A".to_string(), |v| group_thousands(v as i64))
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// One line per record: date, close, volume and the three averages.
pub fn record_line(market: Market, r: &QuoteRecord) -> String {
    format!(
        "{}  close {:>12}  vol {:>14}  MA5 {:>12}  MA10 {:>12}  MA20 {:>12}",
        r.date,
        format_price(market, r.close),
        format_volume(r.volume),
        format_price(market, r.ma5),
        format_price(market, r.ma10),
        format_price(market, r.ma20),
    )
}

pub fn window_header(window: &RollingWindow) -> String {
    match window.display_name() {
        Some(name) => format!("{} ({}), {} records", name, window.symbol(), window.len()),
        None => format!("{}, {} records", window.symbol(), window.len()),
    }
}

fn outcome_label(outcome: &UpdateOutcome) -> String {
    match outcome {
        UpdateOutcome::Saved => "saved".to_string(),
        UpdateOutcome::Unchanged => "up to date".to_string(),
        UpdateOutcome::FetchFailed(reason) => format!("fetch failed: {reason}"),
        UpdateOutcome::SaveFailed(reason) => format!("save failed: {reason}"),
    }
}

/// Summary block for one updated symbol.
pub fn report_lines(market: Market, report: &SymbolReport) -> Vec<String> {
    let title = match &report.name {
        Some(name) => format!("{name} ({})", report.symbol),
        None => report.symbol.clone(),
    };
    let how = match &report.plan {
        Some(plan) => plan.to_string(),
        None => format!("history ({})", report.span),
    };

    let mut lines = vec![format!(
        "{title}: {how}, {} new, {} replaced, {} records [{}]",
        report.inserted.len(),
        report.replaced.len(),
        report.window_len,
        outcome_label(&report.outcome)
    )];
    if report.dropped_without_close > 0 {
        lines.push(format!(
            "  skipped {} record(s) without a close",
            report.dropped_without_close
        ));
    }
    if let Some(latest) = &report.latest {
        lines.push(format!("  {}", record_line(market, latest)));
    }
    lines
}
