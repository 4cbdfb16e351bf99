//! Gap detector — decides how much history the next fetch has to cover.

use crate::data::provider::FetchSpan;
use crate::domain::{RollingWindow, WINDOW_CAPACITY};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Spans used by `plan_fetch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapPolicy {
    /// A window smaller than this is re-seeded from scratch.
    pub full_window: usize,
    /// Trading days requested on a cold start.
    pub cold_start_span: usize,
    /// Trading days requested to patch a stale window.
    pub gap_fill_span: usize,
}

impl Default for GapPolicy {
    fn default() -> Self {
        Self {
            full_window: WINDOW_CAPACITY,
            cold_start_span: WINDOW_CAPACITY,
            gap_fill_span: 10,
        }
    }
}

/// What the next fetch for a symbol must cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchPlan {
    /// No usable window: fetch a full window's worth of history.
    ColdStart { span: usize },
    /// Window is populated but its latest date is not today.
    GapFill { span: usize },
    /// Window is current: only today's snapshot is needed.
    LatestOnly,
}

impl FetchPlan {
    pub fn span(&self) -> FetchSpan {
        match *self {
            FetchPlan::ColdStart { span } | FetchPlan::GapFill { span } => FetchSpan::Days(span),
            FetchPlan::LatestOnly => FetchSpan::Latest,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FetchPlan::ColdStart { .. } => "cold_start",
            FetchPlan::GapFill { .. } => "gap_fill",
            FetchPlan::LatestOnly => "latest_only",
        }
    }
}

impl fmt::Display for FetchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchPlan::ColdStart { span } => write!(f, "cold start ({span} days)"),
            FetchPlan::GapFill { span } => write!(f, "gap fill ({span} days)"),
            FetchPlan::LatestOnly => f.write_str("latest only"),
        }
    }
}

impl GapPolicy {
    /// Classify a symbol's persisted state. Pure; never fails.
    ///
    /// A latest date after `today` means the window and the clock disagree;
    /// that is treated as unusable state and re-seeded rather than trusted.
    pub fn plan_fetch(
        &self,
        symbol: &str,
        persisted: Option<&RollingWindow>,
        today: NaiveDate,
    ) -> FetchPlan {
        let cold = FetchPlan::ColdStart {
            span: self.cold_start_span,
        };

        let Some(window) = persisted else {
            tracing::debug!(symbol, "no persisted window");
            return cold;
        };
        if window.len() < self.full_window {
            tracing::debug!(symbol, records = window.len(), "persisted window too small");
            return cold;
        }
        let Some(latest) = window.latest_date() else {
            return cold;
        };

        if latest > today {
            tracing::warn!(symbol, %latest, %today, "persisted window is dated in the future, re-seeding");
            cold
        } else if latest == today {
            FetchPlan::LatestOnly
        } else {
            FetchPlan::GapFill {
                span: self.gap_fill_span,
            }
        }
    }
}

/// `plan_fetch` with the default 20/10 policy.
pub fn plan_fetch(symbol: &str, persisted: Option<&RollingWindow>, today: NaiveDate) -> FetchPlan {
    GapPolicy::default().plan_fetch(symbol, persisted, today)
}
