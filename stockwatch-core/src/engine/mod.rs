//! Merge-and-derive engine.
//!
//! Three pure pieces, used in this order on every update:
//! - `gap` classifies persisted state into a fetch plan
//! - `merge` folds fetched quotes into the window by date and truncates
//! - `moving_average` recomputes ma5/ma10/ma20 (called by the merger before
//!   truncation)

pub mod gap;
pub mod merge;
pub mod moving_average;

pub use gap::{plan_fetch, FetchPlan, GapPolicy};
pub use merge::{merge, MergeError, MergeReport, WindowMerger};
pub use moving_average::{derive, round_cents, MovingAverage, MA_PERIODS};
