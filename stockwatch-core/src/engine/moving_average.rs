//! Simple moving averages over a date-ascending run of quotes.
//!
//! For the record at ascending index `i` the look-back set is every valid
//! close at or before it. MA-N is the mean of the last N closes in that set,
//! rounded to cents, and is absent until N closes exist.

use crate::domain::QuoteRecord;

/// Periods derived for every record, in field order (ma5, ma10, ma20).
pub const MA_PERIODS: [usize; 3] = [5, 10, 20];

/// Fixed-period simple moving average of closes.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    period: usize,
    name: String,
}

impl MovingAverage {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "moving average period must be >= 1");
        Self {
            period,
            name: format!("ma{period}"),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// One output per input slot.
    ///
    /// A slot without a close gets `None` and contributes nothing to later
    /// look-back sets.
    pub fn compute(&self, closes: &[Option<f64>]) -> Vec<Option<f64>> {
        let mut seen: Vec<f64> = Vec::with_capacity(closes.len());
        closes
            .iter()
            .map(|slot| {
                let close = (*slot)?;
                seen.push(close);
                if seen.len() < self.period {
                    return None;
                }
                let tail = &seen[seen.len() - self.period..];
                Some(round_cents(tail.iter().sum::<f64>() / self.period as f64))
            })
            .collect()
    }
}

/// Round to two decimal places.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Recompute ma5/ma10/ma20 for every record of a date-ascending sequence.
///
/// Pure: previously stored averages are ignored, so running it twice yields
/// the same fields. Record count and order are preserved.
pub fn derive(mut ascending: Vec<QuoteRecord>) -> Vec<QuoteRecord> {
    if ascending.is_empty() {
        return ascending;
    }

    let closes: Vec<Option<f64>> = ascending.iter().map(QuoteRecord::valid_close).collect();
    let [ma5, ma10, ma20] = MA_PERIODS.map(|p| MovingAverage::new(p).compute(&closes));

    for (i, record) in ascending.iter_mut().enumerate() {
        record.ma5 = ma5[i];
        record.ma10 = ma10[i];
        record.ma20 = ma20[i];
    }
    ascending
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn records(closes: &[f64]) -> Vec<QuoteRecord> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| QuoteRecord::new("TEST", base + chrono::Duration::days(i as i64), c))
            .collect()
    }

    #[test]
    fn ma5_boundary() {
        let out = derive(records(&[10.0, 20.0, 30.0, 40.0, 50.0]));
        assert_eq!(out[4].ma5, Some(30.0));
        assert_eq!(out[3].ma5, None);
        assert!(out.iter().all(|r| r.ma10.is_none() && r.ma20.is_none()));
    }

    #[test]
    fn ma_uses_most_recent_closes_only() {
        let closes: Vec<f64> = (1..=12).map(f64::from).collect();
        let out = derive(records(&closes));
        // last five of 1..=12 are 8..=12
        assert_eq!(out[11].ma5, Some(10.0));
        assert_eq!(out[11].ma10, Some(7.5));
        assert_eq!(out[9].ma10, Some(5.5));
        assert_eq!(out[8].ma10, None);
    }

    #[test]
    fn rounds_to_cents() {
        let out = derive(records(&[1.0, 1.0, 1.0, 1.0, 1.01]));
        assert_eq!(out[4].ma5, Some(1.0));
        let out = derive(records(&[1.0, 1.0, 1.0, 1.0, 1.04]));
        assert_eq!(out[4].ma5, Some(1.01));
    }

    #[test]
    fn ignores_stale_stored_averages() {
        let mut input = records(&[1.0, 2.0, 3.0]);
        input[2].ma5 = Some(999.0);
        let out = derive(input);
        assert_eq!(out[2].ma5, None);
    }

    #[test]
    fn idempotent() {
        let once = derive(records(&[5.0, 7.0, 9.0, 11.0, 13.0, 15.0, 17.0]));
        let twice = derive(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_close_is_skipped_but_retained() {
        let mut input = records(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
        input[2].close = None;
        let out = derive(input);
        assert_eq!(out.len(), 6);
        assert_eq!(out[2].ma5, None);
        // five valid closes only by index 5: 10,20,40,50,60
        assert_eq!(out[4].ma5, None);
        assert_eq!(out[5].ma5, Some(36.0));
    }

    #[test]
    fn empty_input() {
        assert!(derive(Vec::new()).is_empty());
    }

    #[test]
    fn twenty_day_ramp() {
        let closes: Vec<f64> = (100..120).map(f64::from).collect();
        let out = derive(records(&closes));
        assert_eq!(out[4].ma5, Some(102.0));
        assert_eq!(out[19].ma20, Some(109.5));
        assert_eq!(out[18].ma20, None);
    }

    #[test]
    fn names() {
        assert_eq!(MovingAverage::new(20).name(), "ma20");
        assert_eq!(MovingAverage::new(5).period(), 5);
    }
}
