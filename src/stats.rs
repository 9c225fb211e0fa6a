//! Summary statistics over latency and length samples.
use serde::{Deserialize, Serialize};

/// count/mean/min/max/p50/p95 for a non-empty sample set.
///
/// Percentiles use nearest-rank on the ascending sort: p50 is the sample at
/// `n / 2` and p95 the sample at `min(floor(n * 0.95), n - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p95: f64,
}

impl Summary {
    /// Returns `None` for an empty sample set; absence is not zero.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let p95_idx = ((n as f64 * 0.95).floor() as usize).min(n - 1);
        Some(Self {
            count: n,
            mean: sorted.iter().sum::<f64>() / n as f64,
            min: sorted[0],
            max: sorted[n - 1],
            p50: sorted[n / 2],
            p95: sorted[p95_idx],
        })
    }

    /// Round every statistic to `places` decimal places for reporting.
    pub fn rounded(self, places: i32) -> Self {
        Self {
            count: self.count,
            mean: round_to(self.mean, places),
            min: round_to(self.min, places),
            max: round_to(self.max, places),
            p50: round_to(self.p50, places),
            p95: round_to(self.p95, places),
        }
    }
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_samples_have_no_summary() {
        assert_eq!(Summary::from_samples(&[]), None);
    }

    #[test]
    fn percentiles_use_nearest_rank_indexes() {
        let samples: Vec<f64> = (1..=10).rev().map(f64::from).collect();
        let summary = Summary::from_samples(&samples).expect("summary");
        assert_eq!(summary.count, 10);
        assert_eq!(summary.p50, 6.0);
        assert_eq!(summary.p95, 10.0);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 10.0);
        assert_eq!(summary.mean, 5.5);

        let twenty: Vec<f64> = (0..20).map(f64::from).collect();
        assert_eq!(Summary::from_samples(&twenty).expect("summary").p95, 19.0);
        let forty: Vec<f64> = (0..40).map(f64::from).collect();
        assert_eq!(Summary::from_samples(&forty).expect("summary").p95, 38.0);
    }

    #[test]
    fn single_sample_is_every_statistic() {
        let summary = Summary::from_samples(&[42.5]).expect("summary");
        assert_eq!(summary.p50, 42.5);
        assert_eq!(summary.p95, 42.5);
        assert_eq!(summary.mean, 42.5);
    }

    #[test]
    fn rounding_is_applied_per_field() {
        let summary = Summary::from_samples(&[1.006, 2.004])
            .expect("summary")
            .rounded(2);
        assert_eq!(summary.min, 1.01);
        assert_eq!(summary.max, 2.0);
    }
}
