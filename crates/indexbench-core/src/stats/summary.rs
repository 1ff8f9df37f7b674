//! Mean and standard deviation across runs.

use serde::{Deserialize, Serialize};

/// Arithmetic mean of `samples`.
///
/// # Returns
///
/// * `Some(mean)` - The mean value
/// * `None` - If samples is empty
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let sum: f64 = samples.iter().sum();
    Some(sum / samples.len() as f64)
}

/// Population standard deviation of `samples` around `mean`.
///
/// The variance divides by N, not N-1: every run of a configuration is
/// treated as the whole population. Returns 0.0 for an empty slice.
pub fn population_std_dev(samples: &[f64], mean: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let squared_diffs: f64 = samples.iter().map(|&x| (x - mean).powi(2)).sum();
    (squared_diffs / samples.len() as f64).sqrt()
}

/// Reduced measurement for one configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub std_dev: f64,
    pub count: usize,
}

impl Summary {
    /// Compute summary statistics from samples.
    ///
    /// Returns `None` if samples is empty.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let mean = mean(samples)?;
        Some(Summary {
            mean,
            std_dev: population_std_dev(samples, mean),
            count: samples.len(),
        })
    }

    /// `"mean,stddev"` as stored in a results table cell
    pub fn packed(&self) -> String {
        format!("{:.6},{:.6}", self.mean, self.std_dev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_population_std_dev() {
        let samples = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let avg = mean(&samples).unwrap();
        assert_eq!(avg, 5.0);
        assert_eq!(population_std_dev(&samples, avg), 2.0);
    }

    #[test]
    fn test_two_runs() {
        let summary = Summary::from_samples(&[10.0, 20.0]).unwrap();
        assert_eq!(summary.mean, 15.0);
        assert_eq!(summary.std_dev, 5.0);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.packed(), "15.000000,5.000000");
    }

    #[test]
    fn test_single_sample() {
        let summary = Summary::from_samples(&[42.5]).unwrap();
        assert_eq!(summary.mean, 42.5);
        assert_eq!(summary.std_dev, 0.0);
    }

    #[test]
    fn test_empty_samples() {
        assert_eq!(mean(&[]), None);
        assert!(Summary::from_samples(&[]).is_none());
        assert_eq!(population_std_dev(&[], 0.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_constant_samples_have_zero_spread(value in -1e6f64..1e6, n in 1usize..50) {
            let samples = vec![value; n];
            let summary = Summary::from_samples(&samples).unwrap();
            prop_assert!((summary.mean - value).abs() <= value.abs() * 1e-12 + 1e-9);
            prop_assert!(summary.std_dev <= value.abs() * 1e-6 + 1e-9);
        }

        #[test]
        fn prop_mean_within_bounds(samples in prop::collection::vec(-1e6f64..1e6, 1..100)) {
            let summary = Summary::from_samples(&samples).unwrap();
            let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(summary.mean >= min - 1e-6 && summary.mean <= max + 1e-6);
            prop_assert!(summary.std_dev >= 0.0);
            prop_assert!(summary.std_dev <= (max - min) + 1e-6);
        }
    }
}
