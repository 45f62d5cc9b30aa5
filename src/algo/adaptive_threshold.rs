use serde::{Deserialize, Serialize};

/// Fixed and sliding-window thresholds for the CUSUM statistic
///
/// The adaptive threshold at `index` is `mean + k * stddev` over the trailing
/// window `statistic[index - window_len .. index]` (the current value is
/// excluded). Before a full window exists it is undefined (`None`) and the
/// detector skips the adaptive comparison. A constant window collapses the
/// threshold to its mean, which is still a valid threshold.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ThresholdEstimator {
    fixed: f64,
    window_len: usize,
    k: f64,
}

impl ThresholdEstimator {
    pub fn new(fixed: f64, window_len: usize, k: f64) -> Self {
        Self { fixed, window_len, k }
    }

    pub fn fixed(&self) -> f64 {
        self.fixed
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    pub fn adaptive(&self, statistic: &[f64], index: usize) -> Option<f64> {
        adaptive_threshold(statistic, index, self.window_len, self.k)
    }

    pub fn adaptive_series(&self, statistic: &[f64]) -> Vec<Option<f64>> {
        (0..statistic.len())
            .map(|i| self.adaptive(statistic, i))
            .collect()
    }
}

pub fn adaptive_threshold(
    statistic: &[f64],
    index: usize,
    window_len: usize,
    k: f64,
) -> Option<f64> {
    if window_len == 0 || index < window_len || index > statistic.len() {
        return None;
    }

    let (mean, std_dev) = mean_std(&statistic[index - window_len..index]);
    Some(mean + k * std_dev)
}

/// Whole-series threshold `k * stddev(statistic)`, as used by offline
/// inspection of a finished run.
pub fn global_threshold(statistic: &[f64], k: f64) -> Option<f64> {
    if statistic.is_empty() {
        return None;
    }
    let (_, std_dev) = mean_std(statistic);
    Some(k * std_dev)
}

/// Population mean and standard deviation.
fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
