use serde::{Deserialize, Serialize};

/// One-sided CUSUM over traffic volume
///
/// Accumulates positive deviations from a reference level and clamps at zero:
///
///   S[0] = 0
///   S[t] = max(0, S[t-1] + (x[t] - baseline))
///
/// Transient noise around the baseline cancels out while a sustained upward
/// shift keeps growing the statistic. The batch and streaming paths share
/// `statistic_step`, so they agree bit-for-bit for the same baseline.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CusumEngine {
    baseline: f64,
    statistic: f64,
    samples_seen: usize,
}

impl CusumEngine {
    pub fn new(baseline: f64) -> Self {
        Self {
            baseline,
            statistic: 0.0,
            samples_seen: 0,
        }
    }

    /// Feed the next sample and return the updated statistic.
    ///
    /// The first sample only anchors the series (S[0] = 0).
    pub fn update(&mut self, sample: f64) -> f64 {
        if self.samples_seen > 0 {
            self.statistic = statistic_step(self.statistic, sample, self.baseline);
        }
        self.samples_seen += 1;
        self.statistic
    }

    /// Same as `update` but with a baseline supplied per step (provisional mode).
    pub fn update_with_baseline(&mut self, sample: f64, baseline: f64) -> f64 {
        self.baseline = baseline;
        self.update(sample)
    }

    pub fn value(&self) -> f64 {
        self.statistic
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn reset(&mut self) {
        self.statistic = 0.0;
        self.samples_seen = 0;
    }
}

/// Mean of the warm-up prefix `samples[..warmup_len]`.
///
/// Shorter inputs use every sample available; an empty input has no baseline.
pub fn baseline(samples: &[f64], warmup_len: usize) -> Option<f64> {
    let prefix = &samples[..warmup_len.min(samples.len())];
    if prefix.is_empty() {
        return None;
    }
    Some(prefix.iter().sum::<f64>() / prefix.len() as f64)
}

pub fn statistic_step(prev_statistic: f64, sample: f64, baseline: f64) -> f64 {
    (prev_statistic + (sample - baseline)).max(0.0)
}

/// Whole-series CUSUM, aligned with `samples`.
pub fn statistic_batch(samples: &[f64], baseline: f64) -> Vec<f64> {
    let mut engine = CusumEngine::new(baseline);
    samples.iter().map(|&x| engine.update(x)).collect()
}

/// How the session obtains its CUSUM reference level.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BaselineMode {
    /// Mean of the full warm-up window, computed once before the first step
    #[default]
    Frozen,
    /// Mean of the samples seen so far, frozen once the warm-up window is full
    Provisional,
}

/// Streaming warm-up mean.
///
/// Grows with each observed sample until `warmup_len` samples are in, then
/// stops moving. Later samples (including an injected attack) are ignored.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BaselineTracker {
    warmup_len: usize,
    sum: f64,
    count: usize,
}

impl BaselineTracker {
    pub fn new(warmup_len: usize) -> Self {
        Self {
            warmup_len,
            sum: 0.0,
            count: 0,
        }
    }

    pub fn observe(&mut self, sample: f64) {
        if self.count < self.warmup_len {
            self.sum += sample;
            self.count += 1;
        }
    }

    /// Current estimate, `None` before the first sample.
    pub fn current(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.count >= self.warmup_len
    }

    pub fn reset(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }
}
