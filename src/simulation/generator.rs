//! Synthetic traffic volume generator
//!
//! Produces one sample series per run: Gaussian "normal traffic" plus an
//! optional attack segment. All randomness flows from a single seeded
//! `StdRng`, so a seed fully determines the trace. The attack start is drawn
//! first and the background samples after it, which keeps the background
//! identical for a given seed whether or not the attack is injected.

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the attack segment is applied to the background traffic.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Injection {
    /// Multiply by factors spaced linearly from 1 to `attack_factor`
    #[default]
    Ramp,
    /// Add `baseline_mean * attack_factor` to every sample in the segment
    Additive,
    /// No attack
    Disabled,
}

/// Half-open sample range `[start, end)` affected by the attack.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttackWindow {
    pub start: usize,
    pub end: usize,
}

impl AttackWindow {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }
}

/// A concrete attack: where it starts, how long it lasts and how hard it hits.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct AttackPlan {
    pub start: usize,
    pub duration: usize,
    pub factor: f64,
    pub injection: Injection,
}

impl AttackPlan {
    /// Effective window for a series of `len` samples, clamped to its end.
    pub fn window(&self, len: usize) -> Option<AttackWindow> {
        if self.injection == Injection::Disabled {
            return None;
        }
        let window = AttackWindow {
            start: self.start.min(len),
            end: self.start.saturating_add(self.duration).min(len),
        };
        (!window.is_empty()).then_some(window)
    }

    /// Apply the attack in place and clamp the buffer to non-negative values.
    ///
    /// `mean` is the normal traffic level, used by additive injection.
    pub fn inject(&self, samples: &mut [f64], mean: f64) -> Option<AttackWindow> {
        let window = self.window(samples.len());

        if let Some(w) = window {
            let n = w.len();
            let segment = &mut samples[w.start..w.end];
            match self.injection {
                Injection::Ramp => {
                    for (j, x) in segment.iter_mut().enumerate() {
                        let factor = if n > 1 {
                            1.0 + (self.factor - 1.0) * j as f64 / (n - 1) as f64
                        } else {
                            1.0
                        };
                        *x *= factor;
                    }
                }
                Injection::Additive => {
                    let offset = mean * self.factor;
                    for x in segment.iter_mut() {
                        *x += offset;
                    }
                }
                Injection::Disabled => {}
            }
        }

        for x in samples.iter_mut() {
            *x = x.max(0.0);
        }
        window
    }
}

/// A generated (or replayed) sample series with its ground truth.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrafficTrace {
    pub samples: Vec<f64>,
    pub sample_rate: u32,
    /// Seed that produced the samples; `None` for replayed data
    pub seed: Option<u64>,
    pub attack: Option<AttackWindow>,
}

impl TrafficTrace {
    /// Wrap recorded samples. Values are clamped to be non-negative.
    pub fn from_samples(samples: Vec<f64>, sample_rate: u32, attack: Option<AttackWindow>) -> Self {
        let len = samples.len();
        let samples = samples.into_iter().map(|x| x.max(0.0)).collect();
        let attack = attack
            .map(|w| AttackWindow {
                start: w.start.min(len),
                end: w.end.min(len),
            })
            .filter(|w| !w.is_empty());

        Self {
            samples,
            sample_rate,
            seed: None,
            attack,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn time_at(&self, index: usize) -> f64 {
        index as f64 / self.sample_rate as f64
    }

    pub fn time_axis(&self) -> Vec<f64> {
        (0..self.samples.len()).map(|i| self.time_at(i)).collect()
    }

    pub fn attack_start_time(&self) -> Option<f64> {
        self.attack.map(|w| self.time_at(w.start))
    }

    pub fn attack_end_time(&self) -> Option<f64> {
        self.attack.map(|w| self.time_at(w.end))
    }
}

pub struct TrafficGenerator {
    config: SessionConfig,
}

impl TrafficGenerator {
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn generate(&self) -> Result<TrafficTrace> {
        let config = &self.config;
        let seed = config.random_seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);

        let (earliest, latest) = config.attack_start_bounds();
        let start = rng.random_range(earliest..=latest);

        let n = config.total_samples();
        let mut samples: Vec<f64> = if config.baseline_stddev == 0.0 {
            vec![config.baseline_mean; n]
        } else {
            let dist = Normal::new(config.baseline_mean, config.baseline_stddev)
                .map_err(|e| Error::Distribution(e.to_string()))?;
            (0..n).map(|_| dist.sample(&mut rng)).collect()
        };

        let plan = AttackPlan {
            start,
            duration: config.attack_duration_len(),
            factor: config.attack_factor,
            injection: config.injection,
        };
        let attack = plan.inject(&mut samples, config.baseline_mean);

        debug!(
            seed,
            samples = n,
            injection = ?config.injection,
            attack_start = ?attack.map(|w| w.start),
            attack_end = ?attack.map(|w| w.end),
            "Generated traffic trace"
        );

        Ok(TrafficTrace {
            samples,
            sample_rate: config.sample_rate,
            seed: Some(seed),
            attack,
        })
    }
}

/// Generate a trace for `config` in one call.
pub fn generate(config: &SessionConfig) -> Result<TrafficTrace> {
    TrafficGenerator::new(config.clone())?.generate()
}
