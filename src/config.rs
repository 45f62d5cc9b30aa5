//! Session configuration
//!
//! One immutable value object describes a whole run: the traffic model, the
//! injected attack, and both detection thresholds. Durations are expressed in
//! seconds and converted to sample counts by truncation.

use crate::algo::cusum::BaselineMode;
use crate::error::{Error, Result};
use crate::simulation::generator::Injection;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound on any duration expressed in samples.
pub const MAX_SAMPLES: usize = 1 << 26;

/// Inclusive range (in seconds) from which the attack start is drawn.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct StartRange {
    pub min_seconds: f64,
    pub max_seconds: f64,
}

impl StartRange {
    pub fn new(min_seconds: f64, max_seconds: f64) -> Self {
        Self {
            min_seconds,
            max_seconds,
        }
    }

    /// A degenerate range that always starts the attack at `seconds`.
    pub fn exactly(seconds: f64) -> Self {
        Self::new(seconds, seconds)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Total simulated duration (seconds)
    pub window_seconds: f64,
    /// Samples per second
    pub sample_rate: u32,

    /// Normal traffic level
    pub baseline_mean: f64,
    pub baseline_stddev: f64,
    /// Initial span used to establish the CUSUM baseline (seconds)
    pub warmup_seconds: f64,
    pub baseline_mode: BaselineMode,

    /// Attack intensity; meaning depends on `injection`
    pub attack_factor: f64,
    pub attack_duration_seconds: f64,
    pub attack_start_range: StartRange,
    pub injection: Injection,

    pub fixed_threshold: f64,
    /// Trailing window of the statistic used for the adaptive threshold (seconds)
    pub adaptive_window_seconds: f64,
    /// Sigma multiplier of the adaptive threshold (mean + k * stddev)
    pub adaptive_k: f64,
    pub adaptive_enabled: bool,

    /// Fixed seed for reproducible traffic; `None` draws a fresh one
    pub random_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60.0,
            sample_rate: 60,
            baseline_mean: 100.0,
            baseline_stddev: 15.0,
            warmup_seconds: 5.0,
            baseline_mode: BaselineMode::Frozen,
            attack_factor: 3.0,
            attack_duration_seconds: 0.5,
            attack_start_range: StartRange::new(10.0, 50.0),
            injection: Injection::Ramp,
            fixed_threshold: 2000.0,
            adaptive_window_seconds: 5.0,
            adaptive_k: 2.5,
            adaptive_enabled: true,
            random_seed: None,
        }
    }
}

impl SessionConfig {
    /// Parse a (possibly partial) JSON configuration; missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Pin the attack to start exactly at sample `index`.
    pub fn with_attack_start_index(mut self, index: usize) -> Self {
        let seconds = index as f64 / self.sample_rate.max(1) as f64;
        self.attack_start_range = StartRange::exactly(seconds);
        self
    }

    pub fn with_attack(mut self, injection: Injection, factor: f64) -> Self {
        self.injection = injection;
        self.attack_factor = factor;
        self
    }

    pub fn with_fixed_threshold(mut self, threshold: f64) -> Self {
        self.fixed_threshold = threshold;
        self
    }

    pub fn with_adaptive(mut self, enabled: bool, k: f64) -> Self {
        self.adaptive_enabled = enabled;
        self.adaptive_k = k;
        self
    }

    pub fn with_baseline_mode(mut self, mode: BaselineMode) -> Self {
        self.baseline_mode = mode;
        self
    }

    pub fn total_samples(&self) -> usize {
        self.seconds_to_samples(self.window_seconds)
    }

    pub fn warmup_len(&self) -> usize {
        self.seconds_to_samples(self.warmup_seconds)
    }

    pub fn adaptive_window_len(&self) -> usize {
        self.seconds_to_samples(self.adaptive_window_seconds)
    }

    pub fn attack_duration_len(&self) -> usize {
        self.seconds_to_samples(self.attack_duration_seconds)
    }

    /// Inclusive sample-index bounds of the attack start.
    pub fn attack_start_bounds(&self) -> (usize, usize) {
        (
            self.seconds_to_samples(self.attack_start_range.min_seconds),
            self.seconds_to_samples(self.attack_start_range.max_seconds),
        )
    }

    /// Convert seconds to a sample count, truncating toward zero.
    ///
    /// A tiny epsilon absorbs representation error so that
    /// `index / rate` seconds maps back to `index`.
    pub fn seconds_to_samples(&self, seconds: f64) -> usize {
        (seconds * self.sample_rate as f64 + 1e-9).max(0.0) as usize
    }

    pub fn index_to_time(&self, index: usize) -> f64 {
        index as f64 / self.sample_rate as f64
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::invalid("sample_rate", "must be positive"));
        }

        let finite = [
            ("window_seconds", self.window_seconds),
            ("baseline_mean", self.baseline_mean),
            ("baseline_stddev", self.baseline_stddev),
            ("warmup_seconds", self.warmup_seconds),
            ("attack_factor", self.attack_factor),
            ("attack_duration_seconds", self.attack_duration_seconds),
            ("attack_start_range.min_seconds", self.attack_start_range.min_seconds),
            ("attack_start_range.max_seconds", self.attack_start_range.max_seconds),
            ("fixed_threshold", self.fixed_threshold),
            ("adaptive_window_seconds", self.adaptive_window_seconds),
            ("adaptive_k", self.adaptive_k),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(Error::invalid(field, format!("must be finite, got {}", value)));
            }
        }

        let durations = [
            ("window_seconds", self.window_seconds),
            ("warmup_seconds", self.warmup_seconds),
            ("attack_duration_seconds", self.attack_duration_seconds),
            ("attack_start_range.min_seconds", self.attack_start_range.min_seconds),
            ("attack_start_range.max_seconds", self.attack_start_range.max_seconds),
            ("adaptive_window_seconds", self.adaptive_window_seconds),
        ];
        for (field, seconds) in durations {
            if seconds * self.sample_rate as f64 > MAX_SAMPLES as f64 {
                return Err(Error::invalid(
                    field,
                    format!("spans more than {} samples", MAX_SAMPLES),
                ));
            }
        }

        let total = self.total_samples();
        if total == 0 {
            return Err(Error::invalid("window_seconds", "yields no samples"));
        }
        if self.baseline_stddev < 0.0 {
            return Err(Error::invalid("baseline_stddev", "must not be negative"));
        }

        let warmup = self.warmup_len();
        if warmup == 0 || warmup > total {
            return Err(Error::invalid(
                "warmup_seconds",
                format!("yields {} samples, expected 1..={}", warmup, total),
            ));
        }
        if self.adaptive_window_len() == 0 {
            return Err(Error::invalid("adaptive_window_seconds", "yields no samples"));
        }
        if self.adaptive_k < 0.0 {
            return Err(Error::invalid("adaptive_k", "must not be negative"));
        }
        if self.attack_factor < 0.0 {
            return Err(Error::invalid("attack_factor", "must not be negative"));
        }
        if self.attack_duration_seconds < 0.0 {
            return Err(Error::invalid("attack_duration_seconds", "must not be negative"));
        }

        let range = self.attack_start_range;
        if range.min_seconds > range.max_seconds {
            return Err(Error::invalid(
                "attack_start_range",
                format!("min {} exceeds max {}", range.min_seconds, range.max_seconds),
            ));
        }
        if self.injection != Injection::Disabled {
            let (earliest, _) = self.attack_start_bounds();
            if earliest < warmup {
                return Err(Error::AttackBeforeWarmup {
                    start: earliest,
                    warmup,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SessionConfig::default();
        config.validate().expect("default config should validate");

        assert_eq!(config.total_samples(), 3600);
        assert_eq!(config.warmup_len(), 300);
        assert_eq!(config.adaptive_window_len(), 300);
        assert_eq!(config.attack_duration_len(), 30);
        assert_eq!(config.attack_start_bounds(), (600, 3000));
    }

    #[test]
    fn test_seconds_truncate() {
        let config = SessionConfig {
            sample_rate: 7,
            ..SessionConfig::default()
        };
        // 0.5 * 7 = 3.5
        assert_eq!(config.seconds_to_samples(0.5), 3);
    }

    #[test]
    fn test_pinned_attack_start() {
        let config = SessionConfig::default().with_attack_start_index(1800);
        assert_eq!(config.attack_start_bounds(), (1800, 1800));
    }

    #[test]
    fn test_attack_inside_warmup_rejected() {
        let config = SessionConfig::default().with_attack_start_index(120);
        match config.validate() {
            Err(Error::AttackBeforeWarmup { start, warmup }) => {
                assert_eq!(start, 120);
                assert_eq!(warmup, 300);
            }
            other => panic!("expected AttackBeforeWarmup, got {:?}", other),
        }

        // Irrelevant once injection is off
        let disabled = config.with_attack(Injection::Disabled, 3.0);
        assert!(disabled.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            SessionConfig {
                sample_rate: 0,
                ..SessionConfig::default()
            },
            SessionConfig {
                baseline_stddev: -1.0,
                ..SessionConfig::default()
            },
            SessionConfig {
                fixed_threshold: f64::NAN,
                ..SessionConfig::default()
            },
            SessionConfig {
                warmup_seconds: 120.0,
                ..SessionConfig::default()
            },
            SessionConfig {
                adaptive_window_seconds: 0.0,
                ..SessionConfig::default()
            },
            SessionConfig {
                attack_start_range: StartRange::new(40.0, 20.0),
                ..SessionConfig::default()
            },
        ];

        for config in cases {
            assert!(config.validate().is_err(), "should reject {:?}", config);
        }
    }

    #[test]
    fn test_oversized_durations_rejected() {
        let huge = SessionConfig {
            window_seconds: 1e300,
            ..SessionConfig::default()
        };
        assert!(matches!(
            huge.validate(),
            Err(Error::InvalidConfig { field: "window_seconds", .. })
        ));

        let long_attack = SessionConfig {
            attack_duration_seconds: 1e300,
            ..SessionConfig::default()
        };
        assert!(matches!(
            long_attack.validate(),
            Err(Error::InvalidConfig { field: "attack_duration_seconds", .. })
        ));

        // Just under the cap is still accepted
        let edge = SessionConfig {
            window_seconds: (MAX_SAMPLES / 60) as f64,
            ..SessionConfig::default()
        };
        assert!(edge.validate().is_ok());
        assert_eq!(edge.total_samples(), MAX_SAMPLES / 60 * 60);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SessionConfig::from_json_str(
            r#"{ "fixed_threshold": 1500.0, "random_seed": 7, "injection": "additive" }"#,
        )
        .expect("partial config should parse");

        assert_eq!(config.fixed_threshold, 1500.0);
        assert_eq!(config.random_seed, Some(7));
        assert_eq!(config.injection, Injection::Additive);
        assert_eq!(config.sample_rate, 60);
        assert_eq!(config.adaptive_k, 2.5);
    }

    #[test]
    fn test_json_validation_applies() {
        let result = SessionConfig::from_json_str(r#"{ "sample_rate": 0 }"#);
        assert!(matches!(result, Err(Error::InvalidConfig { field: "sample_rate", .. })));

        let result = SessionConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(Error::Json(_))));
    }
}
