//! Incremental detection session
//!
//! A `Session` owns one trace and walks it one sample per `step()`. It has no
//! timers or threads: the host decides the cadence (one step, a burst per
//! rendered frame, or nothing for a while) and the results depend only on the
//! order of calls.
//!
//! ```text
//!   READY ──step()──▶ RUNNING ──step() at N-1──▶ COMPLETE
//!     ▲                                             │
//!     └──────────────────reset(config)──────────────┘
//! ```

use crate::algo::adaptive_threshold::ThresholdEstimator;
use crate::algo::cusum::{self, BaselineMode, BaselineTracker, CusumEngine};
use crate::config::SessionConfig;
use crate::engine::{AnomalyDetector, DetectionEvent, Phase};
use crate::error::{Error, Result};
use crate::simulation::generator::{AttackWindow, TrafficGenerator, TrafficTrace};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Ready,
    Running,
    Complete,
}

/// Everything a renderer needs about one processed sample.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub index: usize,
    pub time: f64,
    pub sample: f64,
    /// Reference level used for this sample's CUSUM increment
    pub baseline: Option<f64>,
    pub statistic: f64,
    pub fixed_threshold: f64,
    pub adaptive_threshold: Option<f64>,
    pub phase: Phase,
    /// True only on the step that latched the detection event
    pub just_detected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Advanced(StepRecord),
    /// Every sample has already been processed
    Complete,
}

impl StepOutcome {
    pub fn record(&self) -> Option<&StepRecord> {
        match self {
            Self::Advanced(record) => Some(record),
            Self::Complete => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Read-only view of every series processed so far, aligned by index.
#[derive(Debug, Clone, Copy)]
pub struct History<'a> {
    pub samples: &'a [f64],
    pub statistic: &'a [f64],
    pub adaptive_threshold: &'a [Option<f64>],
    pub fixed_threshold: f64,
    pub sample_rate: u32,
}

impl History<'_> {
    pub fn len(&self) -> usize {
        self.statistic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statistic.is_empty()
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        let rate = self.sample_rate as f64;
        (0..self.len()).map(move |i| i as f64 / rate)
    }
}

/// End-of-run report for hosts that log or export results.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub seed: Option<u64>,
    pub total_samples: usize,
    pub processed: usize,
    pub state: SessionState,
    pub baseline: Option<f64>,
    pub attack: Option<AttackWindow>,
    pub attack_start_time: Option<f64>,
    pub detection: Option<DetectionEvent>,
    pub detection_delay: Option<f64>,
    pub peak_statistic: f64,
}

pub struct Session {
    config: SessionConfig,
    trace: TrafficTrace,
    estimator: ThresholdEstimator,
    detector: AnomalyDetector,
    cusum: CusumEngine,
    /// Frozen warm-up mean; `None` in provisional mode
    frozen_baseline: Option<f64>,
    tracker: BaselineTracker,
    statistic: Vec<f64>,
    adaptive: Vec<Option<f64>>,
    cursor: usize,
}

impl Session {
    /// Validate `config`, generate its trace, and return a READY session.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let trace = TrafficGenerator::new(config.clone())?.generate()?;
        Self::from_trace(config, trace)
    }

    /// Build a session over an existing trace (replay or externally recorded
    /// traffic). The configuration's traffic and attack fields are ignored;
    /// its warm-up, thresholds and baseline mode apply.
    pub fn from_trace(config: SessionConfig, trace: TrafficTrace) -> Result<Self> {
        config.validate()?;
        check_trace(&config, &trace)?;

        let warmup_len = config.warmup_len();
        let frozen_baseline = match config.baseline_mode {
            BaselineMode::Frozen => cusum::baseline(&trace.samples, warmup_len),
            BaselineMode::Provisional => None,
        };
        let estimator = ThresholdEstimator::new(
            config.fixed_threshold,
            config.adaptive_window_len(),
            config.adaptive_k,
        );
        let detector = AnomalyDetector::new(
            warmup_len,
            config.fixed_threshold,
            config.adaptive_enabled,
            trace.sample_rate,
        );

        debug!(
            samples = trace.len(),
            seed = ?trace.seed,
            baseline_mode = ?config.baseline_mode,
            baseline = ?frozen_baseline,
            "Session ready"
        );

        Ok(Self {
            cusum: CusumEngine::new(frozen_baseline.unwrap_or(0.0)),
            tracker: BaselineTracker::new(warmup_len),
            statistic: Vec::with_capacity(trace.len()),
            adaptive: Vec::with_capacity(trace.len()),
            cursor: 0,
            frozen_baseline,
            estimator,
            detector,
            trace,
            config,
        })
    }

    /// Process the next sample.
    pub fn step(&mut self) -> StepOutcome {
        let index = self.cursor;
        let Some(&sample) = self.trace.samples.get(index) else {
            return StepOutcome::Complete;
        };

        let baseline = match self.frozen_baseline {
            Some(frozen) => Some(frozen),
            // Mean of the samples before this one, capped at the warm-up window
            None => self.tracker.current(),
        };
        let statistic = match baseline {
            Some(b) => self.cusum.update_with_baseline(sample, b),
            None => self.cusum.update(sample),
        };
        self.tracker.observe(sample);
        self.statistic.push(statistic);

        let adaptive = self.estimator.adaptive(&self.statistic, index);
        self.adaptive.push(adaptive);

        let just_detected = self.detector.observe(index, statistic, adaptive).is_some();
        self.cursor += 1;

        if self.cursor == self.trace.len() {
            debug!(
                processed = self.cursor,
                detected = self.detector.is_detected(),
                "Session complete"
            );
        }

        let record = StepRecord {
            index,
            time: self.trace.time_at(index),
            sample,
            baseline,
            statistic,
            fixed_threshold: self.estimator.fixed(),
            adaptive_threshold: adaptive,
            phase: self.detector.phase_at(index),
            just_detected,
        };
        trace!(index, statistic, adaptive = ?adaptive, "Step");
        StepOutcome::Advanced(record)
    }

    /// Process up to `n` samples, e.g. one burst per rendered frame.
    pub fn step_burst(&mut self, n: usize) -> Vec<StepRecord> {
        let mut records = Vec::with_capacity(n.min(self.remaining()));
        for _ in 0..n {
            match self.step() {
                StepOutcome::Advanced(record) => records.push(record),
                StepOutcome::Complete => break,
            }
        }
        records
    }

    /// Step until COMPLETE and return the latched event, if any.
    pub fn run_to_completion(&mut self) -> Option<&DetectionEvent> {
        while !self.step().is_complete() {}
        self.detector.event()
    }

    /// Discard all progress, regenerate the trace for `config`, back to READY.
    ///
    /// On error the session keeps its previous configuration and progress.
    pub fn reset(&mut self, config: SessionConfig) -> Result<()> {
        *self = Self::new(config)?;
        debug!("Session reset");
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        if self.cursor == 0 {
            SessionState::Ready
        } else if self.cursor < self.trace.len() {
            SessionState::Running
        } else {
            SessionState::Complete
        }
    }

    pub fn current_index(&self) -> usize {
        self.cursor
    }

    pub fn total_samples(&self) -> usize {
        self.trace.len()
    }

    pub fn remaining(&self) -> usize {
        self.trace.len() - self.cursor
    }

    pub fn history(&self) -> History<'_> {
        History {
            samples: &self.trace.samples[..self.cursor],
            statistic: &self.statistic,
            adaptive_threshold: &self.adaptive,
            fixed_threshold: self.estimator.fixed(),
            sample_rate: self.trace.sample_rate,
        }
    }

    pub fn detection_event(&self) -> Option<&DetectionEvent> {
        self.detector.event()
    }

    pub fn detection_delay(&self) -> Option<f64> {
        self.detector.detection_delay(self.trace.attack_start_time())
    }

    pub fn phase(&self) -> Phase {
        self.detector.phase()
    }

    /// Baseline currently in force (frozen value, or the provisional estimate).
    pub fn baseline(&self) -> Option<f64> {
        self.frozen_baseline.or_else(|| self.tracker.current())
    }

    pub fn trace(&self) -> &TrafficTrace {
        &self.trace
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            generated_at: Utc::now(),
            seed: self.trace.seed,
            total_samples: self.trace.len(),
            processed: self.cursor,
            state: self.state(),
            baseline: self.baseline(),
            attack: self.trace.attack,
            attack_start_time: self.trace.attack_start_time(),
            detection: self.detector.event().cloned(),
            detection_delay: self.detection_delay(),
            peak_statistic: self.statistic.iter().copied().fold(0.0, f64::max),
        }
    }
}

/// A trace is usable with `config` when it has samples at the configured rate.
pub(crate) fn check_trace(config: &SessionConfig, trace: &TrafficTrace) -> Result<()> {
    if trace.is_empty() {
        return Err(Error::EmptyTrace("session needs at least one sample".to_string()));
    }
    if trace.sample_rate != config.sample_rate {
        return Err(Error::SampleRateMismatch {
            trace: trace.sample_rate,
            config: config.sample_rate,
        });
    }
    Ok(())
}
