//! Anomaly detector
//!
//! Compares the CUSUM statistic against the fixed and adaptive thresholds and
//! latches the first crossing.
//!
//! ```text
//!   WARMUP ──(index >= warmup_len)──▶ MONITORING ──(first crossing)──▶ DETECTED
//! ```
//!
//! DETECTED is terminal for the rest of the session: later crossings never
//! touch the recorded event.

use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Warmup,
    Monitoring,
    Detected,
}

/// Which boundary the statistic crossed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Fixed,
    Adaptive,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DetectionEvent {
    pub index: usize,
    /// Seconds since the start of the trace
    pub time: f64,
    pub trigger: Trigger,
    /// Statistic value at the crossing
    pub statistic: f64,
    /// The threshold that was exceeded
    pub threshold: f64,
}

pub struct AnomalyDetector {
    warmup_len: usize,
    fixed_threshold: f64,
    adaptive_enabled: bool,
    sample_rate: u32,
    last_index: Option<usize>,
    event: Option<DetectionEvent>,
}

impl AnomalyDetector {
    pub fn new(
        warmup_len: usize,
        fixed_threshold: f64,
        adaptive_enabled: bool,
        sample_rate: u32,
    ) -> Self {
        Self {
            warmup_len,
            fixed_threshold,
            adaptive_enabled,
            sample_rate,
            last_index: None,
            event: None,
        }
    }

    /// Crossing check for one index, without touching the latch.
    ///
    /// Fixed first, then adaptive (short-circuit). An undefined adaptive
    /// threshold skips the adaptive comparison entirely.
    pub fn evaluate(
        &self,
        index: usize,
        statistic: f64,
        adaptive: Option<f64>,
    ) -> Option<(Trigger, f64)> {
        if index < self.warmup_len {
            return None;
        }
        if statistic > self.fixed_threshold {
            return Some((Trigger::Fixed, self.fixed_threshold));
        }
        match adaptive {
            Some(threshold) if self.adaptive_enabled && statistic > threshold => {
                Some((Trigger::Adaptive, threshold))
            }
            _ => None,
        }
    }

    /// Feed one index. Returns the event only on the step that latches it.
    pub fn observe(
        &mut self,
        index: usize,
        statistic: f64,
        adaptive: Option<f64>,
    ) -> Option<&DetectionEvent> {
        self.last_index = Some(index);
        if self.event.is_some() {
            return None;
        }

        let (trigger, threshold) = self.evaluate(index, statistic, adaptive)?;
        let event = DetectionEvent {
            index,
            time: index as f64 / self.sample_rate as f64,
            trigger,
            statistic,
            threshold,
        };
        info!(
            index,
            time = event.time,
            trigger = ?trigger,
            statistic,
            threshold,
            "Anomaly detected"
        );
        self.event = Some(event);
        self.event.as_ref()
    }

    /// Phase an index falls into, given the current latch.
    pub fn phase_at(&self, index: usize) -> Phase {
        if self.event.is_some() {
            Phase::Detected
        } else if index < self.warmup_len {
            Phase::Warmup
        } else {
            Phase::Monitoring
        }
    }

    /// Phase after the most recently observed index.
    pub fn phase(&self) -> Phase {
        self.phase_at(self.last_index.unwrap_or(0))
    }

    pub fn event(&self) -> Option<&DetectionEvent> {
        self.event.as_ref()
    }

    pub fn is_detected(&self) -> bool {
        self.event.is_some()
    }

    /// Seconds between the true attack start and the detection, floored at zero.
    ///
    /// Informational only; never used by `observe`.
    pub fn detection_delay(&self, attack_start_time: Option<f64>) -> Option<f64> {
        let event = self.event.as_ref()?;
        Some((event.time - attack_start_time?).max(0.0))
    }

    pub fn reset(&mut self) {
        self.last_index = None;
        self.event = None;
    }
}
