//! Offline analysis of a complete trace
//!
//! Computes every series in one pass for batch consumers (plots of a finished
//! run, reports). Detection follows the same rules as `Session` with a frozen
//! baseline, so both agree on the event for the same trace.

use crate::algo::adaptive_threshold::{ThresholdEstimator, global_threshold};
use crate::algo::cusum;
use crate::config::SessionConfig;
use crate::engine::{AnomalyDetector, DetectionEvent};
use crate::error::{Error, Result};
use crate::session::check_trace;
use crate::simulation::generator::TrafficTrace;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Analysis {
    pub baseline: f64,
    pub statistic: Vec<f64>,
    pub adaptive_threshold: Vec<Option<f64>>,
    pub fixed_threshold: f64,
    /// `k * stddev` of the whole statistic series; informational
    pub global_threshold: Option<f64>,
    /// First index after warm-up where the statistic exceeds `global_threshold`
    pub global_detection: Option<usize>,
    pub detection: Option<DetectionEvent>,
    pub detection_delay: Option<f64>,
}

pub fn analyze(config: &SessionConfig, trace: &TrafficTrace) -> Result<Analysis> {
    config.validate()?;
    check_trace(config, trace)?;
    let baseline = cusum::baseline(&trace.samples, config.warmup_len())
        .ok_or_else(|| Error::EmptyTrace("nothing to analyze".to_string()))?;

    let statistic = cusum::statistic_batch(&trace.samples, baseline);
    let estimator = ThresholdEstimator::new(
        config.fixed_threshold,
        config.adaptive_window_len(),
        config.adaptive_k,
    );
    let adaptive_threshold = estimator.adaptive_series(&statistic);

    let mut detector = AnomalyDetector::new(
        config.warmup_len(),
        config.fixed_threshold,
        config.adaptive_enabled,
        trace.sample_rate,
    );
    for (index, (&s, &a)) in statistic.iter().zip(&adaptive_threshold).enumerate() {
        if detector.observe(index, s, a).is_some() {
            break;
        }
    }

    let global = global_threshold(&statistic, config.adaptive_k);
    let global_detection = global.and_then(|threshold| {
        statistic
            .iter()
            .enumerate()
            .skip(config.warmup_len())
            .find(|&(_, &s)| s > threshold)
            .map(|(index, _)| index)
    });

    Ok(Analysis {
        global_threshold: global,
        global_detection,
        detection: detector.event().cloned(),
        detection_delay: detector.detection_delay(trace.attack_start_time()),
        fixed_threshold: config.fixed_threshold,
        baseline,
        statistic,
        adaptive_threshold,
    })
}
