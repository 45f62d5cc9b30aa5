pub mod adaptive_threshold;
pub mod cusum;

// Re-exports for convenience
pub use adaptive_threshold::{ThresholdEstimator, adaptive_threshold, global_threshold};
pub use cusum::{
    BaselineMode, BaselineTracker, CusumEngine, baseline, statistic_batch, statistic_step,
};
