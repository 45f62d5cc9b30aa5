//! # traffic-cusum
//!
//! Simulation-and-detection engine for traffic volume spikes.
//!
//! ```text
//!   TrafficGenerator ──▶ samples ──▶ CusumEngine ──▶ statistic
//!                                                       │
//!                      ThresholdEstimator ◀─────────────┤
//!                        (fixed, adaptive)              ▼
//!                              └──────────────▶ AnomalyDetector ──▶ Session
//! ```
//!
//! Hosts (plots, alerts, audio) drive a [`Session`] one `step()` at a time,
//! or run [`analysis::analyze`] over a finished trace. Nothing in this crate
//! owns timers, threads or rendering.
//!
//! ```rust,no_run
//! use traffic_cusum::{Session, SessionConfig};
//!
//! let mut session = Session::new(SessionConfig::default().with_seed(42))?;
//! for record in session.step_burst(5) {
//!     println!("{} {:.1}", record.index, record.statistic);
//! }
//! if let Some(event) = session.run_to_completion() {
//!     println!("detected at {:.2}s", event.time);
//! }
//! # Ok::<(), traffic_cusum::Error>(())
//! ```

pub mod algo;
pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod session;
pub mod simulation;

pub use algo::{BaselineMode, ThresholdEstimator};
pub use analysis::{Analysis, analyze};
pub use config::{MAX_SAMPLES, SessionConfig, StartRange};
pub use engine::{AnomalyDetector, DetectionEvent, Phase, Trigger};
pub use error::{Error, Result};
pub use session::{History, RunSummary, Session, SessionState, StepOutcome, StepRecord};
pub use simulation::{AttackPlan, AttackWindow, Injection, TrafficGenerator, TrafficTrace};
