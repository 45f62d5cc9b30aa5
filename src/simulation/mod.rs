pub mod generator;

pub use generator::{AttackPlan, AttackWindow, Injection, TrafficGenerator, TrafficTrace, generate};
