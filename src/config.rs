//! Engine configuration.

use serde::{Deserialize, Serialize};

/// How the validator treats recoverable errors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Reject the sequence on any error.
    #[default]
    Strict,
    /// Correct recoverable errors (durations, parameter bounds, keyframe order)
    /// and report them as warnings. Overlap, transition and unknown-type errors
    /// are never corrected.
    Lenient,
}

/// Configuration shared by validation, composition and pacing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mode: ValidationMode,
    /// Output sample rate of the compositor.
    pub ticks_per_second: f64,
    /// How late a frame may be handed out before it counts as a missed deadline.
    pub latency_tolerance_seconds: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: ValidationMode::Strict,
            ticks_per_second: 50.0,
            latency_tolerance_seconds: 0.005,
        }
    }
}
