//! Easing curves: monotonic reparameterizations of a move's progress.
//!
//! Every curve maps `[0, 1]` onto `[0, 1]` with `f(0) = 0` and `f(1) = 1`
//! exactly. Inputs outside the unit interval are clamped.

use serde::{Deserialize, Serialize};

/// Easing kinds understood by moves that carry an `easing` parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    QuadraticIn,
    QuadraticOut,
    QuadraticInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    ExponentialIn,
    ExponentialOut,
    ExponentialInOut,
}

impl Easing {
    pub const ALL: [Easing; 10] = [
        Easing::Linear,
        Easing::QuadraticIn,
        Easing::QuadraticOut,
        Easing::QuadraticInOut,
        Easing::CubicIn,
        Easing::CubicOut,
        Easing::CubicInOut,
        Easing::ExponentialIn,
        Easing::ExponentialOut,
        Easing::ExponentialInOut,
    ];

    /// Applies the curve to progress `p`.
    pub fn apply(self, p: f64) -> f64 {
        if p.is_nan() || p <= 0.0 {
            return 0.0;
        }
        if p >= 1.0 {
            return 1.0;
        }
        match self {
            Easing::Linear => p,
            Easing::QuadraticIn => p * p,
            Easing::QuadraticOut => 1.0 - (1.0 - p) * (1.0 - p),
            Easing::QuadraticInOut => {
                if p < 0.5 {
                    2.0 * p * p
                } else {
                    1.0 - 2.0 * (1.0 - p) * (1.0 - p)
                }
            }
            Easing::CubicIn => p * p * p,
            Easing::CubicOut => 1.0 - (1.0 - p).powi(3),
            Easing::CubicInOut => {
                if p < 0.5 {
                    4.0 * p * p * p
                } else {
                    1.0 - 4.0 * (1.0 - p).powi(3)
                }
            }
            Easing::ExponentialIn => exp_in(p),
            Easing::ExponentialOut => 1.0 - exp_in(1.0 - p),
            Easing::ExponentialInOut => {
                if p < 0.5 {
                    0.5 * exp_in(2.0 * p)
                } else {
                    1.0 - 0.5 * exp_in(2.0 - 2.0 * p)
                }
            }
        }
    }
}

// 2^(10p - 10), shifted and rescaled so both ends are exact.
fn exp_in(p: f64) -> f64 {
    const FLOOR: f64 = 1.0 / 1024.0;
    ((10.0 * p - 10.0).exp2() - FLOOR) / (1.0 - FLOOR)
}

/// Applies an optional easing, treating `None` as linear.
pub fn ease(easing: Option<Easing>, p: f64) -> f64 {
    easing.unwrap_or_default().apply(p)
}
