//! Mathematical utility functions for DSP.
//!
//! All functions are allocation-free and suitable for `no_std`.
//!
//! # Level Conversions
//!
//! - [`db_to_linear`] / [`linear_to_db`] - Convert between dB and linear gain
//!
//! # Waveshaping
//!
//! | Function | Character | Harmonics | Models |
//! |----------|-----------|-----------|--------|
//! | [`asymmetric_tanh`] | Smooth, rail-limited | Even + Odd | Op-amp output swing with unequal rails |
//! | [`atan_clip`] | Soft knee, bounded | Odd | Antiparallel diode pair |
//!
//! # Comparison
//!
//! - [`approx_eq`] - Relative float comparison used to gate coefficient updates

use libm::{atanf, log10f, powf, tanhf};

/// Convert decibels to linear gain: `10^(dB/20)`.
///
/// # Example
/// ```rust
/// use crunch_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    powf(10.0, db / 20.0)
}

/// Convert linear gain to decibels.
///
/// Values at or below zero are floored at -200 dB.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    20.0 * log10f(linear.max(1e-10))
}

/// Hyperbolic tangent saturation with independent positive and negative rails.
///
/// `x > 0` saturates toward `+pos_rail`, everything else toward `-neg_rail`.
/// Slope at the origin is 1 on both sides, so small signals pass unchanged.
#[inline]
pub fn asymmetric_tanh(x: f32, pos_rail: f32, neg_rail: f32) -> f32 {
    if x > 0.0 {
        pos_rail * tanhf(x / pos_rail)
    } else {
        neg_rail * tanhf(x / neg_rail)
    }
}

/// Arctangent soft clipper: `level · atan(drive · x)`.
///
/// Output is bounded by `±level · π/2`.
#[inline]
pub fn atan_clip(x: f32, level: f32, drive: f32) -> f32 {
    level * atanf(x * drive)
}

/// Approximate float equality.
///
/// Equal when the difference is within one `f32::EPSILON` relative to the
/// larger magnitude, or below the smallest normal float.
#[inline]
pub fn approx_eq(a: f32, b: f32) -> bool {
    if a == b {
        return true;
    }
    let diff = (a - b).abs();
    diff < f32::MIN_POSITIVE || diff <= f32::EPSILON * a.abs().max(b.abs())
}
