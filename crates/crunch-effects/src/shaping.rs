//! Memoryless nonlinearities of the overdrive circuit.
//!
//! Thin wrappers pinning the generic shapers of [`crunch_core::math`] to the
//! circuit's component constants.

use crunch_core::{asymmetric_tanh, atan_clip};

/// Positive op-amp output swing (V).
pub const OPAMP_POS_RAIL: f32 = 4.55;
/// Negative op-amp output swing (V), slightly lower than the positive one.
pub const OPAMP_NEG_RAIL: f32 = 4.4;

/// Diode clipper output scale.
pub const DIODE_LEVEL: f32 = 0.405;
/// Diode clipper input drive.
pub const DIODE_DRIVE: f32 = 3.178;

/// Op-amp rail saturation: `4.55·tanh(x/4.55)` for `x > 0`, else
/// `4.4·tanh(x/4.4)`.
///
/// The unequal rails make the curve asymmetric and add even harmonics.
#[inline]
pub fn saturate(x: f32) -> f32 {
    asymmetric_tanh(x, OPAMP_POS_RAIL, OPAMP_NEG_RAIL)
}

/// Antiparallel diode clipper: `0.405·atan(3.178·x)`.
#[inline]
pub fn diode_clip(x: f32) -> f32 {
    atan_clip(x, DIODE_LEVEL, DIODE_DRIVE)
}

/// Crossfade of the tone network branches: `(1 − tone)·low + tone·high`.
///
/// Exactly `low` at `tone = 0` and exactly `high` at `tone = 1`.
#[inline]
pub fn tone_blend(low: f32, high: f32, tone: f32) -> f32 {
    (1.0 - tone) * low + tone * high
}
