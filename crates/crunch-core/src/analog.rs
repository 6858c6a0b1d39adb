//! Analog-to-digital filter mapping.
//!
//! Circuit stages are described in the s-domain as a biquadratic transfer
//! function and digitized with the bilinear (Tustin) transform:
//!
//! ```text
//!          A·s² + B·s + C                 2   1 - z⁻¹
//! H(s) = ------------------ ,   s  <-  --- · -------
//!          D·s² + E·s + F                 T   1 + z⁻¹
//! ```
//!
//! Clearing denominators gives
//!
//! ```text
//! b0 = 4A/T² + 2B/T + C        a0 = 4D/T² + 2E/T + F
//! b1 = 2C − 8A/T²              a1 = 2F − 8D/T²
//! b2 = C + 4A/T² − 2B/T        a2 = F + 4D/T² − 2E/T
//! ```
//!
//! which is then normalized by `a0`.
//!
//! All intermediate arithmetic is `f64`. With a 3 Hz pole at an oversampled
//! rate of several hundred kHz, `4D/T²` and `2E/T` differ by five orders of
//! magnitude and `f32` cancellation visibly moves the pole.
//!
//! No frequency prewarping is applied; the stages of interest sit far below
//! Nyquist once oversampled.

use core::f64::consts::TAU;
use libm::sqrt;

use crate::biquad::BiquadCoefficients;

/// Continuous-time biquadratic transfer function
/// `H(s) = (A·s² + B·s + C) / (D·s² + E·s + F)`.
///
/// First-order sections leave `A` and `D` at zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContinuousTransferFunction {
    /// s² numerator term
    pub a: f64,
    /// s numerator term
    pub b: f64,
    /// Constant numerator term
    pub c: f64,
    /// s² denominator term
    pub d: f64,
    /// s denominator term
    pub e: f64,
    /// Constant denominator term
    pub f: f64,
}

impl ContinuousTransferFunction {
    /// Builds a transfer function from numerator `(A, B, C)` and
    /// denominator `(D, E, F)`.
    pub const fn new(numerator: [f64; 3], denominator: [f64; 3]) -> Self {
        Self {
            a: numerator[0],
            b: numerator[1],
            c: numerator[2],
            d: denominator[0],
            e: denominator[1],
            f: denominator[2],
        }
    }

    /// Analog magnitude response |H(j·2πf)|.
    pub fn magnitude(&self, freq_hz: f64) -> f64 {
        let w = TAU * freq_hz;
        let w2 = w * w;

        // s = jw  =>  s² = -w²
        let num_re = self.c - self.a * w2;
        let num_im = self.b * w;
        let den_re = self.f - self.d * w2;
        let den_im = self.e * w;

        sqrt(num_re * num_re + num_im * num_im) / sqrt(den_re * den_re + den_im * den_im)
    }

    /// Digitizes this transfer function. See [`bilinear_transform`].
    pub fn to_biquad(&self, sample_rate: f64) -> Result<BiquadCoefficients, CoefficientError> {
        bilinear_transform(self, sample_rate)
    }
}

/// Reasons a transfer function cannot be digitized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoefficientError {
    /// Sample rate was zero, negative, or not finite.
    InvalidSampleRate(f64),
    /// The z-domain normalization constant `a0` is zero or not finite.
    DegenerateDenominator,
    /// Normalization produced a non-finite coefficient.
    NonFiniteCoefficients,
}

impl core::fmt::Display for CoefficientError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidSampleRate(sr) => {
                write!(f, "sample rate must be positive and finite, got {sr}")
            }
            Self::DegenerateDenominator => {
                write!(f, "bilinear transform denominator a0 is zero or not finite")
            }
            Self::NonFiniteCoefficients => write!(f, "filter coefficients are not finite"),
        }
    }
}

impl core::error::Error for CoefficientError {}

/// Maps an analog transfer function to normalized biquad coefficients.
///
/// The result is bit-reproducible: identical inputs always produce identical
/// coefficients.
///
/// # Errors
///
/// - [`CoefficientError::InvalidSampleRate`] if `sample_rate <= 0` or is not
///   finite; checked before any arithmetic.
/// - [`CoefficientError::DegenerateDenominator`] if `a0` is zero or not
///   finite.
/// - [`CoefficientError::NonFiniteCoefficients`] if a normalized coefficient
///   does not fit in `f32` or is NaN.
///
/// # Example
///
/// ```rust
/// use crunch_core::{ContinuousTransferFunction, bilinear_transform};
///
/// // First-order lowpass, tau = 1 ms
/// let tf = ContinuousTransferFunction::new([0.0, 0.0, 1.0], [0.0, 1e-3, 1.0]);
/// let coeffs = bilinear_transform(&tf, 48000.0).unwrap();
/// assert!(coeffs.is_finite());
/// ```
pub fn bilinear_transform(
    tf: &ContinuousTransferFunction,
    sample_rate: f64,
) -> Result<BiquadCoefficients, CoefficientError> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(CoefficientError::InvalidSampleRate(sample_rate));
    }

    let t = 1.0 / sample_rate;
    let tsq = t * t;

    let b0 = 4.0 * tf.a / tsq + 2.0 * tf.b / t + tf.c;
    let b1 = 2.0 * tf.c - 8.0 * tf.a / tsq;
    let b2 = tf.c + 4.0 * tf.a / tsq - 2.0 * tf.b / t;

    let a0 = 4.0 * tf.d / tsq + 2.0 * tf.e / t + tf.f;
    let a1 = 2.0 * tf.f - 8.0 * tf.d / tsq;
    let a2 = tf.f + 4.0 * tf.d / tsq - 2.0 * tf.e / t;

    if a0 == 0.0 || !a0.is_finite() {
        return Err(CoefficientError::DegenerateDenominator);
    }

    let coeffs = BiquadCoefficients {
        b0: (b0 / a0) as f32,
        b1: (b1 / a0) as f32,
        b2: (b2 / a0) as f32,
        a1: (a1 / a0) as f32,
        a2: (a2 / a0) as f32,
    };

    if coeffs.is_finite() {
        Ok(coeffs)
    } else {
        Err(CoefficientError::NonFiniteCoefficients)
    }
}
