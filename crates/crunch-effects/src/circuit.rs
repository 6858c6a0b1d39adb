//! Continuous-time models of the overdrive circuit's filter stages.
//!
//! Each builder returns the s-domain transfer function of one stage from its
//! component values. Digitization happens elsewhere
//! ([`crunch_core::bilinear_transform`]); nothing here depends on the sample
//! rate.
//!
//! Signal path:
//!
//! ```text
//! in → Preamp HP → ×36 dB → Op-amp network → saturate → diode clip
//!    → Post-clipper RC → ┬ Tone LP ┬ → blend → × volume → out
//!                        └ Tone HP ┘
//! ```

use core::f64::consts::TAU;

use crunch_core::ContinuousTransferFunction;

/// Op-amp feedback pot, total resistance (Ω).
pub const GAIN_POT_OHMS: f64 = 100e3;
/// Series resistor below the gain pot (Ω).
pub const GAIN_SERIES_OHMS: f64 = 4.7e3;
/// Capacitor in series with the lower leg, sets the bass corner (F).
pub const OPAMP_CZ_FARADS: f64 = 1e-6;
/// Feedback compensation capacitor (F).
pub const OPAMP_CC_FARADS: f64 = 250e-12;

/// Lowest pot position used for the op-amp stage.
///
/// At 0 the top leg vanishes and `1 / (Rt·Cc)` diverges.
pub const GAIN_MIN: f32 = 0.01;
/// Highest pot position used for the op-amp stage, full travel.
///
/// The lower leg keeps the 4.7 kΩ series resistor, so the network stays
/// finite at 1. Host-facing ranges live in [`crate::ParamDescriptor`].
pub const GAIN_MAX: f32 = 1.0;

/// Preamp highpass corners (Hz).
pub const PREAMP_LOW_HZ: f64 = 3.0;
/// See [`PREAMP_LOW_HZ`].
pub const PREAMP_HIGH_HZ: f64 = 600.0;

/// Post-clipper RC: 2.2 kΩ into 0.01 µF.
pub const POST_CLIPPER_TAU: f64 = 2.2e3 * 0.01e-6;

/// Tone lowpass corner (Hz).
pub const TONE_LOWPASS_HZ: f64 = 320.0;
/// Tone highpass corner (Hz).
pub const TONE_HIGHPASS_HZ: f64 = 1160.0;
/// Divider ahead of the tone highpass: 6.8k / (2.2k + 6.8k).
pub const TONE_HIGHPASS_GAIN: f64 = 6.8 / (2.2 + 6.8);

/// Filter stages of the circuit, in signal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Input coupling highpass of the preamp.
    Preamp,
    /// Gain-dependent non-inverting op-amp network.
    OpAmp,
    /// RC smoothing after the diode clipper.
    PostClipper,
    /// Lowpass branch of the tone network.
    ToneLowpass,
    /// Highpass branch of the tone network.
    ToneHighpass,
}

impl Stage {
    /// Every stage, in signal order.
    pub const ALL: [Stage; 5] = [
        Stage::Preamp,
        Stage::OpAmp,
        Stage::PostClipper,
        Stage::ToneLowpass,
        Stage::ToneHighpass,
    ];

    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Preamp => "preamp highpass",
            Stage::OpAmp => "op-amp network",
            Stage::PostClipper => "post-clipper RC",
            Stage::ToneLowpass => "tone lowpass",
            Stage::ToneHighpass => "tone highpass",
        }
    }

    /// Position in [`Stage::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Second-order preamp highpass with corners at 3 Hz and 600 Hz.
///
/// `H(s) = s² / (s² + (ω1+ω2)·s + ω1·ω2)`
pub fn preamp_highpass() -> ContinuousTransferFunction {
    let w1 = TAU * PREAMP_LOW_HZ;
    let w2 = TAU * PREAMP_HIGH_HZ;
    ContinuousTransferFunction::new([1.0, 0.0, 0.0], [1.0, w1 + w2, w1 * w2])
}

/// Op-amp gain stage for a pot position `gain`.
///
/// The pot splits into `Rt = g·100k` above the wiper and
/// `Rb = (1−g)·100k + 4.7k` below it. With `a = 1/(Rt·Cc)`, `b = 1/(Rb·Cz)`
/// and `c = 1/(Rb·Cc)`:
///
/// ```text
///          s² + (a+b+c)·s + a·b
/// H(s) = ------------------------
///          s² + (a+b)·s + a·b
/// ```
///
/// `gain` is clamped to [`GAIN_MIN`]..=[`GAIN_MAX`] first, so every input,
/// including NaN, gives finite parameters.
pub fn opamp_network(gain: f32) -> ContinuousTransferFunction {
    let g = f64::from(clamp_pot(gain));

    let rt = g * GAIN_POT_OHMS;
    let rb = (1.0 - g) * GAIN_POT_OHMS + GAIN_SERIES_OHMS;

    let a = 1.0 / (rt * OPAMP_CC_FARADS);
    let b = 1.0 / (rb * OPAMP_CZ_FARADS);
    let c = 1.0 / (rb * OPAMP_CC_FARADS);

    ContinuousTransferFunction::new([1.0, a + b + c, a * b], [1.0, a + b, a * b])
}

/// First-order RC lowpass after the clipper, `H(s) = 1 / (τ·s + 1)`.
pub fn post_clipper_rc() -> ContinuousTransferFunction {
    ContinuousTransferFunction::new([0.0, 0.0, 1.0], [0.0, POST_CLIPPER_TAU, 1.0])
}

/// Tone network lowpass branch, corner 320 Hz.
pub fn tone_lowpass() -> ContinuousTransferFunction {
    ContinuousTransferFunction::new([0.0, 0.0, 1.0], [0.0, 1.0 / (TAU * TONE_LOWPASS_HZ), 1.0])
}

/// Tone network highpass branch, corner 1160 Hz, scaled by the input divider.
pub fn tone_highpass() -> ContinuousTransferFunction {
    ContinuousTransferFunction::new(
        [0.0, TONE_HIGHPASS_GAIN, 0.0],
        [0.0, 1.0, TAU * TONE_HIGHPASS_HZ],
    )
}

/// Transfer function of `stage`; `gain` only affects [`Stage::OpAmp`].
pub fn transfer_function(stage: Stage, gain: f32) -> ContinuousTransferFunction {
    match stage {
        Stage::Preamp => preamp_highpass(),
        Stage::OpAmp => opamp_network(gain),
        Stage::PostClipper => post_clipper_rc(),
        Stage::ToneLowpass => tone_lowpass(),
        Stage::ToneHighpass => tone_highpass(),
    }
}

fn clamp_pot(gain: f32) -> f32 {
    if gain.is_nan() {
        GAIN_MIN
    } else {
        gain.clamp(GAIN_MIN, GAIN_MAX)
    }
}
