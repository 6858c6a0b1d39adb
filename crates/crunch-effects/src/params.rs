//! Control values of the overdrive and their descriptors.
//!
//! The circuit exposes three knobs, all normalized to \[0, 1\]:
//!
//! | Index | Name | Host range | Default |
//! |-------|------|------------|---------|
//! | 0 | Gain | 0.01 – 0.99 | 0.5 |
//! | 1 | Tone | 0 – 1 | 0.5 |
//! | 2 | Volume | 0 – 1 | 0.5 |
//!
//! Gain stops short of both ends because the op-amp network degenerates at
//! the pot's end stops. The processing code clamps to \[0, 1\] on its own, so
//! descriptors are advisory for shells that present the controls.
//!
//! # Example
//!
//! ```rust
//! use crunch_effects::{DistortionParameters, ParamDescriptor};
//!
//! let mut params = DistortionParameters::default();
//! let index = DistortionParameters::find_param_by_name("tone").unwrap();
//! params.set_param(index, 1.7);
//! assert_eq!(params.tone, 1.0);
//! assert_eq!(ParamDescriptor::GAIN.max, 0.99);
//! ```

use crunch_core::approx_eq;

/// Describes one control for display and validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDescriptor {
    /// Full parameter name for display.
    pub name: &'static str,
    /// Short name for narrow displays, max 8 characters.
    pub short_name: &'static str,
    /// Stable identifier for settings files and logs.
    pub string_id: &'static str,
    /// Minimum allowed value.
    pub min: f32,
    /// Maximum allowed value.
    pub max: f32,
    /// Value on initialization.
    pub default: f32,
    /// Recommended increment for stepped control.
    pub step: f32,
}

impl ParamDescriptor {
    /// Op-amp gain pot.
    pub const GAIN: Self = Self {
        name: "Gain",
        short_name: "Gain",
        string_id: "gain",
        min: 0.01,
        max: 0.99,
        default: 0.5,
        step: 0.01,
    };

    /// Tone network blend, 0 = dark, 1 = bright.
    pub const TONE: Self = Self {
        name: "Tone",
        short_name: "Tone",
        string_id: "tone",
        min: 0.0,
        max: 1.0,
        default: 0.5,
        step: 0.01,
    };

    /// Output level.
    pub const VOLUME: Self = Self {
        name: "Volume",
        short_name: "Vol",
        string_id: "volume",
        min: 0.0,
        max: 1.0,
        default: 0.5,
        step: 0.01,
    };

    /// Clamps `value` to `[min, max]`. NaN maps to the default.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    /// Converts a plain value to \[0, 1\].
    pub fn normalize(&self, value: f32) -> f32 {
        let range = self.max - self.min;
        if range == 0.0 {
            return 0.0;
        }
        (value - self.min) / range
    }

    /// Converts a normalized value back to the plain range.
    pub fn denormalize(&self, normalized: f32) -> f32 {
        self.min + normalized * (self.max - self.min)
    }
}

/// The three control values, applied once per block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistortionParameters {
    /// Op-amp gain pot position.
    pub gain: f32,
    /// Tone blend, lowpass at 0, highpass at 1.
    pub tone: f32,
    /// Output level multiplier.
    pub volume: f32,
}

impl Default for DistortionParameters {
    fn default() -> Self {
        Self {
            gain: ParamDescriptor::GAIN.default,
            tone: ParamDescriptor::TONE.default,
            volume: ParamDescriptor::VOLUME.default,
        }
    }
}

impl DistortionParameters {
    /// Descriptors in index order.
    pub const PARAMS: [ParamDescriptor; 3] = [
        ParamDescriptor::GAIN,
        ParamDescriptor::TONE,
        ParamDescriptor::VOLUME,
    ];

    /// Creates a parameter set from raw values without clamping.
    pub const fn new(gain: f32, tone: f32, volume: f32) -> Self {
        Self { gain, tone, volume }
    }

    /// Each value limited to \[0, 1\]; NaN becomes 0.
    pub fn clamped(self) -> Self {
        Self {
            gain: unit(self.gain),
            tone: unit(self.tone),
            volume: unit(self.volume),
        }
    }

    /// Whether `other` moves the gain beyond float tolerance.
    ///
    /// Only gain feeds a filter stage, so only gain changes require new
    /// coefficients.
    pub fn gain_differs(&self, other: &Self) -> bool {
        !approx_eq(self.gain, other.gain)
    }

    /// Number of controls.
    pub const fn param_count() -> usize {
        Self::PARAMS.len()
    }

    /// Descriptor at `index`, if any.
    pub fn param_info(index: usize) -> Option<ParamDescriptor> {
        Self::PARAMS.get(index).copied()
    }

    /// Index of the control whose name, short name or id matches `name`
    /// (case-insensitive).
    pub fn find_param_by_name(name: &str) -> Option<usize> {
        Self::PARAMS.iter().position(|d| {
            d.name.eq_ignore_ascii_case(name)
                || d.short_name.eq_ignore_ascii_case(name)
                || d.string_id.eq_ignore_ascii_case(name)
        })
    }

    /// Value at `index`; `0.0` for an unknown index.
    pub fn get_param(&self, index: usize) -> f32 {
        match index {
            0 => self.gain,
            1 => self.tone,
            2 => self.volume,
            _ => 0.0,
        }
    }

    /// Sets the value at `index`, clamped to its descriptor range. Unknown
    /// indices are ignored.
    pub fn set_param(&mut self, index: usize, value: f32) {
        let Some(desc) = Self::param_info(index) else {
            return;
        };
        let value = desc.clamp(value);
        match index {
            0 => self.gain = value,
            1 => self.tone = value,
            _ => self.volume = value,
        }
    }
}

fn unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
