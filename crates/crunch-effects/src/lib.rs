//! Crunch Effects - analog-modeled overdrive
//!
//! A guitar overdrive circuit (preamp, clipping op-amp, diode clipper, tone
//! network) modeled by deriving digital biquads from the circuit's
//! continuous-time transfer functions, interleaved with nonlinear waveshaping
//! and run inside an oversampled domain:
//!
//! - [`OverdriveEngine`] - Multi-channel, oversampled host-facing engine
//! - [`DistortionProcessor`] - One channel of the circuit at a given rate
//! - [`circuit`] - Component values and per-stage transfer functions
//! - [`shaping`] - Op-amp saturation, diode clipping, tone blend
//! - [`DistortionParameters`] - Gain, tone and volume controls
//!
//! ## Example
//!
//! ```rust
//! use crunch_effects::{EngineConfig, OverdriveEngine};
//!
//! let mut engine = OverdriveEngine::new(EngineConfig::default())?;
//! engine.prepare(48000.0, 512, 1)?;
//! engine.update_parameters(0.5, 0.5, 1.0);
//!
//! let mut mono = vec![0.0f32; 512];
//! mono[0] = 1.0;
//! engine.process_block(&mut [&mut mono[..]], 512);
//! # Ok::<(), crunch_effects::EngineError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod circuit;
pub mod distortion;
pub mod engine;
pub mod error;
pub mod params;
pub mod shaping;

// Re-export main types at crate root
pub use circuit::Stage;
pub use distortion::{DistortionProcessor, PREAMP_GAIN_DB};
pub use engine::{DEFAULT_OVERSAMPLING_STAGES, EngineConfig, OverdriveEngine};
pub use error::EngineError;
pub use params::{DistortionParameters, ParamDescriptor};
pub use shaping::{diode_clip, saturate, tone_blend};
