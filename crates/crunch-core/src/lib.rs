//! Crunch Core - circuit-modeling DSP primitives
//!
//! Building blocks for analog-modeled audio processing with zero allocation in
//! the audio path.
//!
//! # Core Abstractions
//!
//! ## Effect System
//!
//! - [`Effect`] - Object-safe trait for mono audio processors
//!
//! ## Filters
//!
//! - [`Biquad`] - Direct Form I second-order section
//! - [`BiquadCoefficients`] - Normalized coefficient set, replaced atomically
//!
//! ## Circuit Mapping
//!
//! - [`ContinuousTransferFunction`] - s-domain biquadratic transfer function
//! - [`bilinear_transform`] - Digitizes a transfer function at a sample rate
//! - [`CoefficientError`] - Why a mapping was rejected
//!
//! ## Anti-Aliasing
//!
//! - [`Oversampler`] - Cascaded polyphase half-band up/down sampling
//!
//! ## Utilities
//!
//! - Math functions: [`db_to_linear`], [`linear_to_db`], [`approx_eq`]
//! - Shapers: [`asymmetric_tanh`], [`atan_clip`]
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (it needs `alloc` for oversampling
//! buffers). Disable the default `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! crunch-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use crunch_core::{Biquad, ContinuousTransferFunction};
//!
//! // RC lowpass at 320 Hz
//! let tf = ContinuousTransferFunction::new(
//!     [0.0, 0.0, 1.0],
//!     [0.0, 1.0 / (core::f64::consts::TAU * 320.0), 1.0],
//! );
//! let mut filter = Biquad::with_coefficients(tf.to_biquad(48000.0)?);
//!
//! let mut block = [1.0f32; 64];
//! for sample in block.iter_mut() {
//!     *sample = filter.process(*sample);
//! }
//! # Ok::<(), crunch_core::CoefficientError>(())
//! ```
//!
//! # Features
//!
//! - `std` (default): links the standard library
//! - `tracing`: prepare-time diagnostics through the `tracing` facade

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod analog;
pub mod biquad;
pub mod effect;
pub mod math;
pub mod oversample;

// Re-export main types at crate root
pub use analog::{CoefficientError, ContinuousTransferFunction, bilinear_transform};
pub use biquad::{Biquad, BiquadCoefficients};
pub use effect::Effect;
pub use math::{approx_eq, asymmetric_tanh, atan_clip, db_to_linear, linear_to_db};
pub use oversample::{MAX_OVERSAMPLING_STAGES, Oversampler, factor_for_stages};
