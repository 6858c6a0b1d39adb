//! Error types for engine preparation.

use crunch_core::CoefficientError;
use thiserror::Error;

/// Errors raised while configuring or preparing an [`OverdriveEngine`](crate::OverdriveEngine).
///
/// Processing itself never fails; these only come out of construction and
/// `prepare`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Sample rate was zero, negative, or not finite.
    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),

    /// Maximum block size was zero.
    #[error("maximum block size must be greater than zero")]
    InvalidBlockSize,

    /// Channel count was zero.
    #[error("at least one channel is required")]
    NoChannels,

    /// Oversampling stage count above the supported maximum.
    #[error("oversampling stages must be at most {max}, got {stages}")]
    InvalidOversampling {
        /// Requested stage count.
        stages: usize,
        /// Largest supported stage count.
        max: usize,
    },

    /// A circuit stage could not be digitized.
    #[error("coefficient mapping failed: {0}")]
    Coefficient(#[from] CoefficientError),
}
