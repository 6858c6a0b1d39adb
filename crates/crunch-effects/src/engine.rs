//! Multi-channel oversampled overdrive engine.
//!
//! This is the surface a host drives: [`OverdriveEngine::prepare`] when the
//! stream configuration changes, [`OverdriveEngine::update_parameters`] once
//! per block, and [`OverdriveEngine::process_block`] on the audio thread.
//!
//! Each channel owns an independent [`DistortionProcessor`] running at
//! `sample_rate × 2^stages`. Per block, each channel is upsampled, run through
//! its processor, and decimated back in place.
//!
//! ```text
//! ch0 ─▶ up ×2^N ─▶ DistortionProcessor[0] ─▶ down ─▶ ch0
//! ch1 ─▶ up ×2^N ─▶ DistortionProcessor[1] ─▶ down ─▶ ch1
//! ```

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crunch_core::{MAX_OVERSAMPLING_STAGES, Oversampler, factor_for_stages};

use crate::distortion::DistortionProcessor;
use crate::error::EngineError;
use crate::params::DistortionParameters;

/// Oversampling stages used by [`EngineConfig::default`] (8×).
pub const DEFAULT_OVERSAMPLING_STAGES: usize = 3;

/// Static engine configuration, fixed for the engine's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of cascaded 2× stages; the processing rate is
    /// `sample_rate × 2^oversampling_stages`. Zero disables oversampling.
    pub oversampling_stages: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            oversampling_stages: DEFAULT_OVERSAMPLING_STAGES,
        }
    }
}

impl EngineConfig {
    /// Configuration with the given stage count.
    pub const fn with_oversampling_stages(oversampling_stages: usize) -> Self {
        Self {
            oversampling_stages,
        }
    }

    /// Oversampling factor, `2^oversampling_stages`.
    pub fn oversampling_factor(&self) -> usize {
        factor_for_stages(self.oversampling_stages)
    }

    /// Checks the stage count against [`MAX_OVERSAMPLING_STAGES`].
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidOversampling`] above the maximum.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.oversampling_stages > MAX_OVERSAMPLING_STAGES {
            return Err(EngineError::InvalidOversampling {
                stages: self.oversampling_stages,
                max: MAX_OVERSAMPLING_STAGES,
            });
        }
        Ok(())
    }
}

/// Oversampled overdrive for any number of channels.
///
/// # Example
///
/// ```rust
/// use crunch_effects::{EngineConfig, OverdriveEngine};
///
/// let mut engine = OverdriveEngine::new(EngineConfig::default())?;
/// engine.prepare(48000.0, 256, 2)?;
/// engine.update_parameters(0.6, 0.5, 0.8);
///
/// let mut left = vec![0.0f32; 256];
/// let mut right = vec![0.0f32; 256];
/// left[0] = 0.5;
/// engine.process_block(&mut [&mut left[..], &mut right[..]], 256);
///
/// assert!(right.iter().all(|&s| s == 0.0));
/// # Ok::<(), crunch_effects::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct OverdriveEngine {
    config: EngineConfig,
    oversampler: Oversampler,
    /// One per prepared channel, indexed by channel.
    processors: Vec<DistortionProcessor>,
    params: DistortionParameters,
    sample_rate: Option<f64>,
    max_block: usize,
}

impl OverdriveEngine {
    /// Creates an unprepared engine.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidOversampling`] if the configuration is out of
    /// range.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            oversampler: Oversampler::new(config.oversampling_stages),
            processors: Vec::new(),
            params: DistortionParameters::default(),
            sample_rate: None,
            max_block: 0,
        })
    }

    /// Allocates per-channel state for a stream of `channels` channels at
    /// `sample_rate`, delivered in blocks of at most `max_block` frames.
    ///
    /// All filter and oversampler state is cleared. The current parameters
    /// carry over. On error the engine keeps its previous preparation.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidSampleRate`] if `sample_rate` is not positive
    ///   and finite
    /// - [`EngineError::InvalidBlockSize`] if `max_block == 0`
    /// - [`EngineError::NoChannels`] if `channels == 0`
    /// - [`EngineError::Coefficient`] if a circuit stage cannot be mapped at
    ///   the oversampled rate
    pub fn prepare(
        &mut self,
        sample_rate: f64,
        max_block: usize,
        channels: usize,
    ) -> Result<(), EngineError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        if max_block == 0 {
            return Err(EngineError::InvalidBlockSize);
        }
        if channels == 0 {
            return Err(EngineError::NoChannels);
        }

        let processing_rate = sample_rate * self.oversampling_factor() as f64;
        let mut processors = Vec::with_capacity(channels);
        for _ in 0..channels {
            let mut processor = DistortionProcessor::new();
            processor.update_parameters(self.params);
            processor.prepare(processing_rate)?;
            processors.push(processor);
        }

        self.oversampler.prepare(max_block, channels);
        self.processors = processors;
        self.sample_rate = Some(sample_rate);
        self.max_block = max_block;

        #[cfg(feature = "tracing")]
        tracing::info!(
            sample_rate,
            processing_rate,
            max_block,
            channels,
            factor = self.oversampling_factor(),
            "overdrive engine prepared"
        );

        Ok(())
    }

    /// Sets gain, tone and volume for every channel. Values are clamped to
    /// \[0, 1\].
    pub fn update_parameters(&mut self, gain: f32, tone: f32, volume: f32) {
        self.set_parameters(DistortionParameters::new(gain, tone, volume));
    }

    /// Same as [`update_parameters`](Self::update_parameters), taking the set
    /// as one value.
    pub fn set_parameters(&mut self, params: DistortionParameters) {
        let params = params.clamped();
        self.params = params;
        for processor in &mut self.processors {
            processor.update_parameters(params);
        }
    }

    /// Processes the first `frame_count` frames of every prepared channel in
    /// place.
    ///
    /// Runs longer than the prepared block size are split into chunks.
    /// Channels beyond the prepared count, and frames beyond a channel's
    /// length, are left untouched. Before a successful `prepare` this does
    /// nothing.
    pub fn process_block<C: AsMut<[f32]>>(&mut self, channels: &mut [C], frame_count: usize) {
        if self.processors.is_empty() {
            return;
        }

        let mut start = 0;
        while start < frame_count {
            let end = (start + self.max_block).min(frame_count);

            for (index, (channel, processor)) in channels
                .iter_mut()
                .zip(self.processors.iter_mut())
                .enumerate()
            {
                let buffer = channel.as_mut();
                let stop = end.min(buffer.len());
                if start >= stop {
                    continue;
                }
                let block = &mut buffer[start..stop];

                let oversampled = self.oversampler.upsample_channel(index, block);
                processor.process_block(oversampled);
                self.oversampler.downsample_channel(index, block);
            }

            start = end;
        }
    }

    /// Clears filter and oversampler state, keeping preparation and
    /// parameters.
    pub fn reset(&mut self) {
        self.oversampler.reset();
        for processor in &mut self.processors {
            processor.reset();
        }
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Oversampling factor, `2^stages`.
    pub fn oversampling_factor(&self) -> usize {
        self.oversampler.factor()
    }

    /// Number of prepared channels (0 before `prepare`).
    pub fn channel_count(&self) -> usize {
        self.processors.len()
    }

    /// Prepared maximum block size (0 before `prepare`).
    pub fn max_block_size(&self) -> usize {
        self.max_block
    }

    /// Base sample rate of the last successful `prepare`.
    pub fn sample_rate(&self) -> Option<f64> {
        self.sample_rate
    }

    /// Rate the per-channel processors run at.
    pub fn processing_rate(&self) -> Option<f64> {
        self.sample_rate
            .map(|sr| sr * self.oversampling_factor() as f64)
    }

    /// Current (clamped) parameters.
    pub fn parameters(&self) -> DistortionParameters {
        self.params
    }

    /// Processor of channel `channel`, if prepared.
    pub fn processor(&self, channel: usize) -> Option<&DistortionProcessor> {
        self.processors.get(channel)
    }
}
