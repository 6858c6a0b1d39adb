//! Core Effect trait.
//!
//! ## Design Decisions
//!
//! - **Mono processing**: Single `f32` input/output. Multi-channel processing
//!   is built from one independent instance per channel, so channels never
//!   share filter state.
//!
//! - **Object-safe**: `dyn Effect` works for runtime dispatch; generic/static
//!   dispatch is preferred in the audio path.
//!
//! - **No allocations**: All methods are callable from a real-time audio
//!   thread.
//!
//! - **Preparation is not part of the trait**: sample-rate changes can fail
//!   (see [`crate::CoefficientError`]), so implementors expose their own
//!   fallible `prepare` and the trait only covers the infallible hot path.

/// Core trait for all audio effects.
///
/// # Example
///
/// ```rust
/// use crunch_core::Effect;
///
/// struct Gain {
///     gain: f32,
/// }
///
/// impl Effect for Gain {
///     fn process(&mut self, input: f32) -> f32 {
///         input * self.gain
///     }
///
///     fn reset(&mut self) {}
/// }
///
/// let mut gain = Gain { gain: 0.5 };
/// let mut block = [1.0, -1.0];
/// gain.process_block_inplace(&mut block);
/// assert_eq!(block, [0.5, -0.5]);
/// ```
pub trait Effect {
    /// Process a single sample, advancing internal state by one sample.
    fn process(&mut self, input: f32) -> f32;

    /// Process a block of samples.
    ///
    /// Default implementation calls `process()` for each sample.
    fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(
            input.len(),
            output.len(),
            "Input and output buffers must have same length"
        );
        for (inp, out) in input.iter().zip(output.iter_mut()) {
            *out = self.process(*inp);
        }
    }

    /// Process a block of samples in place.
    fn process_block_inplace(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Clear internal state (filter history) without changing parameters.
    fn reset(&mut self);

    /// Processing latency in samples. Default 0.
    fn latency_samples(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Gain(f32);

    impl Effect for Gain {
        fn process(&mut self, input: f32) -> f32 {
            input * self.0
        }
        fn reset(&mut self) {}
    }

    #[test]
    fn test_process_block() {
        let mut gain = Gain(2.0);
        let input = [1.0, 2.0, 3.0];
        let mut output = [0.0; 3];
        gain.process_block(&input, &mut output);
        assert_eq!(output, [2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_process_block_inplace_matches_process() {
        let mut a = Gain(0.25);
        let mut b = Gain(0.25);
        let mut buffer = [0.5, -1.0, 4.0];
        let expected: [f32; 3] = core::array::from_fn(|i| b.process(buffer[i]));
        a.process_block_inplace(&mut buffer);
        assert_eq!(buffer, expected);
    }

    #[test]
    fn test_default_latency_is_zero() {
        assert_eq!(Gain(1.0).latency_samples(), 0);
    }
}
