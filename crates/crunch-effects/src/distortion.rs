//! Single-channel analog overdrive circuit.
//!
//! Five filter stages derived from the circuit's component values, interleaved
//! with two memoryless nonlinearities:
//!
//! ```text
//! x → Preamp HP → ×10^(36/20) → Op-amp → saturate → diode_clip → RC
//!   → (Tone LP, Tone HP) → tone_blend → × volume → y
//! ```
//!
//! Only the op-amp stage depends on a control (gain). Tone and volume act after
//! the filters, so changing them never touches coefficients.
//!
//! The processor runs at whatever rate it is prepared for. In the engine that
//! is the oversampled rate, which keeps the harmonics generated by the two
//! nonlinearities from folding back.

use crunch_core::{
    Biquad, BiquadCoefficients, CoefficientError, ContinuousTransferFunction, Effect,
    db_to_linear,
};

use crate::circuit::{self, Stage};
use crate::params::DistortionParameters;
use crate::shaping::{diode_clip, saturate, tone_blend};

/// Fixed boost of the preamp stage (dB).
pub const PREAMP_GAIN_DB: f32 = 36.0;

const STAGES: usize = Stage::ALL.len();

/// One channel of the overdrive circuit.
///
/// Lifecycle: [`new`](Self::new), then [`prepare`](Self::prepare) with the
/// processing rate, then per block [`update_parameters`](Self::update_parameters)
/// followed by [`process_block`](Self::process_block). Until the first
/// successful `prepare` every filter is a passthrough.
///
/// # Example
///
/// ```rust
/// use crunch_effects::{DistortionParameters, DistortionProcessor};
///
/// let mut dist = DistortionProcessor::new();
/// dist.prepare(384_000.0)?;
/// dist.update_parameters(DistortionParameters::new(0.7, 0.4, 0.8));
///
/// let mut block = [0.0f32; 64];
/// block[0] = 0.1;
/// dist.process_block(&mut block);
/// assert!(block.iter().all(|s| s.is_finite()));
/// # Ok::<(), crunch_core::CoefficientError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DistortionProcessor {
    /// Indexed by [`Stage::index`].
    filters: [Biquad; STAGES],
    transfer_functions: [ContinuousTransferFunction; STAGES],
    params: DistortionParameters,
    sample_rate: Option<f64>,
    preamp_gain: f32,
}

impl DistortionProcessor {
    /// Creates an unprepared processor with default parameters.
    pub fn new() -> Self {
        let params = DistortionParameters::default();
        Self {
            filters: core::array::from_fn(|_| Biquad::new()),
            transfer_functions: Stage::ALL.map(|stage| circuit::transfer_function(stage, params.gain)),
            params,
            sample_rate: None,
            preamp_gain: db_to_linear(PREAMP_GAIN_DB),
        }
    }

    /// Derives all five filters for `sample_rate` and clears their state.
    ///
    /// The op-amp stage uses the most recent gain. Nothing is changed unless
    /// every stage maps successfully.
    ///
    /// # Errors
    ///
    /// [`CoefficientError::InvalidSampleRate`] for a rate that is not positive
    /// and finite; any other [`CoefficientError`] from mapping a stage.
    pub fn prepare(&mut self, sample_rate: f64) -> Result<(), CoefficientError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(CoefficientError::InvalidSampleRate(sample_rate));
        }

        let gain = self.params.gain;
        let transfer_functions = Stage::ALL.map(|stage| circuit::transfer_function(stage, gain));

        let mut coefficients = [BiquadCoefficients::PASSTHROUGH; STAGES];
        for (coeffs, tf) in coefficients.iter_mut().zip(&transfer_functions) {
            *coeffs = tf.to_biquad(sample_rate)?;
        }

        for (filter, coeffs) in self.filters.iter_mut().zip(coefficients) {
            filter.set_coefficients(coeffs);
            filter.reset();
        }
        self.transfer_functions = transfer_functions;
        self.sample_rate = Some(sample_rate);

        #[cfg(feature = "tracing")]
        tracing::debug!(sample_rate, gain, "distortion processor prepared");

        Ok(())
    }

    /// Applies a new set of controls.
    ///
    /// Values are clamped to \[0, 1\]. The op-amp stage is re-derived only when
    /// gain moved beyond float tolerance; tone and volume are stored as is.
    /// If the re-derived stage cannot be mapped, the previous op-amp
    /// coefficients and gain stay in effect.
    pub fn update_parameters(&mut self, params: DistortionParameters) {
        let next = params.clamped();
        self.params.tone = next.tone;
        self.params.volume = next.volume;

        if !self.params.gain_differs(&next) {
            return;
        }

        self.remap_opamp(next.gain, circuit::opamp_network(next.gain));
    }

    /// Installs `tf` as the op-amp stage for `gain`, or keeps the current
    /// stage if `tf` does not map at the prepared rate.
    ///
    /// The circuit builder always yields mappable parameters for rates that
    /// passed `prepare`, so the hold branch only guards the filter state.
    fn remap_opamp(&mut self, gain: f32, tf: ContinuousTransferFunction) {
        let Some(sample_rate) = self.sample_rate else {
            self.params.gain = gain;
            self.transfer_functions[Stage::OpAmp.index()] = tf;
            return;
        };

        match tf.to_biquad(sample_rate) {
            Ok(coeffs) => {
                self.params.gain = gain;
                self.transfer_functions[Stage::OpAmp.index()] = tf;
                self.filters[Stage::OpAmp.index()].set_coefficients(coeffs);
            }
            Err(_error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    gain,
                    error = %_error,
                    "op-amp stage could not be mapped, holding previous coefficients"
                );
            }
        }
    }

    /// Runs one sample through the circuit.
    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let [preamp, opamp, rc, tone_lp, tone_hp] = &mut self.filters;

        let x = preamp.process(input) * self.preamp_gain;
        let x = opamp.process(x);
        let x = diode_clip(saturate(x));
        let x = rc.process(x);

        let low = tone_lp.process(x);
        let high = tone_hp.process(x);
        tone_blend(low, high, self.params.tone) * self.params.volume
    }

    /// Processes `buffer` in place.
    pub fn process_block(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Clears all filter state, keeping coefficients and parameters.
    pub fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }

    /// Coefficients currently installed for `stage`.
    pub fn coefficients(&self, stage: Stage) -> BiquadCoefficients {
        self.filters[stage.index()].coefficients()
    }

    /// Continuous-time model currently behind `stage`.
    pub fn transfer_function(&self, stage: Stage) -> ContinuousTransferFunction {
        self.transfer_functions[stage.index()]
    }

    /// Last applied (clamped) controls.
    pub fn parameters(&self) -> DistortionParameters {
        self.params
    }

    /// Rate passed to the last successful [`prepare`](Self::prepare).
    pub fn sample_rate(&self) -> Option<f64> {
        self.sample_rate
    }

    /// Whether [`prepare`](Self::prepare) has succeeded at least once.
    pub fn is_prepared(&self) -> bool {
        self.sample_rate.is_some()
    }
}

impl Default for DistortionProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for DistortionProcessor {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        self.process_sample(input)
    }

    fn process_block_inplace(&mut self, buffer: &mut [f32]) {
        self.process_block(buffer);
    }

    fn reset(&mut self) {
        DistortionProcessor::reset(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crunch_core::bilinear_transform;

    const SR: f64 = 384_000.0;

    fn prepared(params: DistortionParameters) -> DistortionProcessor {
        let mut dist = DistortionProcessor::new();
        dist.update_parameters(params);
        dist.prepare(SR).unwrap();
        dist
    }

    fn all_coefficients(dist: &DistortionProcessor) -> [BiquadCoefficients; STAGES] {
        Stage::ALL.map(|stage| dist.coefficients(stage))
    }

    #[test]
    fn starts_unprepared() {
        let dist = DistortionProcessor::new();
        assert!(!dist.is_prepared());
        assert_eq!(dist.sample_rate(), None);
        assert_eq!(dist.parameters(), DistortionParameters::default());
        for stage in Stage::ALL {
            assert_eq!(dist.coefficients(stage), BiquadCoefficients::PASSTHROUGH);
        }
    }

    #[test]
    fn prepare_rejects_bad_rate_without_side_effects() {
        let mut dist = DistortionProcessor::new();
        for sr in [0.0, -44100.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                dist.prepare(sr),
                Err(CoefficientError::InvalidSampleRate(_))
            ));
        }
        assert!(!dist.is_prepared());

        dist.prepare(SR).unwrap();
        let before = all_coefficients(&dist);
        assert!(dist.prepare(-1.0).is_err());
        assert_eq!(all_coefficients(&dist), before);
        assert_eq!(dist.sample_rate(), Some(SR));
    }

    #[test]
    fn prepare_installs_mapped_stages() {
        let dist = prepared(DistortionParameters::new(0.3, 0.5, 1.0));
        for stage in Stage::ALL {
            let tf = circuit::transfer_function(stage, 0.3);
            assert_eq!(dist.transfer_function(stage), tf);
            assert_eq!(dist.coefficients(stage), bilinear_transform(&tf, SR).unwrap());
        }
    }

    #[test]
    fn unmappable_opamp_holds_previous_state() {
        let mut dist = prepared(DistortionParameters::new(0.4, 0.5, 1.0));
        let before = all_coefficients(&dist);
        let tf_before = dist.transfer_function(Stage::OpAmp);

        // All-zero denominator: a0 vanishes at every rate.
        let degenerate = ContinuousTransferFunction::new([1.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
        assert_eq!(
            degenerate.to_biquad(SR),
            Err(CoefficientError::DegenerateDenominator)
        );
        dist.remap_opamp(0.9, degenerate);

        assert_eq!(all_coefficients(&dist), before);
        assert_eq!(dist.transfer_function(Stage::OpAmp), tf_before);
        assert_eq!(dist.parameters().gain, 0.4);

        // A later valid gain still remaps.
        dist.update_parameters(DistortionParameters::new(0.9, 0.5, 1.0));
        assert_eq!(dist.parameters().gain, 0.9);
        assert_ne!(dist.coefficients(Stage::OpAmp), before[Stage::OpAmp.index()]);
    }

    #[test]
    fn gain_change_touches_only_opamp() {
        let mut dist = prepared(DistortionParameters::default());
        let before = all_coefficients(&dist);

        dist.update_parameters(DistortionParameters::new(0.8, 0.5, 0.5));
        let after = all_coefficients(&dist);

        for stage in Stage::ALL {
            let i = stage.index();
            if stage == Stage::OpAmp {
                assert_ne!(before[i], after[i]);
                assert_eq!(
                    after[i],
                    bilinear_transform(&circuit::opamp_network(0.8), SR).unwrap()
                );
            } else {
                assert_eq!(before[i], after[i], "{} changed", stage.name());
            }
        }
    }

    #[test]
    fn tone_and_volume_touch_no_coefficients() {
        let mut dist = prepared(DistortionParameters::default());
        let before = all_coefficients(&dist);

        dist.update_parameters(DistortionParameters::new(0.5, 0.9, 0.1));
        assert_eq!(all_coefficients(&dist), before);
        assert_eq!(dist.parameters(), DistortionParameters::new(0.5, 0.9, 0.1));
    }

    #[test]
    fn gain_within_tolerance_is_ignored() {
        let mut dist = prepared(DistortionParameters::default());
        let before = dist.coefficients(Stage::OpAmp);
        dist.update_parameters(DistortionParameters::new(0.5 + f32::EPSILON * 0.1, 0.5, 0.5));
        assert_eq!(dist.coefficients(Stage::OpAmp), before);
        assert_eq!(dist.parameters().gain, 0.5);
    }

    #[test]
    fn update_before_prepare_stores_gain() {
        let mut dist = DistortionProcessor::new();
        dist.update_parameters(DistortionParameters::new(0.9, 0.2, 0.3));
        assert_eq!(dist.coefficients(Stage::OpAmp), BiquadCoefficients::PASSTHROUGH);
        assert_eq!(dist.transfer_function(Stage::OpAmp), circuit::opamp_network(0.9));

        dist.prepare(SR).unwrap();
        assert_eq!(
            dist.coefficients(Stage::OpAmp),
            bilinear_transform(&circuit::opamp_network(0.9), SR).unwrap()
        );
    }

    #[test]
    fn parameters_are_clamped() {
        let mut dist = prepared(DistortionParameters::default());
        dist.update_parameters(DistortionParameters::new(3.0, -1.0, 2.0));
        assert_eq!(dist.parameters(), DistortionParameters::new(1.0, 0.0, 1.0));
        assert!(dist.coefficients(Stage::OpAmp).is_finite());
    }

    #[test]
    fn silence_in_silence_out() {
        let mut dist = prepared(DistortionParameters::new(0.9, 0.5, 1.0));
        let mut block = [0.0f32; 512];
        dist.process_block(&mut block);
        assert!(block.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn zero_volume_mutes() {
        let mut dist = prepared(DistortionParameters::new(0.5, 0.5, 0.0));
        let mut block = [0.25f32; 256];
        dist.process_block(&mut block);
        assert!(block.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn output_bounded_by_clipper() {
        let mut dist = prepared(DistortionParameters::new(0.99, 0.5, 1.0));
        let limit = 0.405 * core::f32::consts::FRAC_PI_2;
        for i in 0..20_000 {
            let x = libm::sinf(i as f32 * 0.01) * 2.0;
            let y = dist.process_sample(x);
            assert!(y.is_finite());
            // The tone highpass can swing across a full clipper transition.
            assert!(y.abs() < limit * 2.0, "sample {i}: {y}");
        }
    }

    #[test]
    fn reset_makes_processing_repeatable() {
        let mut dist = prepared(DistortionParameters::new(0.6, 0.3, 0.8));
        let mut first = [0.0f32; 128];
        first[0] = 0.5;
        let mut second = first;

        dist.process_block(&mut first);
        dist.reset();
        dist.process_block(&mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn effect_trait_matches_inherent_processing() {
        let mut a = prepared(DistortionParameters::default());
        let mut b = a.clone();

        let input: [f32; 64] = core::array::from_fn(|i| (i as f32 * 0.37).sin() * 0.2);
        let mut via_trait = [0.0f32; 64];
        Effect::process_block(&mut a, &input, &mut via_trait);

        let mut inherent = input;
        b.process_block(&mut inherent);
        assert_eq!(via_trait, inherent);
    }
}
