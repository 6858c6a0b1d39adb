//! Property-based tests for the overdrive circuit and engine.

use proptest::prelude::*;

use crunch_effects::{
    DistortionParameters, DistortionProcessor, EngineConfig, OverdriveEngine, Stage, circuit,
    tone_blend,
};

fn any_control() -> impl Strategy<Value = f32> {
    prop_oneof![
        -2.0f32..3.0f32,
        Just(0.0f32),
        Just(1.0f32),
        Just(f32::NAN),
        Just(f32::INFINITY),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any control value, including out-of-range and NaN, yields finite
    /// op-amp coefficients at common oversampled rates.
    #[test]
    fn opamp_always_maps(gain in any_control(), rate in prop_oneof![Just(88_200.0f64), Just(384_000.0), Just(768_000.0)]) {
        let coeffs = circuit::opamp_network(gain).to_biquad(rate).unwrap();
        prop_assert!(coeffs.is_finite());
    }

    /// Clamped parameters always land in [0, 1].
    #[test]
    fn clamped_in_unit_range(gain in any_control(), tone in any_control(), volume in any_control()) {
        let p = DistortionParameters::new(gain, tone, volume).clamped();
        for v in [p.gain, p.tone, p.volume] {
            prop_assert!((0.0..=1.0).contains(&v), "{} escaped [0, 1]", v);
        }
    }

    /// The blend stays between its two branches.
    #[test]
    fn blend_between_branches(low in -5.0f32..5.0, high in -5.0f32..5.0, tone in 0.0f32..=1.0) {
        let y = tone_blend(low, high, tone);
        let (lo, hi) = if low < high { (low, high) } else { (high, low) };
        prop_assert!(y >= lo - 1e-5 && y <= hi + 1e-5, "{} outside [{}, {}]", y, lo, hi);
    }

    /// Bounded input through any settings gives finite, bounded output.
    #[test]
    fn processor_output_bounded(
        gain in any_control(),
        tone in any_control(),
        volume in any_control(),
        input in prop::collection::vec(-4.0f32..4.0, 256),
    ) {
        let mut dist = DistortionProcessor::new();
        dist.update_parameters(DistortionParameters::new(gain, tone, volume));
        dist.prepare(384_000.0).unwrap();

        let mut block = input;
        dist.process_block(&mut block);
        for &s in &block {
            prop_assert!(s.is_finite());
            prop_assert!(s.abs() < 2.0, "output sample {} out of range", s);
        }
    }

    /// Splitting a run across block sizes never changes the result.
    #[test]
    fn engine_chunking_is_transparent(
        max_block in 1usize..300,
        input in prop::collection::vec(-1.0f32..1.0, 1..600),
    ) {
        let len = input.len();

        let mut chunked = OverdriveEngine::new(EngineConfig::with_oversampling_stages(2)).unwrap();
        chunked.prepare(44_100.0, max_block, 1).unwrap();
        let mut whole = OverdriveEngine::new(EngineConfig::with_oversampling_stages(2)).unwrap();
        whole.prepare(44_100.0, len, 1).unwrap();

        let mut a = [input.clone()];
        let mut b = [input];
        chunked.process_block(&mut a, len);
        whole.process_block(&mut b, len);
        prop_assert_eq!(&a[0], &b[0]);
    }

    /// Tone and volume changes never touch coefficients.
    #[test]
    fn tone_volume_never_remap(tone in any_control(), volume in any_control()) {
        let mut dist = DistortionProcessor::new();
        dist.prepare(384_000.0).unwrap();
        let before = Stage::ALL.map(|s| dist.coefficients(s));

        dist.update_parameters(DistortionParameters::new(0.5, tone, volume));
        prop_assert_eq!(Stage::ALL.map(|s| dist.coefficients(s)), before);
    }
}
