//! Multi-channel oversampling for anti-aliased nonlinear processing.
//!
//! Nonlinear stages (saturation, clipping) generate harmonics that can exceed
//! Nyquist and alias back into the audible range. Oversampling mitigates this:
//!
//! 1. **Upsampling**: raise the rate by `2^stages` (interpolation)
//! 2. **Processing**: run the nonlinear chain at the raised rate
//! 3. **Downsampling**: band-limit and decimate back to the base rate
//!
//! ## Structure
//!
//! Each stage is a 2× polyphase IIR half-band filter (Regalia-Mitra form):
//! two parallel branches of first-order allpass sections running at the lower
//! rate. Interpolation feeds every input sample to both branches and
//! interleaves their outputs; decimation feeds even samples to branch A, odd
//! samples to branch B, and averages A with the previous B output.
//!
//! | Stages | Factor |
//! |--------|--------|
//! | 0 | 1× (exact passthrough) |
//! | 1 | 2× |
//! | 2 | 4× |
//! | 3 | 8× |
//! | 4 | 16× |
//!
//! ## Usage
//!
//! ```rust
//! use crunch_core::Oversampler;
//!
//! let mut os = Oversampler::new(3);
//! os.prepare(256, 2);
//!
//! let mut left = vec![0.0f32; 256];
//! let up = os.upsample_channel(0, &left);
//! assert_eq!(up.len(), 256 * 8);
//! for s in up.iter_mut() {
//!     *s = s.tanh();
//! }
//! os.downsample_channel(0, &mut left);
//! ```
//!
//! All buffers are allocated in [`Oversampler::prepare`]; the per-block
//! methods never allocate.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

/// Maximum supported number of 2× stages (16× oversampling).
pub const MAX_OVERSAMPLING_STAGES: usize = 4;

/// Oversampling factor produced by `stages` cascaded 2× stages.
#[inline]
pub const fn factor_for_stages(stages: usize) -> usize {
    1 << stages
}

/// Allpass sections in each polyphase branch.
const SECTIONS_PER_BRANCH: usize = 5;

/// Ten-coefficient elliptic half-band, transition band 0.23..0.27 of the
/// oversampled rate. Stopband rejection is above 100 dB.
///
/// Branch A yields the even output phase, branch B the odd one. Each branch is
/// a cascade of `y = (a + z^-1) / (1 + a*z^-1)` sections.
const BRANCH_A_COEFFS: [f32; SECTIONS_PER_BRANCH] = [
    0.038_198_143,
    0.284_326_76,
    0.577_049_1,
    0.790_200_6,
    0.923_995_9,
];
const BRANCH_B_COEFFS: [f32; SECTIONS_PER_BRANCH] = [
    0.141_848_42,
    0.436_500_58,
    0.695_524_1,
    0.864_465_8,
    0.975_286_54,
];

/// First-order allpass section: y = (a + z^-1) / (1 + a*z^-1)
#[derive(Debug, Clone, Copy)]
struct AllpassSection {
    a: f32,
    state: f32,
}

impl AllpassSection {
    const fn new(a: f32) -> Self {
        Self { a, state: 0.0 }
    }

    #[inline]
    fn process(&mut self, x: f32) -> f32 {
        let y = self.a * x + self.state;
        self.state = x - self.a * y;
        y
    }
}

#[derive(Debug, Clone, Copy)]
struct AllpassBranch {
    sections: [AllpassSection; SECTIONS_PER_BRANCH],
}

impl AllpassBranch {
    const fn new(coeffs: [f32; SECTIONS_PER_BRANCH]) -> Self {
        let mut sections = [AllpassSection::new(0.0); SECTIONS_PER_BRANCH];
        let mut i = 0;
        while i < SECTIONS_PER_BRANCH {
            sections[i] = AllpassSection::new(coeffs[i]);
            i += 1;
        }
        Self { sections }
    }

    #[inline]
    fn process(&mut self, x: f32) -> f32 {
        let mut y = x;
        for section in &mut self.sections {
            y = section.process(y);
        }
        y
    }

    fn reset(&mut self) {
        for section in &mut self.sections {
            section.state = 0.0;
        }
    }
}

/// One 2× stage: independent interpolation and decimation filter state.
#[derive(Debug, Clone, Copy)]
struct HalfBandStage {
    up_a: AllpassBranch,
    up_b: AllpassBranch,
    down_a: AllpassBranch,
    down_b: AllpassBranch,
    /// Branch B output held one low-rate sample for phase alignment.
    down_delay: f32,
}

impl HalfBandStage {
    const fn new() -> Self {
        Self {
            up_a: AllpassBranch::new(BRANCH_A_COEFFS),
            up_b: AllpassBranch::new(BRANCH_B_COEFFS),
            down_a: AllpassBranch::new(BRANCH_A_COEFFS),
            down_b: AllpassBranch::new(BRANCH_B_COEFFS),
            down_delay: 0.0,
        }
    }

    /// `input.len()` samples in, `2 * input.len()` samples out.
    fn upsample(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert!(output.len() >= input.len() * 2);

        for (x, pair) in input.iter().zip(output.chunks_exact_mut(2)) {
            pair[0] = self.up_a.process(*x);
            pair[1] = self.up_b.process(*x);
        }
    }

    /// Decimates `data[..2 * out_len]` into `data[..out_len]`.
    ///
    /// Safe in place: output index `i` is written only after input indices
    /// `2i` and `2i + 1` have been read.
    fn downsample_in_place(&mut self, data: &mut [f32], out_len: usize) {
        debug_assert!(data.len() >= out_len * 2);

        for i in 0..out_len {
            let a = self.down_a.process(data[2 * i]);
            let b = self.down_b.process(data[2 * i + 1]);
            data[i] = (a + self.down_delay) * 0.5;
            self.down_delay = b;
        }
    }

    fn reset(&mut self) {
        self.up_a.reset();
        self.up_b.reset();
        self.down_a.reset();
        self.down_b.reset();
        self.down_delay = 0.0;
    }
}

#[derive(Debug, Clone)]
struct ChannelState {
    stages: [HalfBandStage; MAX_OVERSAMPLING_STAGES],
    /// Holds the current oversampled block.
    buffer: Vec<f32>,
    /// Ping-pong partner for interpolation.
    scratch: Vec<f32>,
    /// Oversampled length of the current block.
    len: usize,
}

impl ChannelState {
    fn new(capacity: usize) -> Self {
        Self {
            stages: [HalfBandStage::new(); MAX_OVERSAMPLING_STAGES],
            buffer: vec![0.0; capacity],
            scratch: vec![0.0; capacity],
            len: 0,
        }
    }

    fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
        self.buffer.fill(0.0);
        self.scratch.fill(0.0);
        self.len = 0;
    }
}

/// Cascaded polyphase half-band oversampler with per-channel state.
///
/// Lifecycle: [`new`](Self::new) with a stage count, then
/// [`prepare`](Self::prepare) whenever block size or channel count changes.
/// Per block, either use the block-level pair
/// [`process_up`](Self::process_up) / [`process_down`](Self::process_down)
/// with [`channel_mut`](Self::channel_mut) in between, or the per-channel pair
/// [`upsample_channel`](Self::upsample_channel) /
/// [`downsample_channel`](Self::downsample_channel).
///
/// Blocks longer than the prepared maximum are truncated to it; callers split
/// long buffers themselves.
#[derive(Debug, Clone)]
pub struct Oversampler {
    stages: usize,
    max_block: usize,
    channels: Vec<ChannelState>,
}

impl Oversampler {
    /// Creates an oversampler with `stages` cascaded 2× stages.
    ///
    /// No buffers are allocated until [`prepare`](Self::prepare).
    ///
    /// # Panics
    ///
    /// Panics if `stages > MAX_OVERSAMPLING_STAGES`.
    pub fn new(stages: usize) -> Self {
        assert!(
            stages <= MAX_OVERSAMPLING_STAGES,
            "oversampling stages must be at most {MAX_OVERSAMPLING_STAGES}, got {stages}"
        );

        Self {
            stages,
            max_block: 0,
            channels: Vec::new(),
        }
    }

    /// Number of 2× stages.
    pub fn stages(&self) -> usize {
        self.stages
    }

    /// Oversampling factor, `2^stages`.
    pub fn factor(&self) -> usize {
        factor_for_stages(self.stages)
    }

    /// Number of prepared channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Largest base-rate block accepted per call.
    pub fn max_block_size(&self) -> usize {
        self.max_block
    }

    /// Allocates filter state and working buffers for `channels` channels of
    /// up to `max_block` base-rate samples, and clears all state.
    pub fn prepare(&mut self, max_block: usize, channels: usize) {
        let capacity = max_block * self.factor();
        self.max_block = max_block;
        self.channels = (0..channels).map(|_| ChannelState::new(capacity)).collect();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            stages = self.stages,
            factor = self.factor(),
            max_block,
            channels,
            "oversampler prepared"
        );
    }

    /// Clears filter state and buffers without reallocating.
    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
    }

    /// Upsamples one channel and returns its oversampled block for in-place
    /// processing.
    ///
    /// Returns an empty slice for a channel that was not prepared.
    pub fn upsample_channel(&mut self, channel: usize, input: &[f32]) -> &mut [f32] {
        let stages = self.stages;
        let max_block = self.max_block;
        let Some(ch) = self.channels.get_mut(channel) else {
            return &mut [];
        };

        debug_assert!(
            input.len() <= max_block,
            "block of {} exceeds prepared maximum {}",
            input.len(),
            max_block
        );
        let n = input.len().min(max_block);

        ch.buffer[..n].copy_from_slice(&input[..n]);
        let mut len = n;
        for stage in &mut ch.stages[..stages] {
            stage.upsample(&ch.buffer[..len], &mut ch.scratch[..len * 2]);
            core::mem::swap(&mut ch.buffer, &mut ch.scratch);
            len *= 2;
        }
        ch.len = len;

        &mut ch.buffer[..len]
    }

    /// Decimates the channel's current oversampled block into `output`.
    ///
    /// Writes `min(output.len(), block length)` samples; the rest of `output`
    /// is left untouched.
    pub fn downsample_channel(&mut self, channel: usize, output: &mut [f32]) {
        let stages = self.stages;
        let Some(ch) = self.channels.get_mut(channel) else {
            return;
        };

        let mut len = ch.len;
        for stage in ch.stages[..stages].iter_mut().rev() {
            len /= 2;
            stage.downsample_in_place(&mut ch.buffer, len);
        }

        let n = len.min(output.len());
        output[..n].copy_from_slice(&ch.buffer[..n]);
    }

    /// Upsamples every prepared channel of `block`.
    ///
    /// Returns the oversampled frame count of the first channel. Channels
    /// beyond the prepared count are ignored.
    pub fn process_up<C: AsRef<[f32]>>(&mut self, block: &[C]) -> usize {
        let mut frames = 0;
        for (index, channel) in block.iter().enumerate().take(self.channels.len()) {
            let len = self.upsample_channel(index, channel.as_ref()).len();
            if index == 0 {
                frames = len;
            }
        }
        frames
    }

    /// Current oversampled block of one channel, as left by
    /// [`process_up`](Self::process_up).
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        match self.channels.get_mut(channel) {
            Some(ch) => &mut ch.buffer[..ch.len],
            None => &mut [],
        }
    }

    /// Decimates every prepared channel back into `block`.
    pub fn process_down<C: AsMut<[f32]>>(&mut self, block: &mut [C]) {
        let prepared = self.channels.len();
        for (index, channel) in block.iter_mut().enumerate().take(prepared) {
            self.downsample_channel(index, channel.as_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    fn peak(samples: &[f32]) -> f32 {
        samples.iter().map(|x| x.abs()).fold(0.0, f32::max)
    }

    #[test]
    fn factor_follows_stage_count() {
        for stages in 0..=MAX_OVERSAMPLING_STAGES {
            let os = Oversampler::new(stages);
            assert_eq!(os.stages(), stages);
            assert_eq!(os.factor(), 1 << stages);
        }
        assert_eq!(factor_for_stages(3), 8);
    }

    #[test]
    #[should_panic]
    fn too_many_stages_panics() {
        let _ = Oversampler::new(MAX_OVERSAMPLING_STAGES + 1);
    }

    #[test]
    fn silence_round_trips_to_silence() {
        let mut os = Oversampler::new(3);
        os.prepare(128, 2);

        let mut block = vec![vec![0.0f32; 128], vec![0.0f32; 128]];
        for _ in 0..4 {
            let frames = os.process_up(&block);
            assert_eq!(frames, 128 * 8);
            assert!(os.channel_mut(0).iter().all(|&s| s == 0.0));
            os.process_down(&mut block);
            assert!(block.iter().flatten().all(|&s| s == 0.0));
        }
    }

    #[test]
    fn zero_stages_is_exact_passthrough() {
        let mut os = Oversampler::new(0);
        os.prepare(16, 1);

        let input: Vec<f32> = (0..16).map(|i| i as f32 * 0.1 - 0.7).collect();
        let up = os.upsample_channel(0, &input);
        assert_eq!(up, input.as_slice());

        let mut output = vec![0.0; 16];
        os.downsample_channel(0, &mut output);
        assert_eq!(output, input);
    }

    #[test]
    fn dc_passes_at_unity() {
        for stages in 1..=MAX_OVERSAMPLING_STAGES {
            let mut os = Oversampler::new(stages);
            os.prepare(64, 1);

            let mut block = [vec![1.0f32; 64]];
            for _ in 0..8 {
                block[0].fill(1.0);
                os.process_up(&block);
                os.process_down(&mut block);
            }
            let last = block[0][63];
            assert!(
                (last - 1.0).abs() < 1e-3,
                "{stages} stage(s): DC should settle at 1.0, got {last}"
            );
        }
    }

    #[test]
    fn upsampled_dc_is_flat() {
        let mut os = Oversampler::new(2);
        os.prepare(64, 1);
        let input = [0.5f32; 64];
        for _ in 0..4 {
            os.upsample_channel(0, &input);
        }
        let up = os.upsample_channel(0, &input);
        for &s in up.iter() {
            assert!((s - 0.5).abs() < 1e-4, "interpolated DC sample {s}");
        }
    }

    #[test]
    fn passband_sine_preserved() {
        let sr = 48000.0;
        let freq = 1000.0;
        let block = 256;
        let blocks = 16;
        let mut os = Oversampler::new(3);
        os.prepare(block, 1);

        let mut output = Vec::with_capacity(block * blocks);
        for b in 0..blocks {
            let mut chunk: Vec<f32> = (0..block)
                .map(|i| libm::sinf(TAU * freq * (b * block + i) as f32 / sr))
                .collect();
            os.upsample_channel(0, &chunk);
            os.downsample_channel(0, &mut chunk);
            output.extend_from_slice(&chunk);
        }

        let settled = &output[output.len() / 2..];
        let error_db = (20.0 * libm::log10f(peak(settled))).abs();
        assert!(
            error_db < 0.5,
            "1 kHz round trip deviates by {error_db:.2} dB"
        );
    }

    #[test]
    fn decimator_rejects_stopband() {
        // One stage at 44.1 kHz: the oversampled rate is 88.2 kHz and the
        // stopband starts at 0.27 of it (23.8 kHz). Tones are generated
        // directly at the oversampled rate.
        let sr_up = 88200.0;
        let block = 512;
        let blocks = 8;

        for freq in [24_000.0, 25_000.0, 26_000.0, 28_000.0, 32_000.0, 40_000.0] {
            let mut os = Oversampler::new(1);
            os.prepare(block, 1);

            let silence = vec![0.0f32; block];
            let mut output = Vec::with_capacity(block * blocks);
            let mut n = 0usize;
            for _ in 0..blocks {
                let up = os.upsample_channel(0, &silence);
                for s in up.iter_mut() {
                    *s = libm::sin(core::f64::consts::TAU * freq * n as f64 / sr_up) as f32;
                    n += 1;
                }
                let mut chunk = vec![0.0f32; block];
                os.downsample_channel(0, &mut chunk);
                output.extend_from_slice(&chunk);
            }

            let settled = &output[output.len() / 2..];
            let attenuation_db = 20.0 * libm::log10f(peak(settled).max(1e-12));
            assert!(
                attenuation_db < -70.0,
                "{freq} Hz only attenuated by {attenuation_db:.1} dB"
            );
        }
    }

    /// Hann-windowed single-bin amplitude of `samples` at `freq`.
    fn tone_amplitude(samples: &[f32], freq: f64, sample_rate: f64) -> f64 {
        use core::f64::consts::TAU as TAU64;

        let len = samples.len() as f64;
        let (mut re, mut im, mut window_sum) = (0.0f64, 0.0f64, 0.0f64);
        for (n, &s) in samples.iter().enumerate() {
            let w = 0.5 - 0.5 * libm::cos(TAU64 * n as f64 / len);
            let phase = TAU64 * freq * n as f64 / sample_rate;
            re += f64::from(s) * w * libm::cos(phase);
            im += f64::from(s) * w * libm::sin(phase);
            window_sum += w;
        }
        2.0 * libm::sqrt(re * re + im * im) / window_sum
    }

    #[test]
    fn interpolator_suppresses_images() {
        // 10 kHz at 44.1 kHz upsampled once: the image sits at 34.1 kHz.
        let sr = 44100.0;
        let freq = 10_000.0;
        let block = 512;
        let mut os = Oversampler::new(1);
        os.prepare(block, 1);

        let mut upsampled = Vec::with_capacity(block * 16);
        for b in 0..8 {
            let input: Vec<f32> = (0..block)
                .map(|i| {
                    let n = (b * block + i) as f64;
                    libm::sin(core::f64::consts::TAU * freq * n / sr) as f32
                })
                .collect();
            upsampled.extend_from_slice(os.upsample_channel(0, &input));
        }

        let settled = &upsampled[upsampled.len() / 2..];
        let tone_db = 20.0 * libm::log10(tone_amplitude(settled, freq, 2.0 * sr));
        let image_db =
            20.0 * libm::log10(tone_amplitude(settled, sr - freq, 2.0 * sr).max(1e-12));
        assert!(tone_db.abs() < 0.1, "tone level {tone_db:.2} dB");
        assert!(image_db < -70.0, "image at 34.1 kHz is {image_db:.1} dB");
    }

    #[test]
    fn reset_clears_state() {
        let mut os = Oversampler::new(2);
        os.prepare(32, 1);

        let loud = [1.0f32; 32];
        os.upsample_channel(0, &loud);
        let mut out = [0.0f32; 32];
        os.downsample_channel(0, &mut out);

        os.reset();

        let silence = [0.0f32; 32];
        let up = os.upsample_channel(0, &silence);
        assert!(up.iter().all(|&s| s == 0.0));
        os.downsample_channel(0, &mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn unprepared_channel_is_ignored() {
        let mut os = Oversampler::new(1);
        os.prepare(8, 1);
        assert!(os.upsample_channel(3, &[1.0; 8]).is_empty());

        let mut out = [7.0f32; 8];
        os.downsample_channel(3, &mut out);
        assert_eq!(out, [7.0; 8]);
        assert!(os.channel_mut(3).is_empty());
    }

    #[test]
    fn channels_are_independent() {
        let mut os = Oversampler::new(2);
        os.prepare(32, 2);

        let mut block = [vec![0.0f32; 32], vec![0.0f32; 32]];
        block[0][0] = 1.0;
        os.process_up(&block);
        assert!(os.channel_mut(1).iter().all(|&s| s == 0.0));
        os.process_down(&mut block);
        assert!(block[1].iter().all(|&s| s == 0.0));
        assert!(block[0].iter().any(|&s| s != 0.0));
    }
}
