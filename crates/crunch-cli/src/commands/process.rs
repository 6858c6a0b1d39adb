//! File-based overdrive rendering.

use std::path::PathBuf;

use clap::Args;
use crunch_core::linear_to_db;
use crunch_effects::{EngineConfig, OverdriveEngine};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{RenderSettings, SettingsOverrides};
use crate::wav::{WavSpec, read_wav, write_wav};

#[derive(Args)]
pub struct ProcessArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Render settings file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Op-amp gain, 0 to 1
    #[arg(long)]
    gain: Option<f32>,

    /// Tone blend, 0 (dark) to 1 (bright)
    #[arg(long)]
    tone: Option<f32>,

    /// Output volume, 0 to 1
    #[arg(long)]
    volume: Option<f32>,

    /// Processing block size in frames [default: 512]
    #[arg(long)]
    block_size: Option<usize>,

    /// Number of 2x oversampling stages, 0 to 4 [default: 3]
    #[arg(long)]
    oversampling_stages: Option<usize>,

    /// Output bit depth (16, 24, or 32) [default: 32]
    #[arg(long)]
    bit_depth: Option<u16>,
}

impl ProcessArgs {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            gain: self.gain,
            tone: self.tone,
            volume: self.volume,
            block_size: self.block_size,
            oversampling_stages: self.oversampling_stages,
            bit_depth: self.bit_depth,
        }
    }
}

pub fn run(args: ProcessArgs) -> anyhow::Result<()> {
    let settings = RenderSettings::resolve(args.config.as_deref(), args.overrides())?;
    tracing::info!(?settings, "render settings resolved");

    println!("Reading {}...", args.input.display());
    let (mut channels, spec) = read_wav(&args.input)?;
    let frames = channels.first().map_or(0, Vec::len);

    println!(
        "  {} frames x {} channel(s), {} Hz, {:.2}s",
        frames,
        channels.len(),
        spec.sample_rate,
        frames as f64 / f64::from(spec.sample_rate)
    );

    let mut engine = OverdriveEngine::new(EngineConfig::with_oversampling_stages(
        settings.oversampling_stages,
    ))?;
    engine.prepare(
        f64::from(spec.sample_rate),
        settings.block_size,
        channels.len(),
    )?;
    engine.set_parameters(settings.parameters());

    println!(
        "Processing at {}x oversampling (gain {:.2}, tone {:.2}, volume {:.2})...",
        engine.oversampling_factor(),
        settings.gain,
        settings.tone,
        settings.volume
    );

    let input_rms = rms(&channels);
    let input_peak = peak(&channels);

    let pb = ProgressBar::new(frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let block_size = settings.block_size;
    let mut start = 0;
    while start < frames {
        let end = (start + block_size).min(frames);
        let mut block: Vec<&mut [f32]> = channels
            .iter_mut()
            .map(|channel| &mut channel[start..end])
            .collect();
        engine.process_block(&mut block, end - start);
        pb.set_position(end as u64);
        start = end;
    }

    pb.finish_with_message("done");

    println!("\nStats:");
    println!(
        "  Input:  RMS {:.1} dB, Peak {:.1} dB",
        linear_to_db(input_rms),
        linear_to_db(input_peak)
    );
    println!(
        "  Output: RMS {:.1} dB, Peak {:.1} dB",
        linear_to_db(rms(&channels)),
        linear_to_db(peak(&channels))
    );

    let out_spec = WavSpec {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: settings.bit_depth,
    };

    println!("\nWriting {}...", args.output.display());
    write_wav(&args.output, &channels, out_spec)?;
    println!("Done!");

    Ok(())
}

fn rms(channels: &[Vec<f32>]) -> f32 {
    let count: usize = channels.iter().map(Vec::len).sum();
    if count == 0 {
        return 0.0;
    }
    let sum: f32 = channels.iter().flatten().map(|s| s * s).sum();
    (sum / count as f32).sqrt()
}

fn peak(channels: &[Vec<f32>]) -> f32 {
    channels.iter().flatten().map(|s| s.abs()).fold(0.0, f32::max)
}
