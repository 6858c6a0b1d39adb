//! Impulse response of one channel, printed one sample per line.

use clap::Args;
use crunch_effects::{EngineConfig, OverdriveEngine};

use crate::config::{RenderSettings, SettingsOverrides};

#[derive(Args)]
pub struct ImpulseArgs {
    /// Base sample rate in Hz
    #[arg(long, default_value = "48000")]
    sample_rate: u32,

    /// Number of samples to print
    #[arg(long, default_value = "64")]
    length: usize,

    /// Op-amp gain, 0 to 1
    #[arg(long, default_value = "0.5")]
    gain: f32,

    /// Tone blend, 0 to 1
    #[arg(long, default_value = "0.5")]
    tone: f32,

    /// Output volume, 0 to 1
    #[arg(long, default_value = "1.0")]
    volume: f32,

    /// Number of 2x oversampling stages, 0 to 4
    #[arg(long, default_value = "3")]
    oversampling_stages: usize,
}

pub fn run(args: ImpulseArgs) -> anyhow::Result<()> {
    let settings = RenderSettings::resolve(
        None,
        SettingsOverrides {
            gain: Some(args.gain),
            tone: Some(args.tone),
            volume: Some(args.volume),
            oversampling_stages: Some(args.oversampling_stages),
            ..SettingsOverrides::default()
        },
    )?;

    let mut engine = OverdriveEngine::new(EngineConfig::with_oversampling_stages(
        settings.oversampling_stages,
    ))?;
    engine.prepare(f64::from(args.sample_rate), settings.block_size, 1)?;
    engine.set_parameters(settings.parameters());

    let mut response = vec![0.0f32; args.length];
    if let Some(first) = response.first_mut() {
        *first = 1.0;
    }
    engine.process_block(&mut [&mut response[..]], args.length);

    tracing::debug!(
        length = args.length,
        factor = engine.oversampling_factor(),
        "impulse rendered"
    );

    for sample in &response {
        println!("{sample}");
    }

    Ok(())
}
