//! Parameter and circuit information command.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use clap::Args;
use crunch_core::factor_for_stages;
use crunch_effects::{DistortionParameters, DistortionProcessor, Stage};

use crate::config::{RenderSettings, SettingsOverrides};

#[derive(Args)]
pub struct InfoArgs {
    /// Base sample rate in Hz
    #[arg(long, default_value = "48000")]
    sample_rate: u32,

    /// Op-amp gain used for the op-amp stage, 0 to 1
    #[arg(long, default_value = "0.5")]
    gain: f32,

    /// Number of 2x oversampling stages, 0 to 4
    #[arg(long, default_value = "3")]
    oversampling_stages: usize,
}

pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let settings = RenderSettings::resolve(
        None,
        SettingsOverrides {
            gain: Some(args.gain),
            oversampling_stages: Some(args.oversampling_stages),
            ..SettingsOverrides::default()
        },
    )?;

    println!("Parameters:");
    println!();
    println!(
        "  {:8}  {:8}  {:>8}  {:>8}  {:>8}",
        "Name", "Id", "Min", "Max", "Default"
    );
    println!(
        "  {:8}  {:8}  {:>8}  {:>8}  {:>8}",
        "----", "--", "---", "---", "-------"
    );
    for param in DistortionParameters::PARAMS {
        println!(
            "  {:8}  {:8}  {:>8.2}  {:>8.2}  {:>8.2}",
            param.name, param.string_id, param.min, param.max, param.default
        );
    }

    let factor = factor_for_stages(settings.oversampling_stages);
    let processing_rate = f64::from(args.sample_rate) * factor as f64;

    let mut processor = DistortionProcessor::new();
    processor.update_parameters(DistortionParameters {
        gain: settings.gain,
        ..DistortionParameters::default()
    });
    processor.prepare(processing_rate)?;

    println!();
    println!(
        "Circuit stages at {} Hz x{} = {} Hz (gain {:.2}):",
        args.sample_rate, factor, processing_rate, settings.gain
    );

    for stage in Stage::ALL {
        let tf = processor.transfer_function(stage);
        let coeffs = processor.coefficients(stage);
        println!();
        println!("  {}", stage.name());
        println!(
            "    H(s) = ({:e} s^2 + {:e} s + {:e}) / ({:e} s^2 + {:e} s + {:e})",
            tf.a, tf.b, tf.c, tf.d, tf.e, tf.f
        );
        println!(
            "    b = [{:.9}, {:.9}, {:.9}]  a = [1, {:.9}, {:.9}]",
            coeffs.b0, coeffs.b1, coeffs.b2, coeffs.a1, coeffs.a2
        );
    }

    Ok(())
}
