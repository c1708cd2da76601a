// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap, picks the Burn backend and hands
// each command to its use case in Layer 2. Printing happens
// here; use cases only return values.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use burn::tensor::backend::Backend;
use clap::Parser;
use commands::{BackendKind, Commands, InspectArgs, RelabelArgs, ScoreArgs};

#[derive(Parser, Debug)]
#[command(
    name = "anomaly-mil",
    version = "0.1.0",
    about = "2D ResNet + LSTM + MIL anomaly detector for surveillance video."
)]
pub struct Cli {
    /// Tensor backend
    #[arg(long, value_enum, default_value_t = BackendKind::Cpu, global = true)]
    pub backend: BackendKind,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Pick the backend and device, then run the subcommand on it.
    pub fn run(self) -> Result<()> {
        match self.backend {
            BackendKind::Cpu => {
                let device = burn::backend::ndarray::NdArrayDevice::default();
                dispatch::<burn::backend::NdArray>(self.command, &device)
            }
            BackendKind::Wgpu => {
                let device = burn::backend::wgpu::WgpuDevice::default();
                tracing::info!("Using WGPU device: {:?}", device);
                dispatch::<burn::backend::Wgpu>(self.command, &device)
            }
        }
    }
}

/// Route a subcommand to its handler. Generic over the backend so every
/// command runs the same way on CPU and GPU.
fn dispatch<B: Backend>(command: Commands, device: &B::Device) -> Result<()> {
    match command {
        Commands::Inspect(args) => run_inspect::<B>(args, device),
        Commands::Score(args)   => run_score::<B>(args, device),
        Commands::Relabel(args) => run_relabel::<B>(args, device),
    }
}

/// Handles the `inspect` subcommand.
/// Builds the model from the CLI hyperparameters and prints one line per stage.
fn run_inspect<B: Backend>(args: InspectArgs, device: &B::Device) -> Result<()> {
    use crate::application::inspect_use_case::InspectUseCase;

    // Convert CLI args → application config
    let report = InspectUseCase::new(args.into()).execute::<B>(device)?;

    // Shapes in pipeline order, input first
    for (stage, shape) in report.trace.stages() {
        println!("{:<16} {:?}", stage, shape);
    }
    println!("Logits input     {} channels", report.logits_in_channels);
    match &report.frame_logits {
        Some(dims) => println!("Backbone head    kept, per-frame logits {:?}", dims),
        None       => println!("Backbone head    none"),
    }
    println!("Parameters       {}", report.num_params);
    Ok(())
}

/// Handles the `score` subcommand.
/// Prints one line per clip: bag score, peak frame, verdict and frame scores.
fn run_score<B: Backend>(args: ScoreArgs, device: &B::Device) -> Result<()> {
    use crate::application::score_use_case::ScoreUseCase;

    // Borrow args: the threshold is still needed below
    let reports = ScoreUseCase::new((&args).into()).execute::<B>(device)?;

    for (i, r) in reports.iter().enumerate() {
        let scores: Vec<String> = r.frame_scores.iter().map(|s| format!("{s:.3}")).collect();
        println!(
            "clip {i}: bag={:.4} peak_frame={} anomalous={} scores=[{}]",
            r.bag_score,
            r.peak_frame,
            r.is_anomalous(args.threshold),
            scores.join(", "),
        );
    }
    Ok(())
}

/// Handles the `relabel` subcommand.
/// Replaces the logits head of a saved model and writes it back.
fn run_relabel<B: Backend>(args: RelabelArgs, device: &B::Device) -> Result<()> {
    use crate::application::relabel_use_case::RelabelUseCase;

    let cfg = RelabelUseCase::new(args.into()).execute::<B>(device)?;
    println!("Model now predicts {} classes.", cfg.num_classes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inspect_defaults() {
        let cli = Cli::try_parse_from(["anomaly-mil", "inspect"]).unwrap();
        assert!(matches!(cli.backend, BackendKind::Cpu));
        match cli.command {
            Commands::Inspect(a) => {
                assert_eq!(a.input_size, vec![1, 3, 36, 224, 224]);
                assert_eq!(a.blocks, vec![2, 2, 2, 2]);
                assert_eq!(a.lstm_hidden, 128);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_comma_separated_input_size() {
        let cli = Cli::try_parse_from([
            "anomaly-mil", "--backend", "wgpu", "inspect", "--input-size", "1,3,8,112,112",
        ])
        .unwrap();
        assert!(matches!(cli.backend, BackendKind::Wgpu));
        match cli.command {
            Commands::Inspect(a) => assert_eq!(a.input_size, vec![1, 3, 8, 112, 112]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_relabel_requires_num_classes() {
        assert!(Cli::try_parse_from(["anomaly-mil", "relabel"]).is_err());
    }
}
