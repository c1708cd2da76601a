// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Three subcommands:
//   inspect — build a model, print the shape of every stage
//   score   — score a clip with a saved model
//   relabel — replace the classification head of a saved model
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{
    inspect_use_case::InspectConfig,
    relabel_use_case::RelabelConfig,
    score_use_case::ScoreConfig,
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a model and print the shapes found by the dummy forward pass
    Inspect(InspectArgs),

    /// Score a clip with a saved model
    Score(ScoreArgs),

    /// Replace the logits head of a saved model
    Relabel(RelabelArgs),
}

/// Tensor backend used for every command.
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum BackendKind {
    /// ndarray on the CPU
    #[default]
    Cpu,
    /// wgpu on the default GPU adapter
    Wgpu,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Clip shape batch,channel,time,height,width (batch is ignored)
    #[arg(long, value_delimiter = ',', default_values_t = [1usize, 3, 36, 224, 224])]
    pub input_size: Vec<usize>,

    #[arg(long, default_value_t = 2)]
    pub num_classes: usize,

    /// Drop probability before the logits head
    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,

    /// Hidden size of the LSTM
    #[arg(long, default_value_t = 128)]
    pub lstm_hidden: usize,

    #[arg(long, default_value_t = 1)]
    pub lstm_layers: usize,

    /// Channels of the first backbone stage
    #[arg(long, default_value_t = 64)]
    pub base_width: usize,

    /// Residual blocks per backbone stage
    #[arg(long, value_delimiter = ',', default_values_t = [2usize, 2, 2, 2])]
    pub blocks: Vec<usize>,

    /// Keep the backbone's own per-frame classification head
    #[arg(long)]
    pub backbone_logits: bool,

    /// Save config and initial weights to this directory
    #[arg(long)]
    pub save: Option<String>,
}

impl From<InspectArgs> for InspectConfig {
    fn from(a: InspectArgs) -> Self {
        InspectConfig {
            input_size:      a.input_size,
            num_classes:     a.num_classes,
            dropout:         a.dropout,
            lstm_hidden:     a.lstm_hidden,
            lstm_layers:     a.lstm_layers,
            base_width:      a.base_width,
            blocks:          a.blocks,
            backbone_logits: a.backbone_logits,
            save_dir:        a.save,
        }
    }
}

#[derive(Args, Debug)]
pub struct ScoreArgs {
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Raw little-endian f32 clip; random noise is scored when omitted
    #[arg(long)]
    pub clip: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub batch: usize,

    /// Number of frames, defaults to the one the model was sized with
    #[arg(long)]
    pub frames: Option<usize>,

    /// Seed for the synthetic clip
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Index of the anomaly class in the logits
    #[arg(long, default_value_t = 1)]
    pub anomaly_class: usize,

    /// Bag score at or above which a clip is flagged
    #[arg(long, default_value_t = 0.5)]
    pub threshold: f32,
}

impl From<&ScoreArgs> for ScoreConfig {
    fn from(a: &ScoreArgs) -> Self {
        ScoreConfig {
            checkpoint_dir: a.checkpoint_dir.clone(),
            clip:           a.clip.clone(),
            batch:          a.batch,
            frames:         a.frames,
            seed:           a.seed,
            anomaly_class:  a.anomaly_class,
        }
    }
}

#[derive(Args, Debug)]
pub struct RelabelArgs {
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long)]
    pub num_classes: usize,

    /// Also remove the backbone's own classification head
    #[arg(long)]
    pub delete_backbone_logits: bool,

    /// Write to another directory instead of overwriting
    #[arg(long)]
    pub output_dir: Option<String>,
}

impl From<RelabelArgs> for RelabelConfig {
    fn from(a: RelabelArgs) -> Self {
        RelabelConfig {
            checkpoint_dir:         a.checkpoint_dir,
            num_classes:            a.num_classes,
            delete_backbone_logits: a.delete_backbone_logits,
            output_dir:             a.output_dir,
        }
    }
}
