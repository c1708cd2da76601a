// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Builds a MIL model from hyperparameters and reports what the
// construction-time dummy pass found:
//
//   Step 1: Translate InspectConfig → MilConfig
//   Step 2: Build the model (validates + sizes via dummy pass)
//   Step 3: Count parameters
//   Step 4: Optionally save config + freshly initialised weights
//
// Reference: Burn Book §3 (Building Blocks)

use anyhow::Result;
use burn::{
    module::Module,
    tensor::{backend::Backend, Tensor},
};
use serde::{Deserialize, Serialize};

use crate::domain::{clip::ClipShape, trace::ShapeTrace};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{backbone::ResNet2dConfig, model::MilConfig};

// ─── Inspect Configuration ───────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectConfig {
    pub input_size:      Vec<usize>,
    pub num_classes:     usize,
    pub dropout:         f64,
    pub lstm_hidden:     usize,
    pub lstm_layers:     usize,
    pub base_width:      usize,
    pub blocks:          Vec<usize>,
    pub backbone_logits: bool,
    pub save_dir:        Option<String>,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            input_size:      vec![1, 3, 36, 224, 224],
            num_classes:     2,
            dropout:         0.5,
            lstm_hidden:     128,
            lstm_layers:     1,
            base_width:      64,
            blocks:          vec![2, 2, 2, 2],
            backbone_logits: false,
            save_dir:        None,
        }
    }
}

impl InspectConfig {
    /// The channel count is read from the input size; a malformed input
    /// size is reported later by MilConfig validation.
    pub fn to_mil_config(&self) -> MilConfig {
        let in_channels = self.input_size.get(1).copied().unwrap_or(3);
        MilConfig::new(self.input_size.clone())
            .with_num_classes(self.num_classes)
            .with_in_channels(in_channels)
            .with_dropout(self.dropout)
            .with_lstm_hidden(self.lstm_hidden)
            .with_lstm_layers(self.lstm_layers)
            .with_backbone_logits(self.backbone_logits)
            .with_backbone(
                ResNet2dConfig::new()
                    .with_base_width(self.base_width)
                    .with_blocks(self.blocks.clone())
                    .with_num_classes(self.num_classes)
                    .with_dropout(self.dropout),
            )
    }
}

/// What the inspection found.
#[derive(Debug, Clone)]
pub struct InspectReport {
    pub trace:              ShapeTrace,
    pub num_params:         usize,
    pub logits_in_channels: usize,
    /// `[b, t, num_classes]` from the backbone's own head, when kept
    pub frame_logits:       Option<Vec<usize>>,
}

// ─── InspectUseCase ───────────────────────────────────────────────────────────
pub struct InspectUseCase {
    config: InspectConfig,
}

impl InspectUseCase {
    pub fn new(config: InspectConfig) -> Self {
        Self { config }
    }

    pub fn execute<B: Backend>(&self, device: &B::Device) -> Result<InspectReport> {
        let mil_cfg = self.config.to_mil_config();
        let (model, trace) = mil_cfg.init_with_trace::<B>(device)?;

        let num_params = model.num_params();
        tracing::info!("Model has {} parameters", num_params);

        // Run the per-frame head on the same dummy clip when it still exists
        let frame_logits = if model.backbone().has_logits() {
            let shape = ClipShape::from_dims(&trace.input)?;
            let dummy = Tensor::<B, 5>::zeros(shape.dims(), device);
            let dims  = model.backbone().forward(dummy)?.dims().to_vec();
            tracing::info!("Backbone per-frame logits size: {:?}", dims);
            Some(dims)
        } else {
            None
        };

        if let Some(dir) = &self.config.save_dir {
            let ckpt = CheckpointManager::new(dir.as_str());
            ckpt.save(&mil_cfg, &model)?;
            tracing::info!("Saved initial checkpoint to '{}'", dir);
        }

        Ok(InspectReport {
            trace,
            num_params,
            logits_in_channels: model.logits_in_channels(),
            frame_logits,
        })
    }
}
