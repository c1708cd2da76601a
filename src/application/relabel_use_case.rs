// ============================================================
// Layer 2 — RelabelUseCase
// ============================================================
// Re-targets a saved model to a different number of classes:
// the logits head (and the backbone head, if kept) is replaced
// with a freshly initialised one; every other weight is kept.
// Optionally drops the backbone's own classification head.

use anyhow::{ensure, Result};
use burn::tensor::backend::Backend;

use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::MilConfig;

#[derive(Debug, Clone)]
pub struct RelabelConfig {
    pub checkpoint_dir:         String,
    pub num_classes:            usize,
    pub delete_backbone_logits: bool,
    /// Where to write the result; defaults to `checkpoint_dir`
    pub output_dir:             Option<String>,
}

pub struct RelabelUseCase {
    config: RelabelConfig,
}

impl RelabelUseCase {
    pub fn new(config: RelabelConfig) -> Self {
        Self { config }
    }

    pub fn execute<B: Backend>(&self, device: &B::Device) -> Result<MilConfig> {
        let cfg = &self.config;
        ensure!(cfg.num_classes >= 1, "num_classes must be at least 1");

        let source = CheckpointManager::new(cfg.checkpoint_dir.as_str());
        let (mut mil_cfg, mut model) = source.restore::<B>(device)?;

        model = model.replace_logits(cfg.num_classes, device);
        mil_cfg.num_classes = cfg.num_classes;
        mil_cfg.backbone.num_classes = cfg.num_classes;

        if cfg.delete_backbone_logits {
            model = model.delete_backbone_logits();
            mil_cfg.backbone_logits = false;
        }

        let out_dir = cfg.output_dir.as_deref().unwrap_or(&cfg.checkpoint_dir);
        CheckpointManager::new(out_dir).save(&mil_cfg, &model)?;
        tracing::info!("Relabelled model saved to '{}'", out_dir);

        Ok(mil_cfg)
    }
}
