// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores a MIL model using Burn's CompactRecorder.
//
// What gets saved:
//   1. Model weights (.mpk file, half precision) — all parameters
//   2. mil_config.json              — architecture hyperparameters
//
// The config is needed to rebuild a module with the same layout
// (same LSTM width, same number of classes) before the weights
// are loaded into it.
//
// File layout:
//   checkpoints/
//     model.mpk
//     mil_config.json
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::ml::model::{MilConfig, MilModel};

const CONFIG_FILE:  &str = "mil_config.json";
const WEIGHTS_FILE: &str = "model";

/// Manages saving and loading of model checkpoints in one directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager.
    /// Nothing touches the disk until something is saved, so reading
    /// from a mistyped directory leaves no trace behind.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the checkpoint directory, like `mkdir -p`.
    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| {
                format!("Cannot create checkpoint directory '{}'", self.dir.display())
            })
    }

    /// Save model weights.
    ///
    /// Uses Burn's CompactRecorder which:
    ///   1. Takes the record of every parameter via into_record()
    ///   2. Serialises it to MessagePack at half precision
    ///   3. Writes {dir}/model plus the recorder's extension
    pub fn save_model<B: Backend>(&self, model: &MilModel<B>) -> Result<()> {
        self.ensure_dir()?;

        // Build the file path (without extension, the recorder adds it)
        let path = self.dir.join(WEIGHTS_FILE);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| {
                format!("Failed to save checkpoint to '{}'", path.display())
            })?;

        tracing::debug!("Saved weights to '{}'", path.display());
        Ok(())
    }

    /// Load weights into `model`.
    ///
    /// The model must already have the saved architecture (same LSTM
    /// width, same number of classes) or loading will fail.
    pub fn load_model<B: Backend>(
        &self,
        model:  MilModel<B>,
        device: &B::Device,
    ) -> Result<MilModel<B>> {
        let path = self.dir.join(WEIGHTS_FILE);

        // Load the serialised record from disk
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you run 'inspect --save' first?",
                    path.display())
            })?;

        // Restore the weights into the model
        Ok(model.load_record(record))
    }

    /// Save the model configuration to JSON.
    ///
    /// Must be saved alongside the weights so the model can be rebuilt
    /// before they are loaded.
    pub fn save_config(&self, cfg: &MilConfig) -> Result<()> {
        self.ensure_dir()?;

        let path = self.dir.join(CONFIG_FILE);
        // Indented JSON, readable and editable by hand
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| {
                format!("Cannot write config to '{}'", path.display())
            })?;

        tracing::debug!("Saved model config to '{}'", path.display());
        Ok(())
    }

    /// Load the model configuration from JSON.
    pub fn load_config(&self) -> Result<MilConfig> {
        let path = self.dir.join(CONFIG_FILE);

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!("Cannot read config from '{}'", path.display())
            })?;

        // Deserialise JSON back into MilConfig
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed model config in '{}'", path.display()))
    }

    /// Rebuild the saved architecture and load its weights.
    pub fn restore<B: Backend>(&self, device: &B::Device) -> Result<(MilConfig, MilModel<B>)> {
        let cfg   = self.load_config()?;
        // Fresh weights with the right shapes, then overwritten
        let model = cfg.init::<B>(device)?;
        let model = self.load_model(model, device)?;
        tracing::info!("Model restored from '{}'", self.dir.display());
        Ok((cfg, model))
    }

    /// Persist both halves of a checkpoint.
    pub fn save<B: Backend>(&self, cfg: &MilConfig, model: &MilModel<B>) -> Result<()> {
        self.save_config(cfg)?;
        self.save_model(model)
    }
}
