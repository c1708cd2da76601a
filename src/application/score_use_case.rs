// ============================================================
// Layer 2 — ScoreUseCase
// ============================================================
// Scores a clip with a saved model:
//
//   Step 1: Restore config + weights          (Layer 6 - infra)
//   Step 2: Resolve the clip shape            (Layer 3 - domain)
//   Step 3: Load pixels from a ClipSource     (Layer 6 - infra)
//   Step 4: Forward pass → logits [b, k, t]   (Layer 5 - ml)
//   Step 5: Anomaly scores + MIL bag scores   (Layer 5 - ml)

use anyhow::Result;
use burn::tensor::{backend::Backend, Tensor};

use crate::domain::{clip::ClipShape, traits::ClipSource};
use crate::infra::{
    checkpoint::CheckpointManager,
    clip_reader::{RawClipReader, SyntheticClip},
};
use crate::ml::scoring::{anomaly_scores, ClipReport};

#[derive(Debug, Clone)]
pub struct ScoreConfig {
    pub checkpoint_dir: String,
    /// Raw f32 clip file; a seeded synthetic clip is used when absent
    pub clip:           Option<String>,
    pub batch:          usize,
    /// Overrides the number of frames the model was sized with
    pub frames:         Option<usize>,
    pub seed:           u64,
    pub anomaly_class:  usize,
}

pub struct ScoreUseCase {
    config: ScoreConfig,
}

impl ScoreUseCase {
    pub fn new(config: ScoreConfig) -> Self {
        Self { config }
    }

    pub fn execute<B: Backend>(&self, device: &B::Device) -> Result<Vec<ClipReport>> {
        let cfg  = &self.config;
        let ckpt = CheckpointManager::new(cfg.checkpoint_dir.as_str());
        let (mil_cfg, model) = ckpt.restore::<B>(device)?;

        let sized = ClipShape::from_dims(&mil_cfg.input_size)?;
        let shape = ClipShape::from_dims(&[
            cfg.batch,
            sized.channels,
            cfg.frames.unwrap_or(sized.frames),
            sized.height,
            sized.width,
        ])?;

        let source: Box<dyn ClipSource> = match &cfg.clip {
            Some(path) => Box::new(RawClipReader::new(path.as_str())),
            None       => Box::new(SyntheticClip::new(cfg.seed)),
        };
        tracing::info!("Scoring {} with shape {}", source.describe(), shape);

        let pixels = source.load(&shape)?;
        let video  = Tensor::<B, 1>::from_floats(pixels.as_slice(), device).reshape(shape.dims());

        let logits  = model.try_forward(video)?;
        let scores  = anomaly_scores(logits, cfg.anomaly_class)?;
        let reports = ClipReport::from_batch(scores)?;

        for (i, r) in reports.iter().enumerate() {
            tracing::debug!("Clip {}: bag score {:.4} at frame {}", i, r.bag_score, r.peak_frame);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::inspect_use_case::{InspectConfig, InspectUseCase};

    type TestBackend = burn::backend::NdArray;

    fn saved_model(dir: &std::path::Path) {
        let cfg = InspectConfig {
            input_size:  vec![1, 3, 3, 32, 32],
            lstm_hidden: 8,
            base_width:  4,
            blocks:      vec![1, 1],
            save_dir:    Some(dir.to_string_lossy().into_owned()),
            ..InspectConfig::default()
        };
        InspectUseCase::new(cfg).execute::<TestBackend>(&Default::default()).unwrap();
    }

    fn score_config(dir: &std::path::Path) -> ScoreConfig {
        ScoreConfig {
            checkpoint_dir: dir.to_string_lossy().into_owned(),
            clip:           None,
            batch:          2,
            frames:         None,
            seed:           42,
            anomaly_class:  1,
        }
    }

    #[test]
    fn test_scores_synthetic_batch() {
        let tmp = tempfile::tempdir().unwrap();
        saved_model(tmp.path());

        let reports = ScoreUseCase::new(score_config(tmp.path()))
            .execute::<TestBackend>(&Default::default())
            .unwrap();
        assert_eq!(reports.len(), 2);
        for r in &reports {
            assert_eq!(r.frame_scores.len(), 3);
            assert!(r.frame_scores.iter().all(|p| (0.0..=1.0).contains(p)));
            assert!(r.frame_scores.iter().all(|&p| p <= r.bag_score));
        }
    }

    #[test]
    fn test_frame_override() {
        let tmp = tempfile::tempdir().unwrap();
        saved_model(tmp.path());

        let cfg = ScoreConfig { frames: Some(5), batch: 1, ..score_config(tmp.path()) };
        let reports = ScoreUseCase::new(cfg).execute::<TestBackend>(&Default::default()).unwrap();
        assert_eq!(reports[0].frame_scores.len(), 5);
    }

    #[test]
    fn test_raw_clip_with_wrong_size_fails() {
        let tmp = tempfile::tempdir().unwrap();
        saved_model(tmp.path());
        let clip = tmp.path().join("clip.f32");
        std::fs::write(&clip, [0u8; 16]).unwrap();

        let cfg = ScoreConfig {
            clip: Some(clip.to_string_lossy().into_owned()),
            ..score_config(tmp.path())
        };
        assert!(ScoreUseCase::new(cfg).execute::<TestBackend>(&Default::default()).is_err());
    }

    #[test]
    fn test_missing_checkpoint_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = score_config(&tmp.path().join("nothing"));
        assert!(ScoreUseCase::new(cfg).execute::<TestBackend>(&Default::default()).is_err());
    }
}
