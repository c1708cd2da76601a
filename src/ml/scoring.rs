// ============================================================
// Layer 5 — MIL Readout
// ============================================================
// Turns per-timestep logits into anomaly scores.
//
//   logits  [b, k, t]
//     │  softmax over classes (sigmoid when k == 1)
//     ▼
//   scores  [b, t]     ← probability that instance t is anomalous
//     │  max over instances
//     ▼
//   bag     [b]        ← MIL bag score for the whole clip
//
// Reference: Sultani et al. (2018) Real-world Anomaly Detection
//            in Surveillance Videos

use anyhow::{anyhow, ensure, Result};
use burn::{
    prelude::*,
    tensor::activation::{sigmoid, softmax},
};
use serde::{Deserialize, Serialize};

/// Per-instance anomaly probability: logits [b, k, t] → scores [b, t].
pub fn anomaly_scores<B: Backend>(logits: Tensor<B, 3>, anomaly_class: usize) -> Result<Tensor<B, 2>> {
    let [b, k, t] = logits.dims();
    ensure!(
        anomaly_class < k,
        "Anomaly class {anomaly_class} is out of range for {k} classes"
    );

    // A single-logit head is read as a binary detector
    let probs = if k == 1 { sigmoid(logits) } else { softmax(logits, 1) };
    Ok(probs
        .slice([0..b, anomaly_class..anomaly_class + 1, 0..t])
        .reshape([b, t]))
}

/// MIL bag score: the most anomalous instance decides. [b, t] → [b]
pub fn bag_scores<B: Backend>(scores: Tensor<B, 2>) -> Tensor<B, 1> {
    let [b, _] = scores.dims();
    scores.max_dim(1).reshape([b])
}

/// Host-side summary of one scored clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipReport {
    pub frame_scores: Vec<f32>,
    pub bag_score:    f32,
    pub peak_frame:   usize,
}

impl ClipReport {
    pub fn from_scores(frame_scores: Vec<f32>) -> Result<Self> {
        let (peak_frame, bag_score) = frame_scores
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .ok_or_else(|| anyhow!("Cannot summarise a clip with no frames"))?;
        Ok(Self { frame_scores, bag_score, peak_frame })
    }

    /// One report per clip in a [b, t] score tensor.
    pub fn from_batch<B: Backend>(scores: Tensor<B, 2>) -> Result<Vec<Self>> {
        let [_, t] = scores.dims();
        let bags = bag_scores(scores.clone())
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read bag scores back from the device: {e:?}"))?;
        let flat = scores
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read scores back from the device: {e:?}"))?;

        flat.chunks(t.max(1))
            .zip(bags)
            .map(|(clip, bag)| {
                let report = Self::from_scores(clip.to_vec())?;
                Ok::<_, anyhow::Error>(Self { bag_score: bag, ..report })
            })
            .collect()
    }

    pub fn is_anomalous(&self, threshold: f32) -> bool {
        self.bag_score >= threshold
    }
}
