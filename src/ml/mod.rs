// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn framework code lives in this layer.
//
//   backbone.rs — 2D ResNet applied frame by frame
//                 • time folded into the batch dimension
//                 • optional per-frame classification head
//
//   model.rs    — the MIL network
//                 • sizes the LSTM with a dummy forward pass
//                 • backbone → LSTM → dropout → 1x1 logits conv
//                 • output [batch, num_classes, time]
//
//   scoring.rs  — MIL readout
//                 • per-instance anomaly probabilities
//                 • bag score = max over instances
//
// Reference: Burn Book §3 (Building Blocks)
//            Sultani et al. (2018) Real-world Anomaly Detection
//            in Surveillance Videos

/// Frame-wise 2D ResNet feature extractor
pub mod backbone;

/// 2D ResNet + LSTM + MIL head
pub mod model;

/// Anomaly scores and MIL bag scores
pub mod scoring;
