// ============================================================
// Layer 3 — Shape Trace
// ============================================================
// Shapes observed at each stage of the construction-time dummy
// forward pass. Plain data, no tensor types, so it can be
// printed, logged and compared in tests.

use serde::{Deserialize, Serialize};

/// Shapes recorded while sizing the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeTrace {
    /// `[b, c, t, h, w]`
    pub input:       Vec<usize>,
    /// `[b*t, c, h, w]` — time folded into batch for the 2D backbone
    pub frames:      Vec<usize>,
    /// `[b, f, t, h', w']`
    pub backbone:    Vec<usize>,
    /// `[b, t, f*h'*w']`
    pub lstm_input:  Vec<usize>,
    /// `[b, hidden, t]`
    pub lstm_output: Vec<usize>,
    /// `[b, num_classes, t]`
    pub logits:      Vec<usize>,
}

impl ShapeTrace {
    /// Iterate over `(stage name, shape)` pairs in pipeline order.
    pub fn stages(&self) -> [(&'static str, &[usize]); 6] {
        [
            ("Input",           self.input.as_slice()),
            ("Frame batch",     self.frames.as_slice()),
            ("Backbone output", self.backbone.as_slice()),
            ("LSTM input",      self.lstm_input.as_slice()),
            ("LSTM output",     self.lstm_output.as_slice()),
            ("Final layer",     self.logits.as_slice()),
        ]
    }

    pub fn log(&self) {
        for (stage, shape) in self.stages() {
            tracing::info!("{stage} size: {shape:?}");
        }
    }
}
