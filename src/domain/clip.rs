// ============================================================
// Layer 3 — Clip Shape
// ============================================================
// The 5-dimensional layout of a video clip as the model sees it:
//
//   (batch, channel, time, height, width)
//
// e.g. a batch of 4 RGB clips with 36 frames at 224x224 pixels
// is [4, 3, 36, 224, 224].
//
// Reference: Rust Book §5 (Structs and Methods)

use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

const DIM_NAMES: [&str; 5] = ["batch", "channel", "time", "height", "width"];

/// Shape of a batch of video clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipShape {
    pub batch:    usize,
    pub channels: usize,
    pub frames:   usize,
    pub height:   usize,
    pub width:    usize,
}

impl ClipShape {
    pub fn new(batch: usize, channels: usize, frames: usize, height: usize, width: usize) -> Self {
        Self { batch, channels, frames, height, width }
    }

    /// Build a shape from a dimension list such as `[1, 3, 36, 224, 224]`.
    ///
    /// Fails unless there are exactly five dimensions and all are non-zero.
    pub fn from_dims(dims: &[usize]) -> Result<Self> {
        if dims.len() != 5 {
            bail!(
                "Clip shape must have 5 dims (batch, channel, time, height, width), got {} ({:?})",
                dims.len(),
                dims
            );
        }
        for (name, &d) in DIM_NAMES.iter().zip(dims) {
            ensure!(d > 0, "Clip {name} dimension must be positive, got {d}");
        }
        Ok(Self::new(dims[0], dims[1], dims[2], dims[3], dims[4]))
    }

    /// The same clip with a batch of one. Used for the construction-time
    /// dummy forward pass.
    pub fn single(&self) -> Self {
        Self { batch: 1, ..*self }
    }

    /// Number of frames once time is folded into the batch dimension.
    pub fn frame_batch(&self) -> usize {
        self.batch * self.frames
    }

    pub fn dims(&self) -> [usize; 5] {
        [self.batch, self.channels, self.frames, self.height, self.width]
    }

    pub fn num_elements(&self) -> usize {
        self.dims().iter().product()
    }
}

impl fmt::Display for ClipShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dims())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dims_valid() {
        let s = ClipShape::from_dims(&[4, 3, 36, 224, 224]).unwrap();
        assert_eq!(s.batch, 4);
        assert_eq!(s.frames, 36);
        assert_eq!(s.frame_batch(), 144);
        assert_eq!(s.dims(), [4, 3, 36, 224, 224]);
    }

    #[test]
    fn test_wrong_rank_rejected() {
        assert!(ClipShape::from_dims(&[3, 36, 224, 224]).is_err());
        assert!(ClipShape::from_dims(&[1, 1, 3, 36, 224, 224]).is_err());
    }

    #[test]
    fn test_zero_dim_rejected() {
        let err = ClipShape::from_dims(&[1, 3, 0, 224, 224]).unwrap_err();
        assert!(err.to_string().contains("time"));
    }

    #[test]
    fn test_single_forces_batch_of_one() {
        let s = ClipShape::new(8, 3, 16, 112, 112).single();
        assert_eq!(s.dims(), [1, 3, 16, 112, 112]);
    }

    #[test]
    fn test_display() {
        let s = ClipShape::new(1, 3, 4, 32, 32);
        assert_eq!(s.to_string(), "[1, 3, 4, 32, 32]");
        assert_eq!(s.num_elements(), 3 * 4 * 32 * 32);
    }
}
