// ============================================================
// Layer 6 — Clip Sources
// ============================================================
// Two ClipSource implementations:
//
//   RawClipReader — a headerless file of little-endian f32
//                   values in (batch, channel, time, height,
//                   width) order, e.g. dumped from a decoder
//   SyntheticClip — seeded uniform noise in [0, 1)
//
// Decoding real video containers is not handled here.

use anyhow::{ensure, Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{fs, path::PathBuf};

use crate::domain::{clip::ClipShape, traits::ClipSource};

pub struct RawClipReader {
    path: PathBuf,
}

impl RawClipReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ClipSource for RawClipReader {
    fn load(&self, shape: &ClipShape) -> Result<Vec<f32>> {
        let bytes = fs::read(&self.path)
            .with_context(|| format!("Cannot read clip '{}'", self.path.display()))?;

        ensure!(
            bytes.len() % 4 == 0,
            "Clip '{}' is {} bytes, not a whole number of f32 values",
            self.path.display(),
            bytes.len()
        );
        let count = bytes.len() / 4;
        ensure!(
            count == shape.num_elements(),
            "Clip '{}' holds {} values but shape {} needs {}",
            self.path.display(),
            count,
            shape,
            shape.num_elements()
        );

        Ok(bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    fn describe(&self) -> String {
        format!("raw clip '{}'", self.path.display())
    }
}

pub struct SyntheticClip {
    seed: u64,
}

impl SyntheticClip {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl ClipSource for SyntheticClip {
    fn load(&self, shape: &ClipShape) -> Result<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        Ok((0..shape.num_elements()).map(|_| rng.gen::<f32>()).collect())
    }

    fn describe(&self) -> String {
        format!("synthetic clip (seed {})", self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_raw(path: &std::path::Path, values: &[f32]) {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_reads_little_endian_values() {
        let tmp   = tempfile::tempdir().unwrap();
        let path  = tmp.path().join("clip.f32");
        let shape = ClipShape::new(1, 1, 2, 1, 2);
        write_raw(&path, &[0.0, 0.25, -1.5, 3.0]);

        let values = RawClipReader::new(&path).load(&shape).unwrap();
        assert_eq!(values, vec![0.0, 0.25, -1.5, 3.0]);
    }

    #[test]
    fn test_wrong_element_count_rejected() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("clip.f32");
        write_raw(&path, &[1.0, 2.0, 3.0]);

        let err = RawClipReader::new(&path)
            .load(&ClipShape::new(1, 1, 1, 2, 2))
            .unwrap_err();
        assert!(err.to_string().contains("needs 4"));
    }

    #[test]
    fn test_truncated_file_rejected() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("clip.f32");
        fs::write(&path, [0u8; 6]).unwrap();
        assert!(RawClipReader::new(&path).load(&ClipShape::new(1, 1, 1, 1, 1)).is_err());
    }

    #[test]
    fn test_missing_file_rejected() {
        let reader = RawClipReader::new("/nonexistent/clip.f32");
        assert!(reader.load(&ClipShape::new(1, 1, 1, 1, 1)).is_err());
    }

    #[test]
    fn test_synthetic_is_seeded_and_in_range() {
        let shape = ClipShape::new(1, 3, 2, 4, 4);
        let a = SyntheticClip::new(7).load(&shape).unwrap();
        let b = SyntheticClip::new(7).load(&shape).unwrap();
        let c = SyntheticClip::new(8).load(&shape).unwrap();
        assert_eq!(a.len(), shape.num_elements());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|v| (0.0..1.0).contains(v)));
    }
}
