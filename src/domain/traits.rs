// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The scoring workflow only needs "something that yields the
// pixels of a clip". Two implementations live in Layer 6:
//   - RawClipReader  → raw little-endian f32 file on disk
//   - SyntheticClip  → seeded uniform noise, for smoke runs
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::clip::ClipShape;

// ─── ClipSource ───────────────────────────────────────────────────────────────
/// Any component that can produce clip pixels for a given shape.
pub trait ClipSource {
    /// Return `shape.num_elements()` values laid out as
    /// `(batch, channel, time, height, width)` in row-major order.
    fn load(&self, shape: &ClipShape) -> Result<Vec<f32>>;

    /// Short human-readable origin, used in logs.
    fn describe(&self) -> String;
}
