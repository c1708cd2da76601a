// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Disk-facing concerns used by the application layer:
//
//   checkpoint.rs  — model weights (Burn CompactRecorder) and
//                    MilConfig as JSON, so a model can be rebuilt
//                    with the same architecture and reloaded
//
//   clip_reader.rs — ClipSource implementations: raw f32 clip
//                    files and seeded synthetic clips
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Raw and synthetic clip sources
pub mod clip_reader;
