// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing clips and model shapes.
// No Burn types and no file I/O in this layer.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Shape of a batch of video clips
pub mod clip;

// Shapes observed during the construction-time dummy pass
pub mod trace;

// Abstractions implemented by the infrastructure layer
pub mod traits;
