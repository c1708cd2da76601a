// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: each use case wires the domain,
// ml and infra layers together for one CLI command. Use cases
// are generic over the Burn backend; the CLI picks it.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Build a model and report its shapes
pub mod inspect_use_case;

// Score a clip with a saved model
pub mod score_use_case;

// Replace the classification head of a saved model
pub mod relabel_use_case;
