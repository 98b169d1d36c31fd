// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums and traits describing what a training
// run IS: its configuration, its identity, and the ways it can
// fail.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O beyond reading a config file
//   - NO training logic
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

// Typed failure classes raised through anyhow
pub mod error;

// HyperParams, ModelArch, RunKey
pub mod hyperparams;

// Base templates for the four model variants
pub mod presets;

// The token-source seam between the use cases and the corpus
pub mod traits;
