// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several layers:
//
//   checkpoint.rs      — (model kind, seed)-keyed parameter
//                        snapshots and saved run configs
//
//   metrics.rs         — per-epoch CSV and final results record
//
//   random.rs          — the per-run RandomContext that owns the
//                        general RNG and seeds the backend RNG
//
//   tokenizer_store.rs — word-level vocabulary built from the
//                        training split, saved as tokenizer JSON
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Best-epoch parameters and run configs, keyed by (model, seed)
pub mod checkpoint;

/// Training metrics logging
pub mod metrics;

/// Seeded randomness for one run
pub mod random;

/// Vocabulary building, saving and loading
pub mod tokenizer_store;
