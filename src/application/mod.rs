// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflows over the lower layers: a single training run, a
// sweep of runs, and the re-scoring of a saved run.
//
// Use cases own the artifact directory and the token source. They
// wire the data, model and cycle together but never touch tensors
// or files directly, and they print nothing; the CLI reports.
//
// Reference: Rust Book §7 (Module System)

// One configuration: seed, data, model, cycle
pub mod train_use_case;

// Models × dimensions × seeds
pub mod sweep_use_case;

// Reload a saved run and score it again
pub mod evaluate_use_case;
