// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn framework specific training code.
// The data layer only touches burn to upload tensors; the checkpoint
// store only touches its record types.
//
// What's in this layer:
//
//   model.rs     — The LanguageModel contract every variant fulfils
//                  plus the shared weight-initialisation helpers
//
//   models/      — The four variants: quantum, fnet, transformer, lstm
//
//   factory.rs   — Config → concrete model, dispatched to a ModelTask
//
//   trainer.rs   — One shuffled epoch: forward, loss, backward,
//                  clip, Adam step, schedule step
//
//   evaluator.rs — One ordered, gradient-free pass → loss + accuracy
//
//   cycle.rs     — N epochs with best-checkpoint tracking, reload
//                  and final validation/test metrics
//
//   schedule.rs  — Constant or cosine-with-warm-restarts learning rate
//
//   clip.rs      — Global gradient-norm clipping
//
// Backends:
//   default        Autodiff<NdArray>  (CPU, always available)
//   --features wgpu Autodiff<Wgpu>    (GPU through WebGPU)
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Model capability contract and init helpers
pub mod model;

/// Concrete model variants
pub mod models;

/// Closed-variant model construction
pub mod factory;

/// One training epoch
pub mod trainer;

/// Gradient-free evaluation
pub mod evaluator;

/// Multi-epoch cycle with checkpointing
pub mod cycle;

/// Learning-rate schedules
pub mod schedule;

/// Gradient norm clipping
pub mod clip;

#[cfg(not(feature = "wgpu"))]
pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;

#[cfg(feature = "wgpu")]
pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;
