// ============================================================
// Layer 6 — Random Context
// ============================================================
// One RandomContext per sweep entry owns every source of
// randomness the run touches:
//
//   - a general-purpose StdRng, used for the trainer's shuffles
//   - the tensor backend's RNG (weight init, dropout masks),
//     seeded through Backend::seed
//
// Both are seeded from the same integer, so two runs with the same
// configuration and seed replay the same sequence of shuffles and
// initial weights. The context is passed explicitly to whoever
// needs it; nothing reads an ambient thread-local generator.
//
// Seeds that are not given come from the operating system's
// cryptographically secure source (OsRng).
//
// Reference: rand crate documentation (SeedableRng, SliceRandom)

use burn::tensor::backend::Backend;
use rand::{
    rngs::{OsRng, StdRng},
    seq::SliceRandom,
    Rng, RngCore, SeedableRng,
};

/// Upper bound (exclusive) for seeds drawn for a sweep
pub const SWEEP_SEED_BOUND: u64 = 1_000_000;

pub struct RandomContext {
    rng: StdRng,
}

impl RandomContext {
    /// General-purpose RNG only; the backend is left untouched.
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// Seed the backend RNG as well. Call once per run, before the
    /// model is created.
    pub fn seeded<B: Backend>(seed: u64) -> Self {
        B::seed(seed);
        tracing::debug!("Seeded general and backend RNGs with {}", seed);
        Self::new(seed)
    }

    /// A fresh 32-bit seed from the OS entropy source
    pub fn fresh_seed() -> u64 {
        OsRng.next_u32() as u64
    }

    /// `count` seeds in `0..SWEEP_SEED_BOUND` from the OS entropy source
    pub fn sweep_seeds(count: usize) -> Vec<u64> {
        (0..count).map(|_| OsRng.gen_range(0..SWEEP_SEED_BOUND)).collect()
    }

    /// Uniform permutation of `0..n` (Fisher-Yates)
    pub fn shuffled_indices(&mut self, n: usize) -> Vec<usize> {
        let mut idxs: Vec<usize> = (0..n).collect();
        idxs.shuffle(&mut self.rng);
        idxs
    }
}

/// Serialises tests that draw from the process-wide backend RNG, so
/// a seeded run is not interleaved with another test's weight init.
#[cfg(test)]
pub fn backend_guard() -> std::sync::MutexGuard<'static, ()> {
    static BACKEND_RNG: std::sync::Mutex<()> = std::sync::Mutex::new(());
    BACKEND_RNG.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
