// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The harness only ever consumes token ids. Where they come from
// (local text files, a cached dump, a test fixture) is hidden
// behind TokenSource, so the application layer can run against
// any provider without change.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::data::dataset::TokenSplits;

// ─── TokenSource ──────────────────────────────────────────────────────────────
/// Any component that can produce train/validation/test token streams.
///
/// Implementations:
///   - TextCorpus → plain-text split files + word-level vocabulary
///   - TokenSplits itself → already-tokenised data held in memory
pub trait TokenSource {
    /// Produce the three ordered token streams, the pad id, and the
    /// vocabulary size. The vocabulary must come from the training
    /// split only.
    fn load_splits(&self) -> Result<TokenSplits>;
}

impl TokenSource for TokenSplits {
    fn load_splits(&self) -> Result<TokenSplits> {
        Ok(self.clone())
    }
}
