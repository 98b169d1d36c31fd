// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// The three failure classes the harness distinguishes.
// Everything else (I/O, serialisation, recorder failures) travels
// as a plain anyhow::Error with context attached.
//
// Functions across the crate return anyhow::Result. These typed
// errors are raised into anyhow and can be recovered with
// `err.downcast_ref::<HarnessError>()` by whoever needs to branch
// on the failure class (the sweep enumerator, tests).
//
// Reference: Rust Book §9 (Error Handling)

use std::fmt;

use crate::domain::hyperparams::RunKey;

#[derive(Debug)]
pub enum HarnessError {
    /// Unknown model tag, missing variant field, or an invalid value.
    /// Fatal for the configuration; retrying cannot help.
    Configuration(String),

    /// A token stream or layout too short to produce a single window.
    DegenerateInput(String),

    /// A reload was attempted for a run that never saved a checkpoint.
    /// The cycle controller saves on the first finite validation loss,
    /// so this means every epoch of the run evaluated to NaN.
    CheckpointNotFound { key: RunKey, path: String },
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg)  => write!(f, "configuration error: {msg}"),
            Self::DegenerateInput(msg) => write!(f, "degenerate input: {msg}"),
            Self::CheckpointNotFound { key, path } => {
                write!(f, "no checkpoint for {key} at '{path}'")
            }
        }
    }
}

impl std::error::Error for HarnessError {}

impl HarnessError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateInput(msg.into())
    }
}
