// ============================================================
// Layer 4 — Windowed Dataset
// ============================================================
// The token streams of the three splits, and the same streams laid
// out for one (columns, window) pair. The layout is built once per
// pair and shared read-only by every cycle that trains on it.
//
// Reference: Burn Book §4 (Datasets)

use anyhow::{Context, Result};

use crate::data::windower::{batchify, WindowLayout};

/// Output of a dataset provider: three ordered token streams over one
/// vocabulary built from the training split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSplits {
    pub train:      Vec<u32>,
    pub valid:      Vec<u32>,
    pub test:       Vec<u32>,
    pub pad_token:  u32,
    pub vocab_size: usize,
}

impl TokenSplits {
    pub fn total_tokens(&self) -> usize {
        self.train.len() + self.valid.len() + self.test.len()
    }
}

/// The three splits windowed for one (columns, window) pair.
/// Built once and shared read-only by every cycle that uses it.
#[derive(Debug, Clone)]
pub struct WindowedDataset {
    pub train:      WindowLayout,
    pub valid:      WindowLayout,
    pub test:       WindowLayout,
    pub vocab_size: usize,
    pub window:     usize,
}

impl WindowedDataset {
    pub fn build(splits: &TokenSplits, columns: usize, window: usize) -> Result<Self> {
        let layout = |name: &str, stream: &[u32]| {
            batchify(stream, columns, window, splits.pad_token)
                .with_context(|| format!("Cannot window the {name} split"))
        };

        let dataset = Self {
            train:      layout("train", &splits.train)?,
            valid:      layout("validation", &splits.valid)?,
            test:       layout("test", &splits.test)?,
            vocab_size: splits.vocab_size,
            window,
        };

        tracing::info!(
            "Windowed dataset: {} / {} / {} windows (train / valid / test), {} columns",
            dataset.train.num_windows(window),
            dataset.valid.num_windows(window),
            dataset.test.num_windows(window),
            columns,
        );
        Ok(dataset)
    }

    pub fn columns(&self) -> usize {
        self.train.columns()
    }
}
