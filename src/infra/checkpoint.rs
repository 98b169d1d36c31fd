// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Durable key-value store for model parameters, keyed by RunKey
// (model kind, seed).
//
// What gets saved per run:
//   1. lm_<kind>_<seed>.mpk.gz      — parameters of the best epoch so far
//   2. config_<kind>_<seed>.json    — the HyperParams of the run
//
// At most one checkpoint exists per key; every save overwrites it.
// The cycle controller decides WHEN to save (strict improvement of
// the validation loss); this module only knows HOW.
//
// Recorder: NamedMpkGzFileRecorder with FULL precision. The
// compact recorder stores f16, and a reload must reproduce the
// saved parameters bit for bit.
//
// File layout:
//   trained_models/
//     lm_lstm_421337.mpk.gz
//     config_lstm_421337.json
//     ...
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use std::{fs, path::{Path, PathBuf}};

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};

use crate::domain::error::HarnessError;
use crate::domain::hyperparams::{HyperParams, RunKey};

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

const CHECKPOINT_EXTENSION: &str = "mpk.gz";

/// One overwritable checkpoint slot per RunKey under a directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path without extension; the recorder appends `.mpk.gz`
    fn model_stem(&self, key: &RunKey) -> PathBuf {
        self.dir.join(format!("lm_{}", key.stem()))
    }

    pub fn model_path(&self, key: &RunKey) -> PathBuf {
        self.model_stem(key).with_extension(CHECKPOINT_EXTENSION)
    }

    fn config_path(&self, key: &RunKey) -> PathBuf {
        self.dir.join(format!("config_{}.json", key.stem()))
    }

    pub fn exists(&self, key: &RunKey) -> bool {
        self.model_path(key).exists()
    }

    /// Overwrite the checkpoint for `key` with the model's parameters
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, key: &RunKey) -> Result<()> {
        let stem = self.model_stem(key);

        CheckpointRecorder::new()
            .record(model.clone().into_record(), stem.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", stem.display()))?;

        tracing::debug!("Saved checkpoint for {}", key);
        Ok(())
    }

    /// Restore the parameters saved for `key` into `model`.
    ///
    /// Fails with `HarnessError::CheckpointNotFound` when nothing
    /// was ever saved under this key.
    pub fn load_model<B: Backend, M: Module<B>>(
        &self,
        model:  M,
        key:    &RunKey,
        device: &B::Device,
    ) -> Result<M> {
        let path = self.model_path(key);
        if !path.exists() {
            return Err(HarnessError::CheckpointNotFound {
                key:  key.clone(),
                path: path.display().to_string(),
            }
            .into());
        }

        let record = CheckpointRecorder::new()
            .load(self.model_stem(key), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        tracing::debug!("Loaded checkpoint for {}", key);
        Ok(model.load_record(record))
    }

    /// Save the run configuration so the model can be rebuilt later
    pub fn save_config(&self, params: &HyperParams, key: &RunKey) -> Result<()> {
        let path = self.config_path(key);
        let json = serde_json::to_string_pretty(params)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved run config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self, key: &RunKey) -> Result<HyperParams> {
        let path = self.config_path(key);
        let json = fs::read_to_string(&path)
            .with_context(|| format!(
                "Cannot read config from '{}'. Has this run been trained?",
                path.display()
            ))?;
        HyperParams::from_value(serde_json::from_str(&json)?)
    }
}
