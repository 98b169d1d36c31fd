// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Re-scores a finished run without training:
//
//   Step 1: Check the checkpoint exists        (Layer 6 - infra)
//   Step 2: Load the saved run config          (Layer 6 - infra)
//   Step 3: Rebuild the windowed dataset       (Layer 4 - data)
//   Step 4: Rebuild the model, load weights    (Layer 5 - ml)
//   Step 5: Evaluate validation + test splits  (Layer 5 - ml)
//
// The model is built with the same factory the training run used,
// so the saved record always matches the module structure.

use std::path::PathBuf;

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    tensor::backend::{AutodiffBackend, Backend},
};

use crate::data::{batcher::WindowBatcher, dataset::WindowedDataset};
use crate::domain::{error::HarnessError, hyperparams::RunKey, traits::TokenSource};
use crate::infra::{checkpoint::CheckpointManager, metrics::FinalMetrics};
use crate::ml::{
    evaluator::evaluate,
    factory::{create_model, ModelTask},
    model::LanguageModel,
    TrainBackend,
};

// ─── ReloadTask ───────────────────────────────────────────────────────────────
struct ReloadTask<'a, B: AutodiffBackend> {
    data:        &'a WindowedDataset,
    checkpoints: &'a CheckpointManager,
    key:         &'a RunKey,
    device:      &'a B::Device,
}

impl<B: AutodiffBackend> ModelTask<B> for ReloadTask<'_, B> {
    type Output = Result<FinalMetrics>;

    fn run<M>(self, model: M) -> Self::Output
    where
        M: AutodiffModule<B> + LanguageModel<B>,
        M::InnerModule: LanguageModel<B::InnerBackend>,
    {
        let model   = self.checkpoints.load_model::<B, M>(model, self.key, self.device)?;
        let inner   = model.valid();
        let loss_fn = CrossEntropyLossConfig::new().init::<B::InnerBackend>(self.device);
        let batcher = WindowBatcher::<B::InnerBackend>::new(self.device.clone());
        let window  = self.data.window;

        Ok(FinalMetrics {
            valid: evaluate(&inner, &self.data.valid, &loss_fn, window, &batcher)?,
            test:  evaluate(&inner, &self.data.test,  &loss_fn, window, &batcher)?,
        })
    }
}

// ─── EvaluateUseCase ──────────────────────────────────────────────────────────
pub struct EvaluateUseCase<S: TokenSource> {
    source:      S,
    checkpoints: CheckpointManager,
}

impl<S: TokenSource> EvaluateUseCase<S> {
    pub fn new(source: S, artifact_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self { source, checkpoints: CheckpointManager::new(artifact_dir)? })
    }

    pub fn evaluate(&self, key: &RunKey) -> Result<FinalMetrics> {
        // ── Step 1: Nothing to evaluate without a checkpoint ──────────────────
        if !self.checkpoints.exists(key) {
            return Err(HarnessError::CheckpointNotFound {
                key:  key.clone(),
                path: self.checkpoints.model_path(key).display().to_string(),
            }
            .into());
        }

        // ── Steps 2 + 3: Config and data ──────────────────────────────────────
        let params = self.checkpoints.load_config(key)?;
        let splits = self.source.load_splits()?;
        let data   = WindowedDataset::build(&splits, params.effective_batch(), params.window)?;

        // ── Steps 4 + 5: Rebuild, reload, evaluate ────────────────────────────
        tracing::info!("Evaluating saved run {}", key);
        let device = <TrainBackend as Backend>::Device::default();
        let task = ReloadTask::<TrainBackend> {
            data:        &data,
            checkpoints: &self.checkpoints,
            key,
            device:      &device,
        };
        create_model::<TrainBackend, _>(&params, data.vocab_size, &device, task)?
    }
}
