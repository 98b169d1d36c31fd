// ============================================================
// Layer 2 — TrainUseCase (Sweep Driver)
// ============================================================
// Runs ONE configuration end to end and returns the scalar a sweep
// minimises (test loss of the best checkpoint):
//
//   Step 1: Validate, inject a seed if absent    (Layer 3 - domain)
//   Step 2: Seed general + backend RNGs          (Layer 6 - infra)
//   Step 3: Build or reuse the windowed dataset  (Layer 4 - data)
//   Step 4: Save the run config                  (Layer 6 - infra)
//   Step 5: Build the model, initialise weights  (Layer 5 - ml)
//   Step 6: Run the training cycle               (Layer 5 - ml)
//
// Dataset reuse: token streams are loaded once per use case, and
// windowed layouts are cached per (effective batch, window). Sweep
// entries that only differ in model, dimension or seed share them.
//
// Errors are NOT caught here. A failing configuration propagates
// to the caller, and the sweep enumerator decides whether to go on.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use std::{collections::HashMap, path::PathBuf, rc::Rc};

use anyhow::Result;
use burn::{
    module::{AutodiffModule, Module},
    tensor::backend::{AutodiffBackend, Backend},
};

use crate::data::dataset::{TokenSplits, WindowedDataset};
use crate::domain::{hyperparams::HyperParams, traits::TokenSource};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    random::RandomContext,
};
use crate::ml::{
    cycle::{train_cycle, CycleContext, CycleReport},
    factory::{create_model, ModelTask},
    model::LanguageModel,
    TrainBackend,
};

// ─── CycleTask ────────────────────────────────────────────────────────────────
// What the driver does with whichever model the factory builds:
// reset its weights, then hand it to the cycle controller.
struct CycleTask<'a, B: AutodiffBackend> {
    ctx:    CycleContext<'a>,
    rng:    &'a mut RandomContext,
    device: &'a B::Device,
}

impl<B: AutodiffBackend> ModelTask<B> for CycleTask<'_, B> {
    type Output = Result<CycleReport>;

    fn run<M>(self, model: M) -> Self::Output
    where
        M: AutodiffModule<B> + LanguageModel<B>,
        M::InnerModule: LanguageModel<B::InnerBackend>,
    {
        let model = model.initialize_weights();
        tracing::info!("Model has {} parameters", model.num_params());
        train_cycle::<B, M>(model, &self.ctx, self.rng, self.device)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase<S: TokenSource> {
    source:      S,
    checkpoints: CheckpointManager,
    splits:      Option<TokenSplits>,
    datasets:    HashMap<(usize, usize), Rc<WindowedDataset>>,
}

impl<S: TokenSource> TrainUseCase<S> {
    /// `artifact_dir` receives checkpoints, configs, metrics and results.
    pub fn new(source: S, artifact_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            source,
            checkpoints: CheckpointManager::new(artifact_dir)?,
            splits:      None,
            datasets:    HashMap::new(),
        })
    }

    #[cfg(test)]
    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// Number of distinct (columns, window) layouts built so far
    #[cfg(test)]
    pub fn cached_datasets(&self) -> usize {
        self.datasets.len()
    }

    /// Windowed splits for (columns, window), built at most once
    pub fn dataset(&mut self, columns: usize, window: usize) -> Result<Rc<WindowedDataset>> {
        if let Some(dataset) = self.datasets.get(&(columns, window)) {
            tracing::debug!("Reusing windowed dataset for columns={}, window={}", columns, window);
            return Ok(Rc::clone(dataset));
        }

        let splits = match self.splits.take() {
            Some(splits) => splits,
            None => {
                let splits = self.source.load_splits()?;
                tracing::info!(
                    "Loaded {} tokens, vocabulary of {}",
                    splits.total_tokens(), splits.vocab_size,
                );
                splits
            }
        };
        let built = WindowedDataset::build(&splits, columns, window);
        self.splits = Some(splits);

        let dataset = Rc::new(built?);
        self.datasets.insert((columns, window), Rc::clone(&dataset));
        Ok(dataset)
    }

    /// Train and evaluate one configuration; returns the test loss.
    pub fn train_evaluate(&mut self, params: HyperParams) -> Result<f64> {
        Ok(self.run(params)?.objective())
    }

    /// Like `train_evaluate`, with the full cycle report.
    pub fn run(&mut self, params: HyperParams) -> Result<CycleReport> {
        params.validate()?;

        // ── Step 1: Seed injection ────────────────────────────────────────────
        let seed   = params.seed.unwrap_or_else(RandomContext::fresh_seed);
        let params = params.with_seed(seed);
        let key    = params.run_key(seed);
        tracing::info!("Starting run {}", key);

        // ── Step 2: Seed every RNG before anything random happens ─────────────
        let mut rng = RandomContext::seeded::<TrainBackend>(seed);

        // ── Step 3: Windowed dataset ──────────────────────────────────────────
        let data = self.dataset(params.effective_batch(), params.window)?;

        // ── Step 4: Save config for evaluation ────────────────────────────────
        // The evaluate command needs it to rebuild the same architecture
        self.checkpoints.save_config(&params, &key)?;
        let metrics = MetricsLogger::new(self.checkpoints.dir(), &key)?;

        // ── Steps 5 + 6: Build model, run the cycle ───────────────────────────
        let device = <TrainBackend as Backend>::Device::default();
        let task = CycleTask::<TrainBackend> {
            ctx: CycleContext {
                params:      &params,
                data:        &data,
                checkpoints: &self.checkpoints,
                metrics:     &metrics,
                key:         &key,
            },
            rng:    &mut rng,
            device: &device,
        };
        create_model::<TrainBackend, _>(&params, data.vocab_size, &device, task)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::random::backend_guard;
    use serde_json::json;

    use crate::domain::error::HarnessError;

    fn tiny_splits() -> TokenSplits {
        let motif = |len: usize, offset: usize| -> Vec<u32> {
            (0..len).map(|i| 3 + ((i + offset) % 4) as u32).collect()
        };
        TokenSplits {
            train:      motif(161, 0),
            valid:      motif(41, 1),
            test:       motif(41, 2),
            pad_token:  0,
            vocab_size: 7,
        }
    }

    fn tiny_params(seed: Option<u64>) -> HyperParams {
        let mut value = json!({
            "model": "fnet", "dimension": 8, "layers": 1, "window": 2,
            "epochs": 2, "restart_epochs": 100, "dropout": 0.0, "lr": 0.01,
            "wd": 0.0, "eps": 1e-8, "batch_size": 2, "max_grad_norm": 1.0,
            "print_iter": 0
        });
        if let Some(seed) = seed {
            value["seed"] = json!(seed);
        }
        HyperParams::from_value(value).unwrap()
    }

    #[test]
    fn test_objective_is_test_loss_and_config_saved() {
        let _backend = backend_guard();
        let dir        = tempfile::tempdir().unwrap();
        let mut driver = TrainUseCase::new(tiny_splits(), dir.path()).unwrap();

        let report = driver.run(tiny_params(Some(42))).unwrap();
        assert!(report.objective().is_finite());
        assert_eq!(report.key.seed, 42);

        let saved = driver.checkpoints().load_config(&report.key).unwrap();
        assert_eq!(saved.seed, Some(42));
        assert!(driver.checkpoints().exists(&report.key));
    }

    #[test]
    fn test_missing_seed_is_injected_and_recorded() {
        let _backend = backend_guard();
        let dir        = tempfile::tempdir().unwrap();
        let mut driver = TrainUseCase::new(tiny_splits(), dir.path()).unwrap();

        let report = driver.run(tiny_params(None)).unwrap();
        let saved  = driver.checkpoints().load_config(&report.key).unwrap();
        assert_eq!(saved.seed, Some(report.key.seed));
    }

    #[test]
    fn test_same_seed_replays_the_run() {
        let _backend   = backend_guard();
        let dir        = tempfile::tempdir().unwrap();
        let mut driver = TrainUseCase::new(tiny_splits(), dir.path()).unwrap();

        let first  = driver.run(tiny_params(Some(17))).unwrap();
        let second = driver.run(tiny_params(Some(17))).unwrap();

        // wall-clock time is the only field allowed to differ
        let trace = |report: &CycleReport| -> Vec<_> {
            report.history.iter()
                .map(|m| (m.epoch, m.train_loss, m.valid, m.learning_rate, m.improved))
                .collect()
        };
        assert_eq!(trace(&first), trace(&second));
        assert_eq!(first.best_epoch, second.best_epoch);
        assert_eq!(first.final_metrics, second.final_metrics);
    }

    #[test]
    fn test_dataset_reused_for_same_shape() {
        let _backend = backend_guard();
        let dir        = tempfile::tempdir().unwrap();
        let mut driver = TrainUseCase::new(tiny_splits(), dir.path()).unwrap();

        let a = driver.dataset(4, 2).unwrap();
        let b = driver.dataset(4, 2).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        driver.dataset(2, 2).unwrap();
        assert_eq!(driver.cached_datasets(), 2);
    }

    #[test]
    fn test_too_short_stream_is_degenerate() {
        let _backend = backend_guard();
        let dir        = tempfile::tempdir().unwrap();
        let mut splits = tiny_splits();
        splits.valid.truncate(3);
        let mut driver = TrainUseCase::new(splits, dir.path()).unwrap();

        let err = driver.run(tiny_params(Some(1))).unwrap_err();
        assert!(matches!(err.downcast_ref::<HarnessError>(), Some(HarnessError::DegenerateInput(_))));
    }
}
