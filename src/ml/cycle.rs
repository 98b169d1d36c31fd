// ============================================================
// Layer 5 — Training Cycle Controller
// ============================================================
// Runs one full configuration: N epochs, best-checkpoint tracking,
// reload, final metrics.
//
//   ┌──────────┐   ┌────────────┐  improved   ┌──────────────┐
//   │ Training │──▶│ Evaluating │────────────▶│ Checkpointed │
//   └──────────┘   └────────────┘             └──────────────┘
//        ▲               │ not improved              │
//        └───────────────┴───────────────────────────┘
//                        │ last epoch
//                        ▼
//                 ┌────────────┐   ┌──────┐
//                 │ Finalizing │──▶│ Done │
//                 └────────────┘   └──────┘
//
// Best-checkpoint rule: save when the validation loss is STRICTLY
// lower than every earlier epoch's. The tracker starts at +∞, so
// epoch 1 always saves unless its loss is NaN. A cycle that never
// saved fails with CheckpointNotFound, even when an older run left a
// file under the same key.
//
// Finalizing reloads the saved parameters, so the reported numbers
// belong to the best epoch and not to the last one.
//
// Reference: Burn Book §5 (Training), Kingma & Ba (2015) Adam

use std::{fmt, time::Instant};

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{decay::WeightDecayConfig, AdamConfig},
    tensor::backend::AutodiffBackend,
};

use crate::data::{batcher::WindowBatcher, dataset::WindowedDataset};
use crate::domain::{
    error::HarnessError,
    hyperparams::{HyperParams, RunKey},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, FinalMetrics, MetricsLogger},
    random::RandomContext,
};
use crate::ml::{
    evaluator::evaluate,
    model::LanguageModel,
    schedule::LrScheduler,
    trainer::{train_epoch, TrainOptions},
};

// ─── CyclePhase ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Training,
    Evaluating,
    Checkpointed,
    Finalizing,
    Done,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CyclePhase::Training     => "training",
            CyclePhase::Evaluating   => "evaluating",
            CyclePhase::Checkpointed => "checkpointed",
            CyclePhase::Finalizing   => "finalizing",
            CyclePhase::Done         => "done",
        };
        f.write_str(name)
    }
}

// ─── BestTracker ──────────────────────────────────────────────────────────────
/// Lowest validation loss seen so far and the epoch it came from.
#[derive(Debug, Clone)]
pub struct BestTracker {
    best_loss:  f64,
    best_epoch: Option<usize>,
}

impl Default for BestTracker {
    fn default() -> Self {
        Self { best_loss: f64::INFINITY, best_epoch: None }
    }
}

impl BestTracker {
    /// Record an epoch's loss. True when it strictly improves on
    /// every earlier one; ties and NaN never improve.
    pub fn observe(&mut self, epoch: usize, loss: f64) -> bool {
        if loss < self.best_loss {
            self.best_loss  = loss;
            self.best_epoch = Some(epoch);
            true
        } else {
            false
        }
    }

    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }
}

// ─── CycleContext / CycleReport ───────────────────────────────────────────────
/// Everything a cycle reads but does not own.
pub struct CycleContext<'a> {
    pub params:      &'a HyperParams,
    pub data:        &'a WindowedDataset,
    pub checkpoints: &'a CheckpointManager,
    pub metrics:     &'a MetricsLogger,
    pub key:         &'a RunKey,
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub key:             RunKey,
    pub best_epoch:      Option<usize>,
    pub best_valid_loss: f64,
    pub history:         Vec<EpochMetrics>,
    pub final_metrics:   FinalMetrics,
}

impl CycleReport {
    /// The scalar a sweep minimises: test loss of the reloaded best model
    pub fn objective(&self) -> f64 {
        self.final_metrics.test.loss
    }
}

// ─── train_cycle ──────────────────────────────────────────────────────────────
pub fn train_cycle<B, M>(
    model:  M,
    ctx:    &CycleContext<'_>,
    rng:    &mut RandomContext,
    device: &B::Device,
) -> Result<CycleReport>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + LanguageModel<B>,
    M::InnerModule: LanguageModel<B::InnerBackend>,
{
    let params = ctx.params;
    let window = params.window;

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update, with L2 weight decay folded into g)
    let mut optim = AdamConfig::new()
        .with_epsilon(params.epsilon as f32)
        .with_weight_decay(Some(WeightDecayConfig::new(params.weight_decay as f32)))
        .init::<B, M>();
    let mut scheduler = LrScheduler::from_params(params);

    // Training runs on the autodiff backend, evaluation on the inner one
    let train_batcher = WindowBatcher::<B>::new(device.clone());
    let eval_batcher  = WindowBatcher::<B::InnerBackend>::new(device.clone());
    let train_loss_fn = CrossEntropyLossConfig::new().init::<B>(device);
    let eval_loss_fn  = CrossEntropyLossConfig::new().init::<B::InnerBackend>(device);

    let options = TrainOptions {
        window,
        grad_clip:  params.grad_clip,
        print_iter: params.print_iter,
    };

    let mut model   = model;
    let mut tracker = BestTracker::default();
    let mut history = Vec::with_capacity(params.epochs);

    tracing::info!(
        "Cycle {} | {} epochs | {} training windows × {} columns",
        ctx.key, params.epochs, ctx.data.train.num_windows(window), ctx.data.columns(),
    );

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=params.epochs {
        let start = Instant::now();

        tracing::info!(phase = %CyclePhase::Training, "Epoch {}/{}", epoch, params.epochs);
        let (trained, train_loss) = train_epoch(
            model, &ctx.data.train, &mut optim, &train_loss_fn,
            &mut scheduler, &options, rng, &train_batcher,
        )?;
        model = trained;

        tracing::debug!(phase = %CyclePhase::Evaluating, "Epoch {}/{}", epoch, params.epochs);
        let valid = evaluate(&model.valid(), &ctx.data.valid, &eval_loss_fn, window, &eval_batcher)?;

        let improved = tracker.observe(epoch, valid.loss);
        if improved {
            ctx.checkpoints.save_model::<B, M>(&model, ctx.key)?;
            tracing::info!(
                phase = %CyclePhase::Checkpointed,
                "New best validation loss {:.4} at epoch {}", valid.loss, epoch,
            );
        }

        let elapsed = start.elapsed();
        let metrics = EpochMetrics {
            epoch,
            train_loss,
            valid,
            learning_rate: scheduler.lr(),
            improved,
            elapsed_secs: elapsed.as_secs_f64(),
        };
        ctx.metrics.log_epoch(&metrics)?;

        let secs = elapsed.as_secs();
        println!("Epoch: {:02} | Time: {}m {}s", epoch, secs / 60, secs % 60);
        println!("\tTrain Loss: {:.3} | Train ppl: {:.3}", train_loss, train_loss.exp());
        println!(
            "\t Val. Loss: {:.3} |  Val. ppl: {:.3} | Val. Accuracy: {:.3}",
            valid.loss, valid.perplexity(), valid.accuracy,
        );

        history.push(metrics);
    }

    // ── Finalizing: reload the best epoch ─────────────────────────────────────
    // A file under this key from an earlier run must not stand in for
    // a cycle that never saved
    if tracker.best_epoch().is_none() {
        return Err(HarnessError::CheckpointNotFound {
            key:  ctx.key.clone(),
            path: ctx.checkpoints.model_path(ctx.key).display().to_string(),
        }
        .into());
    }

    tracing::info!(phase = %CyclePhase::Finalizing, "Reloading best checkpoint for {}", ctx.key);
    let model = ctx.checkpoints.load_model::<B, M>(model, ctx.key, device)?;
    let inner = model.valid();

    let final_metrics = FinalMetrics {
        valid: evaluate(&inner, &ctx.data.valid, &eval_loss_fn, window, &eval_batcher)?,
        test:  evaluate(&inner, &ctx.data.test,  &eval_loss_fn, window, &eval_batcher)?,
    };
    ctx.metrics.append_final(&final_metrics)?;

    println!("FINAL TRAINED MODEL STATS:");
    println!("\t{}", final_metrics.summary());
    tracing::info!(phase = %CyclePhase::Done, "Cycle {} finished: test loss {:.4}", ctx.key, final_metrics.test.loss);

    Ok(CycleReport {
        key:             ctx.key.clone(),
        best_epoch:      tracker.best_epoch(),
        best_valid_loss: tracker.best_loss(),
        history,
        final_metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::nn::{Linear, LinearConfig};
    use burn::prelude::*;
    use serde_json::json;

    use crate::data::dataset::TokenSplits;
    use crate::infra::random::backend_guard;
    use crate::ml::model::{no_aux, ModelOutput};
    use crate::ml::models::lstm::{LstmLm, LstmLmConfig};

    type B = Autodiff<NdArray>;

    #[test]
    fn test_tracker_strict_improvement_only() {
        let mut t = BestTracker::default();
        assert!(t.observe(1, 3.0));
        assert!(!t.observe(2, 3.0));
        assert!(t.observe(3, 2.5));
        assert!(!t.observe(4, f64::NAN));
        assert!(!t.observe(5, 2.9));
        assert_eq!(t.best_epoch(), Some(3));
        assert_eq!(t.best_loss(), 2.5);
    }

    #[test]
    fn test_tracker_nan_never_saves() {
        let mut t = BestTracker::default();
        assert!(!t.observe(1, f64::NAN));
        assert_eq!(t.best_epoch(), None);
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(CyclePhase::Checkpointed.to_string(), "checkpointed");
    }

    fn motif(len: usize, offset: usize) -> Vec<u32> {
        (0..len).map(|i| 3 + ((i + offset) % 5) as u32).collect()
    }

    fn cycle_params(epochs: usize) -> HyperParams {
        HyperParams::from_value(json!({
            "model": "lstm", "dimension": 8, "layers": 1, "window": 2,
            "epochs": epochs, "restart_epochs": 50, "dropout": 0.0, "lr": 0.01,
            "lr_sched": "cos", "wd": 0.0, "eps": 1e-8, "batch_size": 2,
            "max_grad_norm": 5.0, "print_iter": 0
        }))
        .unwrap()
    }

    fn cycle_data(params: &HyperParams) -> WindowedDataset {
        let splits = TokenSplits {
            train:      motif(201, 0),
            valid:      motif(41, 1),
            test:       motif(41, 2),
            pad_token:  0,
            vocab_size: 8,
        };
        WindowedDataset::build(&splits, params.effective_batch(), params.window).unwrap()
    }

    /// Finite weights, NaN logits: every loss it produces is NaN
    #[derive(Module, Debug)]
    struct Diverged<B: Backend> {
        head: Linear<B>,
    }

    impl<B: Backend> LanguageModel<B> for Diverged<B> {
        fn forward(&self, inputs: Tensor<B, 2, Int>) -> ModelOutput<B> {
            let [n, _] = inputs.dims();
            let device = inputs.device();
            let logits = self.head.forward(Tensor::ones([n, 1], &device)).mul_scalar(f32::NAN);
            ModelOutput { logits, aux: no_aux(&device) }
        }

        fn initialize_weights(self) -> Self {
            self
        }
    }

    #[test]
    fn test_cycle_without_a_save_ignores_older_checkpoint() {
        let _backend = backend_guard();
        let dir      = tempfile::tempdir().unwrap();
        let device   = Default::default();

        let params      = cycle_params(2);
        let key         = params.run_key(9);
        let data        = cycle_data(&params);
        let checkpoints = CheckpointManager::new(dir.path()).unwrap();
        let metrics     = MetricsLogger::new(dir.path(), &key).unwrap();

        // left behind by an earlier run under the same (model, seed)
        let stale = Diverged::<B> { head: LinearConfig::new(1, 8).init(&device) };
        checkpoints.save_model::<B, _>(&stale, &key).unwrap();

        let ctx = CycleContext {
            params: &params, data: &data, checkpoints: &checkpoints, metrics: &metrics, key: &key,
        };
        let model   = Diverged::<B> { head: LinearConfig::new(1, 8).init(&device) };
        let mut rng = RandomContext::new(9);
        let err     = train_cycle::<B, _>(model, &ctx, &mut rng, &device).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<HarnessError>(),
            Some(HarnessError::CheckpointNotFound { .. })
        ));
        let results = std::fs::read_to_string(metrics.results_path()).unwrap_or_default();
        assert!(results.is_empty());
    }

    #[test]
    fn test_cycle_reports_best_epoch() {
        let _backend = backend_guard();
        let dir      = tempfile::tempdir().unwrap();
        let device   = Default::default();

        let params      = cycle_params(3);
        let key         = params.run_key(5);
        let data        = cycle_data(&params);
        let checkpoints = CheckpointManager::new(dir.path()).unwrap();
        let metrics     = MetricsLogger::new(dir.path(), &key).unwrap();
        let ctx = CycleContext {
            params: &params, data: &data, checkpoints: &checkpoints, metrics: &metrics, key: &key,
        };

        let model: LstmLm<B> = LstmLmConfig::new(8, 8, 1, 0.0).init(&device).initialize_weights();
        let mut rng = RandomContext::new(5);
        let report  = train_cycle::<B, _>(model, &ctx, &mut rng, &device).unwrap();

        // improved flags follow the running minimum
        assert_eq!(report.history.len(), 3);
        let mut running = f64::INFINITY;
        for m in &report.history {
            assert_eq!(m.improved, m.valid.loss < running);
            running = running.min(m.valid.loss);
        }
        assert!(report.history[0].improved);

        // the reloaded model is the best epoch's model
        let best = report.best_epoch.unwrap();
        assert_eq!(report.best_valid_loss, running);
        let best_loss = report.history[best - 1].valid.loss;
        assert!((report.final_metrics.valid.loss - best_loss).abs() < 1e-9);
        assert_eq!(report.objective(), report.final_metrics.test.loss);

        assert!(checkpoints.exists(&key));
        let results = std::fs::read_to_string(metrics.results_path()).unwrap();
        assert_eq!(results.lines().count(), 1);
        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 4);
    }
}
