// ============================================================
// Layer 5 — Training Epoch
// ============================================================
// One pass over every window position of the training layout.
//
// Per step (one window position = one batch of C columns):
//   1. forward        logits = model(context)          [C, vocab]
//   2. loss           mean cross-entropy vs next token
//   3. backward       fresh gradients; burn never accumulates
//                     across backward() calls, so nothing to zero
//   4. clip           global norm ≤ grad_clip (skipped when 0)
//   5. Adam update    model = optim.step(lr, model, grads)
//   6. schedule step  once per optimizer step
//
// Positions are visited in a fresh random order each epoch, drawn
// from the run's RandomContext, so a seeded run replays exactly.
//
// Key burn insight:
//   - Training uses the Autodiff backend for gradients
//   - optim.step CONSUMES the model and returns the updated one,
//     hence the `model = ...` rebinding inside the loop
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLoss,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{
    batcher::WindowBatcher,
    windower::{get_batch_s2s, WindowLayout},
};
use crate::domain::error::HarnessError;
use crate::infra::random::RandomContext;
use crate::ml::{clip::clip_grad_norm, model::LanguageModel, schedule::LrScheduler};

/// Per-run knobs of the epoch loop
#[derive(Debug, Clone, Copy)]
pub struct TrainOptions {
    pub window:     usize,
    /// Global gradient-norm threshold; 0 disables clipping
    pub grad_clip:  f64,
    /// Log progress every N steps; 0 disables
    pub print_iter: usize,
}

/// Train for one epoch. Returns the updated model and the mean
/// training loss over all steps.
#[allow(clippy::too_many_arguments)]
pub fn train_epoch<B, M, O>(
    mut model: M,
    layout:    &WindowLayout,
    optim:     &mut O,
    loss_fn:   &CrossEntropyLoss<B>,
    scheduler: &mut LrScheduler,
    options:   &TrainOptions,
    rng:       &mut RandomContext,
    batcher:   &WindowBatcher<B>,
) -> Result<(M, f64)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + LanguageModel<B>,
    O: Optimizer<M, B>,
{
    let n_steps = layout.num_windows(options.window);
    if n_steps == 0 {
        return Err(HarnessError::degenerate(format!(
            "training layout has {} rows; need more than window = {}",
            layout.rows(), options.window
        ))
        .into());
    }

    let mut loss_sum = 0.0f64;

    for (step, idx) in rng.shuffled_indices(n_steps).into_iter().enumerate() {
        let batch  = batcher.batch(&get_batch_s2s(layout, idx, options.window));
        let output = model.forward(batch.inputs);

        let loss = loss_fn.forward(output.logits, batch.targets);
        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
        loss_sum += loss_val;

        // Gradients, optional global-norm clip, then the optimizer step
        let grads = loss.backward();
        let mut grads = GradientsParams::from_grads(grads, &model);
        if options.grad_clip > 0.0 {
            clip_grad_norm::<B, M>(&model, &mut grads, options.grad_clip);
        }
        model = optim.step(scheduler.lr(), model, grads);
        scheduler.step();

        if options.print_iter > 0 && (step + 1) % options.print_iter == 0 {
            tracing::debug!(
                "  step {:>6}/{} | loss={:.4} | running_avg={:.4} | lr={:.3e}",
                step + 1, n_steps, loss_val, loss_sum / (step + 1) as f64, scheduler.lr(),
            );
        }
    }

    Ok((model, loss_sum / n_steps as f64))
}
