// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Runs a model over EVERY window position of a layout, in order,
// with no parameter updates.
//
//   loss     = mean over positions of the batch-mean cross-entropy
//   accuracy = (# arg-max predictions equal to the target)
//              / (# positions × columns)
//
// Called with `model.valid()`, i.e. the inner (non-autodiff)
// backend: no gradient tape is recorded and dropout is a no-op.
//
// argmax(1) returns [columns, 1], so it is flattened to [columns]
// before comparing with the targets.

use anyhow::Result;
use burn::{nn::loss::CrossEntropyLoss, prelude::*};

use crate::data::{
    batcher::WindowBatcher,
    windower::{get_batch_s2s, WindowLayout},
};
use crate::domain::error::HarnessError;
use crate::infra::metrics::EvalResult;
use crate::ml::model::LanguageModel;

pub fn evaluate<B, M>(
    model:   &M,
    layout:  &WindowLayout,
    loss_fn: &CrossEntropyLoss<B>,
    window:  usize,
    batcher: &WindowBatcher<B>,
) -> Result<EvalResult>
where
    B: Backend,
    M: LanguageModel<B>,
{
    let n_positions = layout.num_windows(window);
    let total       = n_positions * layout.columns();
    if total == 0 {
        return Err(HarnessError::degenerate(format!(
            "evaluation layout of {} rows × {} columns yields no predictions for window = {window}",
            layout.rows(), layout.columns()
        ))
        .into());
    }

    let mut loss_sum = 0.0f64;
    let mut correct  = 0usize;

    for i in 0..n_positions {
        let batch  = batcher.batch(&get_batch_s2s(layout, i, window));
        let output = model.forward(batch.inputs);

        loss_sum += loss_fn
            .forward(output.logits.clone(), batch.targets.clone())
            .into_scalar()
            .elem::<f64>();

        let predicted = output.logits.argmax(1).flatten::<1>(0, 1);
        let hits: i64 = predicted
            .equal(batch.targets)
            .int().sum().into_scalar().elem::<i64>();
        correct += hits as usize;
    }

    Ok(EvalResult {
        loss:     loss_sum / n_positions as f64,
        accuracy: correct as f64 / total as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::random::backend_guard;
    use burn::{
        backend::NdArray,
        module::Param,
        nn::{loss::CrossEntropyLossConfig, Embedding, EmbeddingConfig},
    };

    use crate::data::windower::batchify;
    use crate::ml::model::{last_position, no_aux, ModelOutput};

    type B = NdArray;

    const VOCAB: usize = 5;

    /// Scores token t+1 (mod vocab) highest after seeing token t.
    #[derive(Module, Debug)]
    struct Successor<B: Backend> {
        table: Embedding<B>,
    }

    impl Successor<B> {
        fn new(device: &<B as Backend>::Device) -> Self {
            let mut scores = vec![0.0f32; VOCAB * VOCAB];
            for t in 0..VOCAB {
                scores[t * VOCAB + (t + 1) % VOCAB] = 10.0;
            }
            let mut table = EmbeddingConfig::new(VOCAB, VOCAB).init(device);
            table.weight = Param::from_tensor(Tensor::from_data(
                TensorData::new(scores, [VOCAB, VOCAB]),
                device,
            ));
            Self { table }
        }
    }

    impl<B: Backend> LanguageModel<B> for Successor<B> {
        fn forward(&self, inputs: Tensor<B, 2, Int>) -> ModelOutput<B> {
            let device = inputs.device();
            ModelOutput {
                logits: last_position(self.table.forward(inputs)),
                aux:    no_aux(&device),
            }
        }

        fn initialize_weights(self) -> Self {
            self
        }
    }

    /// s[t] = (t + 1) mod vocab: every window, lead-ins included,
    /// ends one step before its target
    fn successor_stream(len: usize) -> Vec<u32> {
        (0..len).map(|t| ((t + 1) % VOCAB) as u32).collect()
    }

    fn run(model: &Successor<B>, layout: &WindowLayout, window: usize) -> Result<EvalResult> {
        let device = Default::default();
        evaluate(
            model,
            layout,
            &CrossEntropyLossConfig::new().init(&device),
            window,
            &WindowBatcher::<B>::new(device),
        )
    }

    #[test]
    fn test_perfect_predictor_scores_one() {
        let _backend = backend_guard();
        let device = Default::default();
        let layout = batchify(&successor_stream(61), 3, 2, 0).unwrap();
        let result = run(&Successor::new(&device), &layout, 2).unwrap();
        assert_eq!(result.accuracy, 1.0);
        assert!(result.loss < 0.01);
    }

    #[test]
    fn test_shifted_stream_scores_zero() {
        let _backend = backend_guard();
        // Every target is two steps ahead, so the successor is always wrong
        let device = Default::default();
        let stream: Vec<u32> = (0..61).map(|t| ((2 * t + 2) % VOCAB) as u32).collect();
        let layout = batchify(&stream, 1, 2, 0).unwrap();
        let result = run(&Successor::new(&device), &layout, 2).unwrap();
        assert_eq!(result.accuracy, 0.0);
        assert!(result.loss > 5.0);
    }

    #[test]
    fn test_window_larger_than_layout_is_degenerate() {
        let _backend = backend_guard();
        let device = Default::default();
        let layout = batchify(&successor_stream(11), 2, 2, 0).unwrap(); // 6 rows
        let err    = run(&Successor::new(&device), &layout, 6).unwrap_err();
        assert!(matches!(err.downcast_ref::<HarnessError>(), Some(HarnessError::DegenerateInput(_))));
    }
}
