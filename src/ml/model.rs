// ============================================================
// Layer 5 — Model Capability Contract
// ============================================================
// What the trainer and evaluator need from ANY model:
//
//   forward(x: [batch, window] Int) → logits [batch, vocab]
//                                     + one auxiliary scalar
//
// The auxiliary scalar is a model-specific diagnostic (the quantum
// variant reports the mean norm of its pre-normalisation state).
// The training loop passes it through untouched.
//
// Parameters are enumerated through burn's Module machinery
// (visit / map / into_record), which is what the optimizer, the
// gradient clipper and the checkpoint store all use.
//
// Reference: Burn Book §3 (Building Blocks)

use burn::{
    module::Param,
    nn::{Embedding, Initializer, Linear},
    prelude::*,
};

/// Forward-pass result of a language model.
#[derive(Debug, Clone)]
pub struct ModelOutput<B: Backend> {
    /// Next-token scores — shape: [batch, vocab]
    pub logits: Tensor<B, 2>,

    /// Model-specific diagnostic — shape: [1]
    pub aux: Tensor<B, 1>,
}

pub trait LanguageModel<B: Backend>: Module<B> {
    fn forward(&self, inputs: Tensor<B, 2, Int>) -> ModelOutput<B>;

    /// Reset dense weights to Xavier-uniform, biases to zero and
    /// embedding tables to N(0, 0.02). Layers outside those three
    /// kinds (LSTM gates, attention projections) keep their own
    /// initialisation.
    fn initialize_weights(self) -> Self;
}

pub fn xavier_linear<B: Backend>(mut linear: Linear<B>) -> Linear<B> {
    let [d_input, d_output] = linear.weight.dims();
    let device = linear.weight.device();

    linear.weight = Initializer::XavierUniform { gain: 1.0 }
        .init_with([d_input, d_output], Some(d_input), Some(d_output), &device);
    linear.bias = linear
        .bias
        .map(|bias| Param::from_tensor(Tensor::zeros(bias.dims(), &device)));
    linear
}

pub fn normal_embedding<B: Backend>(mut embedding: Embedding<B>) -> Embedding<B> {
    let shape  = embedding.weight.dims();
    let device = embedding.weight.device();
    embedding.weight = Initializer::Normal { mean: 0.0, std: 0.02 }.init(shape, &device);
    embedding
}

/// [batch, seq, d] → [batch, d] at the last sequence position
pub fn last_position<B: Backend>(x: Tensor<B, 3>) -> Tensor<B, 2> {
    let [batch, seq, d] = x.dims();
    x.slice([0..batch, seq - 1..seq, 0..d]).reshape([batch, d])
}

/// Zero auxiliary output for models without a diagnostic
pub fn no_aux<B: Backend>(device: &B::Device) -> Tensor<B, 1> {
    Tensor::zeros([1], device)
}
