// ============================================================
// Layer 5 — LSTM Language Model ("lstm")
// ============================================================
//   ids [n, w] → embedding → dropout
//              → L × (LSTM → dropout)
//              → hidden state at the last step → Linear → logits
//
// Every layer keeps width = dimension. The gates keep burn's own
// initialisation; only the embedding and the output head are reset
// by initialize_weights.
//
// Reference: Hochreiter & Schmidhuber (1997) Long Short-Term Memory

use burn::{
    nn::{
        lstm::{Lstm, LstmConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::ml::model::{last_position, no_aux, normal_embedding, xavier_linear, LanguageModel, ModelOutput};

#[derive(Config, Debug)]
pub struct LstmLmConfig {
    pub vocab_size: usize,
    pub d_model:    usize,
    pub num_layers: usize,
    pub dropout:    f64,
}

impl LstmLmConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LstmLm<B> {
        LstmLm {
            embedding: EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            layers:    (0..self.num_layers)
                .map(|_| LstmConfig::new(self.d_model, self.d_model, true).init(device))
                .collect(),
            lm_head:   LinearConfig::new(self.d_model, self.vocab_size).init(device),
            dropout:   DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct LstmLm<B: Backend> {
    pub embedding: Embedding<B>,
    pub layers:    Vec<Lstm<B>>,
    pub lm_head:   Linear<B>,
    pub dropout:   Dropout,
}

impl<B: Backend> LanguageModel<B> for LstmLm<B> {
    fn forward(&self, inputs: Tensor<B, 2, Int>) -> ModelOutput<B> {
        let device = inputs.device();

        let mut x = self.dropout.forward(self.embedding.forward(inputs));
        for layer in &self.layers {
            let (output, _state) = layer.forward(x, None);
            x = self.dropout.forward(output);
        }

        ModelOutput {
            logits: self.lm_head.forward(last_position(x)),
            aux:    no_aux(&device),
        }
    }

    fn initialize_weights(mut self) -> Self {
        self.embedding = normal_embedding(self.embedding);
        self.lm_head   = xavier_linear(self.lm_head);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::random::backend_guard;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn test_forward_shapes() {
        let _backend = backend_guard();
        let device = Default::default();
        let model  = LstmLmConfig::new(25, 12, 2, 0.1).init::<B>(&device).initialize_weights();
        let inputs = Tensor::<B, 1, Int>::arange(0..10, &device).reshape([2, 5]);
        let out    = model.forward(inputs);
        assert_eq!(out.logits.dims(), [2, 25]);
    }

    #[test]
    fn test_layer_count() {
        let _backend = backend_guard();
        let model = LstmLmConfig::new(5, 4, 3, 0.0).init::<B>(&Default::default());
        assert_eq!(model.layers.len(), 3);
    }
}
