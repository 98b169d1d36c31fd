// ============================================================
// Layer 5 — Transformer Language Model ("transformer")
// ============================================================
// Encoder stack over the context window, next-token head on the
// last position:
//
//   ids [n, w] → token emb + position emb → dropout
//              → L × EncoderBlock
//              → LayerNorm → last position → Linear → logits [n, vocab]
//
// Each EncoderBlock (post-norm):
//   x = LayerNorm(x + Dropout(MultiHeadSelfAttention(x)))
//   x = LayerNorm(x + Dropout(FFN(x)))     FFN = Linear → GELU → Linear
//
// The attention is bidirectional inside the window: the model only
// predicts the token AFTER the window, so no position leaks a target.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::gelu,
};

use crate::ml::model::{last_position, no_aux, normal_embedding, xavier_linear, LanguageModel, ModelOutput};

#[derive(Config, Debug)]
pub struct TransformerLmConfig {
    pub vocab_size: usize,
    pub window:     usize,
    pub d_model:    usize,
    pub num_heads:  usize,
    pub num_layers: usize,
    pub dropout:    f64,
}

impl TransformerLmConfig {
    pub fn d_ff(&self) -> usize {
        4 * self.d_model
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerLm<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.window, self.d_model).init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let final_norm = LayerNormConfig::new(self.d_model).init(device);
        let lm_head    = LinearConfig::new(self.d_model, self.vocab_size).init(device);
        let dropout    = DropoutConfig::new(self.dropout).init();
        TransformerLm {
            token_embedding, position_embedding, layers,
            final_norm, lm_head, dropout,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff()).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff(), self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let attn_output = self.self_attn.forward(MhaInput::self_attn(x.clone())).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(gelu(self.ffn_linear1.forward(x.clone())));
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct TransformerLm<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub lm_head:            Linear<B>,
    pub dropout:            Dropout,
}

impl<B: Backend> LanguageModel<B> for TransformerLm<B> {
    /// inputs: [batch, window] → logits: [batch, vocab]
    fn forward(&self, inputs: Tensor<B, 2, Int>) -> ModelOutput<B> {
        let [batch_size, seq_len] = inputs.dims();
        let device = inputs.device();

        let tok_emb = self.token_embedding.forward(inputs);

        // learned position ids 0..w, one row per sequence
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for layer in &self.layers {
            x = layer.forward(x);
        }
        let x = self.final_norm.forward(x); // [batch, seq_len, d_model]

        ModelOutput {
            logits: self.lm_head.forward(last_position(x)),
            aux:    no_aux(&device),
        }
    }

    fn initialize_weights(mut self) -> Self {
        self.token_embedding    = normal_embedding(self.token_embedding);
        self.position_embedding = normal_embedding(self.position_embedding);
        self.layers = self.layers
            .into_iter()
            .map(|mut block| {
                block.ffn_linear1 = xavier_linear(block.ffn_linear1);
                block.ffn_linear2 = xavier_linear(block.ffn_linear2);
                block
            })
            .collect();
        self.lm_head = xavier_linear(self.lm_head);
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
        let model  = TransformerLmConfig::new(30, 4, 16, 2, 2, 0.0)
            .init::<B>(&device)
            .initialize_weights();

        let inputs = Tensor::<B, 1, Int>::arange(0..12, &device).reshape([3, 4]);
        let out    = model.forward(inputs);
        assert_eq!(out.logits.dims(), [3, 30]);
        assert_eq!(out.aux.dims(), [1]);
    }

    #[test]
    fn test_single_token_window() {
        let _backend = backend_guard();
        let device = Default::default();
        let model  = TransformerLmConfig::new(10, 1, 8, 1, 1, 0.0).init::<B>(&device);
        let out    = model.forward(Tensor::<B, 2, Int>::zeros([5, 1], &device));
        assert_eq!(out.logits.dims(), [5, 10]);
    }
}
