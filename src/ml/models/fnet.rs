// ============================================================
// Layer 5 — FNet Language Model ("fnet")
// ============================================================
// An encoder whose attention sublayer is replaced by a parameter-free
// 2-D Fourier transform. Only the real part is kept:
//
//   Re(F_seq · X · F_hid) = C_s X C_d − S_s X S_d
//
// with C_n[j,k] = cos(2πjk/n), S_n[j,k] = sin(2πjk/n). Both DFT
// matrices are symmetric, so every product is a plain 2-D matmul
// after a reshape.
//
// Block (post-norm):
//   x = LayerNorm(x + Fourier(x))
//   x = LayerNorm(x + Dropout(FFN(x)))     FFN = Linear → GELU → Linear, width 4·d
//
// Reference: Lee-Thorp et al. (2021) FNet: Mixing Tokens with Fourier Transforms

use std::f64::consts::PI;

use burn::{
    nn::{
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
pub struct FNetLmConfig {
    pub vocab_size: usize,
    pub window:     usize,
    pub d_model:    usize,
    pub num_layers: usize,
    pub dropout:    f64,
}

impl FNetLmConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FNetLm<B> {
        let d_ff = 4 * self.d_model;
        let layers = (0..self.num_layers)
            .map(|_| FourierBlock {
                ffn_linear1: LinearConfig::new(self.d_model, d_ff).init(device),
                ffn_linear2: LinearConfig::new(d_ff, self.d_model).init(device),
                norm1:       LayerNormConfig::new(self.d_model).init(device),
                norm2:       LayerNormConfig::new(self.d_model).init(device),
                dropout:     DropoutConfig::new(self.dropout).init(),
            })
            .collect();

        FNetLm {
            token_embedding:    EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            position_embedding: EmbeddingConfig::new(self.window, self.d_model).init(device),
            layers,
            lm_head:            LinearConfig::new(self.d_model, self.vocab_size).init(device),
            dropout:            DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// Real and imaginary parts of the n-point DFT matrix, as (cos, sin)
fn dft_matrices<B: Backend>(n: usize, device: &B::Device) -> (Tensor<B, 2>, Tensor<B, 2>) {
    let mut cos = Vec::with_capacity(n * n);
    let mut sin = Vec::with_capacity(n * n);
    for j in 0..n {
        for k in 0..n {
            // reduce jk mod n first so large products keep precision
            let angle = 2.0 * PI * ((j * k) % n) as f64 / n as f64;
            cos.push(angle.cos() as f32);
            sin.push(angle.sin() as f32);
        }
    }
    (
        Tensor::from_data(TensorData::new(cos, [n, n]), device),
        Tensor::from_data(TensorData::new(sin, [n, n]), device),
    )
}

/// Re(FFT2(x)) over the (seq, hidden) axes of x: [batch, seq, hidden]
pub fn fourier_mix<B: Backend>(x: Tensor<B, 3>) -> Tensor<B, 3> {
    let [batch, seq, dim] = x.dims();
    let device = x.device();
    let (cos_s, sin_s) = dft_matrices::<B>(seq, &device);
    let (cos_d, sin_d) = dft_matrices::<B>(dim, &device);

    // hidden axis: X·C_d and X·S_d
    let flat = x.reshape([batch * seq, dim]);
    let x_cos = flat.clone().matmul(cos_d).reshape([batch, seq, dim]);
    let x_sin = flat.matmul(sin_d).reshape([batch, seq, dim]);

    // sequence axis: M·Y, computed as (Yᵀ·M)ᵀ since M is symmetric
    let over_seq = |y: Tensor<B, 3>, m: Tensor<B, 2>| {
        y.swap_dims(1, 2)
            .reshape([batch * dim, seq])
            .matmul(m)
            .reshape([batch, dim, seq])
            .swap_dims(1, 2)
    };

    over_seq(x_cos, cos_s) - over_seq(x_sin, sin_s)
}

#[derive(Module, Debug)]
pub struct FourierBlock<B: Backend> {
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> FourierBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = self.norm1.forward(x.clone() + fourier_mix(x));
        let ffn_out = self.ffn_linear2.forward(gelu(self.ffn_linear1.forward(x.clone())));
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct FNetLm<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub layers:             Vec<FourierBlock<B>>,
    pub lm_head:            Linear<B>,
    pub dropout:            Dropout,
}

impl<B: Backend> LanguageModel<B> for FNetLm<B> {
    fn forward(&self, inputs: Tensor<B, 2, Int>) -> ModelOutput<B> {
        let [batch_size, seq_len] = inputs.dims();
        let device = inputs.device();

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let x = self.token_embedding.forward(inputs) + self.position_embedding.forward(positions);

        let mut x = self.dropout.forward(x);
        for layer in &self.layers {
            x = layer.forward(x);
        }

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
