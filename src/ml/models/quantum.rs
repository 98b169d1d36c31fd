// ============================================================
// Layer 5 — Quantum-Circuit Language Model ("quantum")
// ============================================================
// A classically simulated circuit model. Each token of the window
// owns a small parameterised circuit U_w acting on a real state of
// 2^qubits amplitudes; the model mixes the circuits and reads the
// result out as a probability vector.
//
//   1. Circuit per token
//        angles_w = Linear(embedding(token_w))   [ansatz_layers, D/2]
//        U_w      = ansatz_layers × (Givens rotations on pairs
//                   (2k, 2k+1), then a cyclic shift by one)
//
//   2. Linear combination of unitaries
//        M = Σ_w c_w · U_w               c = lcu_weights / ‖lcu_weights‖₁
//
//   3. Polynomial of degree P = `layers`
//        ψ_0 = |0⟩,  ψ_{k+1} = M ψ_k
//        φ   = Σ_k p_k ψ_k                p = poly_weights / ‖poly_weights‖₁
//
//   4. Readout
//        aux    = mean ‖φ‖ over the batch (success amplitude of the
//                 block encoding, a training diagnostic)
//        probs  = (φ / ‖φ‖)²
//        logits = Linear(Dropout(ReLU(Linear(probs))))
//
// The shift between rotation layers alternates the pairing
// (0,1)(2,3)… with (1,2)(3,4)…(D−1,0), so two layers already couple
// every amplitude with both neighbours.
//
// Reference: Khatri et al. (2024) Quixer: A Quantum Transformer Model
//            Childs & Wiebe (2012) Hamiltonian simulation using LCU

use burn::{
    module::Param,
    nn::{
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::ml::model::{normal_embedding, xavier_linear, LanguageModel, ModelOutput};

const NORM_EPS: f64 = 1e-8;

#[derive(Config, Debug)]
pub struct QuantumLmConfig {
    pub vocab_size:    usize,
    pub window:        usize,
    pub d_model:       usize,
    pub qubits:        usize,
    pub ansatz_layers: usize,
    /// Degree of the polynomial in the LCU operator
    pub degree:        usize,
    pub dropout:       f64,
}

impl QuantumLmConfig {
    pub fn state_dim(&self) -> usize {
        1 << self.qubits
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> QuantumLm<B> {
        let state_dim = self.state_dim();
        let half      = state_dim / 2;

        QuantumLm {
            embedding:     EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            angle_head:    LinearConfig::new(self.d_model, self.ansatz_layers * half).init(device),
            lcu_weights:   Param::from_tensor(Tensor::ones([self.window], device)),
            poly_weights:  Param::from_tensor(Tensor::ones([self.degree + 1], device)),
            readout:       LinearConfig::new(state_dim, self.d_model).init(device),
            lm_head:       LinearConfig::new(self.d_model, self.vocab_size).init(device),
            dropout:       DropoutConfig::new(self.dropout).init(),
            state_dim,
            ansatz_layers: self.ansatz_layers,
            degree:        self.degree,
        }
    }
}

#[derive(Module, Debug)]
pub struct QuantumLm<B: Backend> {
    pub embedding:     Embedding<B>,
    pub angle_head:    Linear<B>,
    pub lcu_weights:   Param<Tensor<B, 1>>,
    pub poly_weights:  Param<Tensor<B, 1>>,
    pub readout:       Linear<B>,
    pub lm_head:       Linear<B>,
    pub dropout:       Dropout,
    pub state_dim:     usize,
    pub ansatz_layers: usize,
    pub degree:        usize,
}

/// w / ‖w‖₁, shape preserved
fn l1_normalise<B: Backend>(w: Tensor<B, 1>) -> Tensor<B, 1> {
    w.clone() / w.abs().sum().add_scalar(NORM_EPS)
}

impl<B: Backend> QuantumLm<B> {
    /// Apply every token's circuit to its own copy of the state.
    ///
    /// state:  [n, w, D]
    /// angles: [n, w, ansatz_layers, D/2]
    fn apply_circuits(&self, state: Tensor<B, 3>, angles: &Tensor<B, 4>) -> Tensor<B, 3> {
        let [n, w, dim] = state.dims();
        let half = dim / 2;

        let mut state = state;
        for layer in 0..self.ansatz_layers {
            let theta = angles
                .clone()
                .slice([0..n, 0..w, layer..layer + 1, 0..half])
                .reshape([n, w, half]);
            let (cos, sin) = (theta.clone().cos(), theta.sin());

            let pairs = state.reshape([n, w, half, 2]);
            let a = pairs.clone().slice([0..n, 0..w, 0..half, 0..1]).reshape([n, w, half]);
            let b = pairs.slice([0..n, 0..w, 0..half, 1..2]).reshape([n, w, half]);

            let new_a = cos.clone() * a.clone() - sin.clone() * b.clone();
            let new_b = sin * a + cos * b;

            let rotated = Tensor::cat(
                vec![new_a.reshape([n, w, half, 1]), new_b.reshape([n, w, half, 1])],
                3,
            )
            .reshape([n, w, dim]);

            // cyclic shift: amplitude i moves to i − 1
            state = Tensor::cat(
                vec![
                    rotated.clone().slice([0..n, 0..w, 1..dim]),
                    rotated.slice([0..n, 0..w, 0..1]),
                ],
                2,
            );
        }
        state
    }
}

impl<B: Backend> LanguageModel<B> for QuantumLm<B> {
    fn forward(&self, inputs: Tensor<B, 2, Int>) -> ModelOutput<B> {
        let [n, w] = inputs.dims();
        let dim    = self.state_dim;
        let device = inputs.device();

        let angles = self
            .angle_head
            .forward(self.embedding.forward(inputs))
            .reshape([n, w, self.ansatz_layers, dim / 2]);

        let lcu  = l1_normalise(self.lcu_weights.val().slice([0..w])).reshape([1, w, 1]);
        let poly = l1_normalise(self.poly_weights.val());

        // ψ_0 = |0⟩
        let mut psi = Tensor::<B, 2>::zeros([n, dim], &device)
            .slice_assign([0..n, 0..1], Tensor::ones([n, 1], &device));
        let mut acc = psi.clone() * poly.clone().slice([0..1]).reshape([1, 1]);

        for k in 1..=self.degree {
            let per_token = psi.unsqueeze_dim::<3>(1).expand([n, w, dim]);
            psi = (self.apply_circuits(per_token, &angles) * lcu.clone())
                .sum_dim(1)
                .reshape([n, dim]);
            acc = acc + psi.clone() * poly.clone().slice([k..k + 1]).reshape([1, 1]);
        }

        let norm  = (acc.clone() * acc.clone()).sum_dim(1).sqrt(); // [n, 1]
        let aux   = norm.clone().mean();
        let state = acc / norm.add_scalar(NORM_EPS);
        let probs = state.clone() * state;

        let hidden = self.dropout.forward(relu(self.readout.forward(probs)));
        ModelOutput {
            logits: self.lm_head.forward(hidden),
            aux,
        }
    }

    fn initialize_weights(mut self) -> Self {
        self.embedding  = normal_embedding(self.embedding);
        self.angle_head = xavier_linear(self.angle_head);
        self.readout    = xavier_linear(self.readout);
        self.lm_head    = xavier_linear(self.lm_head);
        self
    }
}
