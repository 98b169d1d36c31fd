// ============================================================
// Layer 5 — Model Factory
// ============================================================
// Turns a validated HyperParams into a concrete model and hands it
// to a ModelTask.
//
// Why a task instead of returning the model?
//   The four variants are different types. Returning `Box<dyn ...>`
//   is not an option because burn modules are consumed and rebuilt
//   by every optimizer step (`model = optim.step(lr, model, grads)`),
//   which needs the concrete type. So the caller passes in WHAT to
//   do with the model, and the factory calls it with whichever
//   concrete type the config selects. One generic body, four
//   monomorphised instances.
//
//   ModelArch::Quantum     → QuantumLm      (degree = layers)
//   ModelArch::FNet        → FNetLm
//   ModelArch::Transformer → TransformerLm
//   ModelArch::Lstm        → LstmLm
//
// Reference: Rust Book §10 (Generics), §19 (Advanced Traits)

use anyhow::Result;
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};

use crate::domain::error::HarnessError;
use crate::domain::hyperparams::{HyperParams, ModelArch};
use crate::ml::model::LanguageModel;
use crate::ml::models::{
    fnet::FNetLmConfig, lstm::LstmLmConfig, quantum::QuantumLmConfig,
    transformer::TransformerLmConfig,
};

/// Work to run on a freshly built model.
pub trait ModelTask<B: AutodiffBackend> {
    type Output;

    fn run<M>(self, model: M) -> Self::Output
    where
        M: AutodiffModule<B> + LanguageModel<B>,
        M::InnerModule: LanguageModel<B::InnerBackend>;
}

/// Build the variant `params` selects and run `task` on it.
///
/// Fails with `HarnessError::Configuration` before anything is built
/// when the parameters are inconsistent.
pub fn create_model<B, T>(
    params:     &HyperParams,
    vocab_size: usize,
    device:     &B::Device,
    task:       T,
) -> Result<T::Output>
where
    B: AutodiffBackend,
    T: ModelTask<B>,
{
    params.validate()?;
    if vocab_size == 0 {
        return Err(HarnessError::config("vocabulary is empty").into());
    }

    tracing::info!(
        "Building {} model: dimension={}, layers={}, window={}, vocab={}",
        params.arch.tag(), params.dimension, params.layers, params.window, vocab_size,
    );

    let output = match &params.arch {
        ModelArch::Quantum { qubits, ansatz_layers } => task.run(
            QuantumLmConfig::new(
                vocab_size, params.window, params.dimension,
                *qubits, *ansatz_layers, params.layers, params.dropout,
            )
            .init::<B>(device),
        ),
        ModelArch::FNet => task.run(
            FNetLmConfig::new(vocab_size, params.window, params.dimension, params.layers, params.dropout)
                .init::<B>(device),
        ),
        ModelArch::Transformer { heads } => task.run(
            TransformerLmConfig::new(
                vocab_size, params.window, params.dimension,
                *heads, params.layers, params.dropout,
            )
            .init::<B>(device),
        ),
        ModelArch::Lstm => task.run(
            LstmLmConfig::new(vocab_size, params.dimension, params.layers, params.dropout)
                .init::<B>(device),
        ),
    };
    Ok(output)
}
