// ============================================================
// Layer 4 — Window Batcher
// ============================================================
// Moves one host-side WindowSample onto the compute device.
//
//   Input:  WindowSample { inputs: C*W ids, targets: C ids }
//   Output: WindowBatch  { inputs: [C, W] Int, targets: [C] Int }
//
// A "batch" here is exactly one window position. Parallelism
// comes from the C columns baked into the layout, not from
// grouping several positions together, so there is no DataLoader:
// the trainer asks for the positions it wants in the order it
// wants them.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    prelude::*,
    tensor::TensorData,
};

use crate::data::windower::WindowSample;

// ─── WindowBatch ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct WindowBatch<B: Backend> {
    /// Context ids — shape: [columns, window]
    pub inputs: Tensor<B, 2, Int>,

    /// Next-token ids — shape: [columns]
    pub targets: Tensor<B, 1, Int>,
}

// ─── WindowBatcher ────────────────────────────────────────────────────────────
/// Holds the target device so tensors are created where the model lives.
#[derive(Clone, Debug)]
pub struct WindowBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> WindowBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    pub fn batch(&self, sample: &WindowSample) -> WindowBatch<B> {
        // Burn Int tensors are built from i64 data and converted to
        // the backend's integer element type on upload
        let inputs: Vec<i64>  = sample.inputs.iter().map(|&id| id as i64).collect();
        let targets: Vec<i64> = sample.targets.iter().map(|&id| id as i64).collect();

        let inputs = Tensor::<B, 2, Int>::from_data(
            TensorData::new(inputs, [sample.columns, sample.window]),
            &self.device,
        );
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(targets, [sample.columns]),
            &self.device,
        );

        WindowBatch { inputs, targets }
    }
}
