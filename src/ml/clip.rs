// ============================================================
// Layer 5 — Gradient Norm Clipping
// ============================================================
// Global-norm clipping over ALL parameters at once:
//
//   total = sqrt(Σ_p ‖g_p‖²)
//   if total > max_norm:  g_p ← g_p · max_norm / (total + 1e-6)
//
// burn's optimizer-level GradientClipping works per parameter, which
// rescales each tensor independently and changes the direction of
// the overall update. Walking the module with a ModuleVisitor keeps
// the direction and only shortens the step.

use std::marker::PhantomData;

use burn::{
    module::{AutodiffModule, ModuleVisitor, ParamId},
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

const CLIP_EPS: f64 = 1e-6;

struct SquaredNorm<'a, B: AutodiffBackend> {
    grads: &'a GradientsParams,
    total: f64,
    _b:    PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SquaredNorm<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            self.total += (grad.clone() * grad).sum().into_scalar().elem::<f64>();
        }
    }
}

struct Rescale<'a, B: AutodiffBackend> {
    grads: &'a mut GradientsParams,
    scale: f64,
    _b:    PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for Rescale<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) {
            self.grads.register(id, grad.mul_scalar(self.scale));
        }
    }
}

/// L2 norm of all gradients, as if concatenated into one vector
pub fn global_grad_norm<B, M>(model: &M, grads: &GradientsParams) -> f64
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let mut visitor = SquaredNorm::<B> { grads, total: 0.0, _b: PhantomData };
    model.visit(&mut visitor);
    visitor.total.sqrt()
}

/// Scale all gradients down so their global norm is at most `max_norm`.
/// Returns the norm measured before clipping.
pub fn clip_grad_norm<B, M>(model: &M, grads: &mut GradientsParams, max_norm: f64) -> f64
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let total = global_grad_norm::<B, M>(model, grads);
    if total > max_norm {
        let scale = max_norm / (total + CLIP_EPS);
        let mut visitor = Rescale::<B> { grads, scale, _b: PhantomData };
        model.visit(&mut visitor);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::random::backend_guard;
    use burn::backend::{Autodiff, NdArray};
    use burn::nn::{Linear, LinearConfig};

    type B = Autodiff<NdArray>;

    /// Gradients of sum(scale · model(x)) for a 3→2 linear layer
    fn grads_for(model: &Linear<B>, scale: f32) -> GradientsParams {
        let device = Default::default();
        let x = Tensor::<B, 2>::ones([4, 3], &device);
        let loss = model.forward(x).sum().mul_scalar(scale);
        GradientsParams::from_grads(loss.backward(), model)
    }

    #[test]
    fn test_global_norm_of_known_gradients() {
        let _backend = backend_guard();
        // d/dW = 4·scale everywhere (6 entries), d/db = 4·scale (2 entries)
        let model = LinearConfig::new(3, 2).init::<B>(&Default::default());
        let grads = grads_for(&model, 1.0);
        let norm  = global_grad_norm::<B, _>(&model, &grads);
        assert!((norm - (8.0f64 * 16.0).sqrt()).abs() < 1e-4);
    }

    #[test]
    fn test_clip_scales_to_max_norm() {
        let _backend = backend_guard();
        let model     = LinearConfig::new(3, 2).init::<B>(&Default::default());
        let mut grads = grads_for(&model, 10.0);

        let before = clip_grad_norm::<B, _>(&model, &mut grads, 1.0);
        assert!(before > 1.0);

        let after = global_grad_norm::<B, _>(&model, &grads);
        assert!((after - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_clip_leaves_small_gradients_alone() {
        let _backend = backend_guard();
        let model     = LinearConfig::new(3, 2).init::<B>(&Default::default());
        let mut grads = grads_for(&model, 0.01);

        let before = clip_grad_norm::<B, _>(&model, &mut grads, 100.0);
        let after  = global_grad_norm::<B, _>(&model, &grads);
        assert_eq!(before, after);
    }
}
