// ============================================================
// Layer 5 — Learning-Rate Schedule
// ============================================================
// Stepped once per OPTIMIZER step (not per epoch).
//
//   Constant        lr_t = lr
//
//   CosineRestarts  lr_t = η_min + (lr − η_min)·(1 + cos(π·t_cur / T))/2
//                   t_cur = t mod T,  T = restart_epochs,  η_min = 0
//
// The first step uses the base rate; after T steps the rate jumps
// back to lr (a "warm restart").
//
// Reference: Loshchilov & Hutter (2017) SGDR: Stochastic Gradient
//            Descent with Warm Restarts

use std::f64::consts::PI;

use crate::domain::hyperparams::{HyperParams, LrSchedule};

#[derive(Debug, Clone, PartialEq)]
pub enum LrScheduler {
    Constant {
        lr: f64,
    },
    CosineRestarts {
        base_lr: f64,
        min_lr:  f64,
        period:  usize,
        t_cur:   usize,
    },
}

impl LrScheduler {
    pub fn from_params(params: &HyperParams) -> Self {
        match params.lr_sched {
            LrSchedule::Constant => Self::Constant { lr: params.lr },
            LrSchedule::Cosine   => Self::cosine(params.lr, params.restart_epochs),
        }
    }

    pub fn cosine(base_lr: f64, period: usize) -> Self {
        Self::CosineRestarts { base_lr, min_lr: 0.0, period: period.max(1), t_cur: 0 }
    }

    /// Rate for the next optimizer step
    pub fn lr(&self) -> f64 {
        match *self {
            Self::Constant { lr } => lr,
            Self::CosineRestarts { base_lr, min_lr, period, t_cur } => {
                let progress = t_cur as f64 / period as f64;
                min_lr + (base_lr - min_lr) * (1.0 + (PI * progress).cos()) / 2.0
            }
        }
    }

    pub fn step(&mut self) {
        if let Self::CosineRestarts { period, t_cur, .. } = self {
            *t_cur += 1;
            if *t_cur >= *period {
                *t_cur = 0;
            }
        }
    }
}
