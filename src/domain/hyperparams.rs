// ============================================================
// Layer 3 — Hyperparameter Configuration
// ============================================================
// One training cycle is fully described by a HyperParams value.
//
// On disk (and in sweep templates) a configuration is a FLAT JSON
// mapping, e.g.
//
//   { "model": "lstm", "dimension": 96, "layers": 2, "window": 32,
//     "lr": 0.002, "lr_sched": "cos", "wd": 0.0001, ... }
//
// In Rust the model tag becomes a closed enum (ModelArch) whose
// variants carry exactly the fields that variant needs. Parsing a
// mapping with an unknown tag, or without a variant's required
// field, is the one place a ConfigurationError can originate for
// model selection; past parsing, every match over ModelArch is
// exhaustive.
//
// Values are immutable once built. The sweep builds each entry
// fresh from a template instead of overwriting a shared mapping.
//
// Reference: serde documentation (internally tagged enums, flatten)
//            Rust Book §6 (Enums and Pattern Matching)

use std::{fmt, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::HarnessError;

// ─── ModelArch ────────────────────────────────────────────────────────────────
/// The closed set of model variants. The `model` key selects the
/// variant; the short tags are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model")]
pub enum ModelArch {
    /// Quantum-circuit-inspired model on a 2^qubits state vector
    #[serde(rename = "quantum", alias = "QLINSVT")]
    Quantum { qubits: usize, ansatz_layers: usize },

    /// Fourier token mixing + feed-forward blocks
    #[serde(rename = "fnet", alias = "FNet")]
    FNet,

    /// Multi-head self-attention encoder
    #[serde(rename = "transformer", alias = "VAS")]
    Transformer { heads: usize },

    /// Stacked LSTM
    #[serde(rename = "lstm", alias = "LSTM")]
    Lstm,
}

impl ModelArch {
    /// Canonical tag, used in artifact names and in the `model` key
    pub fn tag(&self) -> &'static str {
        match self {
            ModelArch::Quantum { .. }     => "quantum",
            ModelArch::FNet               => "fnet",
            ModelArch::Transformer { .. } => "transformer",
            ModelArch::Lstm               => "lstm",
        }
    }

    /// Canonical tag for a model name, accepting the same short
    /// aliases as the `model` key
    pub fn canonical_tag(name: &str) -> Result<&'static str, HarnessError> {
        match name {
            "quantum" | "QLINSVT"   => Ok("quantum"),
            "fnet" | "FNet"         => Ok("fnet"),
            "transformer" | "VAS"   => Ok("transformer"),
            "lstm" | "LSTM"         => Ok("lstm"),
            other => Err(HarnessError::config(format!("unknown model `{other}`"))),
        }
    }
}

// ─── LrSchedule ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LrSchedule {
    #[default]
    Constant,
    /// Cosine annealing with warm restarts every `restart_epochs` steps
    #[serde(alias = "cos")]
    Cosine,
}

fn default_print_iter() -> usize {
    50
}

// ─── HyperParams ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperParams {
    #[serde(flatten)]
    pub arch: ModelArch,

    /// Embedding width shared by every variant
    pub dimension: usize,

    /// Depth; the polynomial degree for the quantum variant
    pub layers: usize,

    /// Context length in tokens
    pub window: usize,

    pub epochs: usize,

    /// Restart period of the cosine schedule, in optimizer steps
    pub restart_epochs: usize,

    pub dropout: f64,

    pub lr: f64,

    #[serde(default)]
    pub lr_sched: LrSchedule,

    #[serde(alias = "wd")]
    pub weight_decay: f64,

    #[serde(alias = "eps")]
    pub epsilon: f64,

    pub batch_size: usize,

    /// Global gradient-norm threshold; 0 disables clipping
    #[serde(default, alias = "max_grad_norm")]
    pub grad_clip: f64,

    /// Log training progress every N steps; 0 disables
    #[serde(default = "default_print_iter")]
    pub print_iter: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl HyperParams {
    /// Parse a flat mapping. Unknown model tags, missing fields and
    /// invalid values all surface as `HarnessError::Configuration`.
    pub fn from_value(value: Value) -> Result<Self> {
        let params: HyperParams = serde_json::from_value(value)
            .map_err(|e| HarnessError::config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config '{}'", path.display()))?;
        let value: Value = serde_json::from_str(&json)
            .with_context(|| format!("Config '{}' is not valid JSON", path.display()))?;
        Self::from_value(value)
    }

    /// Check value ranges and variant-specific constraints.
    pub fn validate(&self) -> Result<(), HarnessError> {
        let positive = [
            ("dimension",  self.dimension),
            ("layers",     self.layers),
            ("window",     self.window),
            ("epochs",     self.epochs),
            ("batch_size", self.batch_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(HarnessError::config(format!("`{name}` must be at least 1")));
            }
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(HarnessError::config(format!(
                "`dropout` must lie in [0, 1), got {}", self.dropout
            )));
        }
        if !(self.lr > 0.0) {
            return Err(HarnessError::config(format!("`lr` must be positive, got {}", self.lr)));
        }
        if self.lr_sched == LrSchedule::Cosine && self.restart_epochs == 0 {
            return Err(HarnessError::config("`restart_epochs` must be at least 1 for the cosine schedule"));
        }
        if self.grad_clip < 0.0 {
            return Err(HarnessError::config("`max_grad_norm` cannot be negative"));
        }

        match &self.arch {
            ModelArch::Quantum { qubits, ansatz_layers } => {
                if !(1..=16).contains(qubits) {
                    return Err(HarnessError::config(format!(
                        "`qubits` must lie in 1..=16, got {qubits}"
                    )));
                }
                if *ansatz_layers == 0 {
                    return Err(HarnessError::config("`ansatz_layers` must be at least 1"));
                }
            }
            ModelArch::Transformer { heads } => {
                if *heads == 0 || self.dimension % heads != 0 {
                    return Err(HarnessError::config(format!(
                        "`dimension` ({}) must be divisible by `heads` ({heads})",
                        self.dimension
                    )));
                }
            }
            ModelArch::FNet | ModelArch::Lstm => {}
        }
        Ok(())
    }

    /// Columns of the window layout: one training step sees
    /// `batch_size * window` rows.
    pub fn effective_batch(&self) -> usize {
        self.batch_size * self.window
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn run_key(&self, seed: u64) -> RunKey {
        RunKey::new(self.arch.tag(), seed)
    }
}

// ─── RunKey ───────────────────────────────────────────────────────────────────
/// Identifies the artifacts of one cycle: (model kind, seed).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunKey {
    pub model: String,
    pub seed:  u64,
}

impl RunKey {
    pub fn new(model: impl Into<String>, seed: u64) -> Self {
        Self { model: model.into(), seed }
    }

    /// File stem shared by the checkpoint, config, metrics and results
    pub fn stem(&self) -> String {
        format!("{}_{}", self.model, self.seed)
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (seed {})", self.model, self.seed)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Value {
        json!({
            "model": "lstm",
            "dimension": 16,
            "layers": 2,
            "window": 4,
            "epochs": 2,
            "restart_epochs": 100,
            "dropout": 0.1,
            "lr": 0.002,
            "lr_sched": "cos",
            "wd": 0.0001,
            "eps": 1e-10,
            "batch_size": 2,
            "max_grad_norm": 5.0
        })
    }

    fn config_error(value: Value) -> String {
        let err = HyperParams::from_value(value).unwrap_err();
        match err.downcast_ref::<HarnessError>() {
            Some(HarnessError::Configuration(msg)) => msg.clone(),
            other => panic!("expected a configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_parses_short_keys() {
        let p = HyperParams::from_value(base()).unwrap();
        assert_eq!(p.arch, ModelArch::Lstm);
        assert_eq!(p.lr_sched, LrSchedule::Cosine);
        assert_eq!(p.weight_decay, 0.0001);
        assert_eq!(p.grad_clip, 5.0);
        assert_eq!(p.print_iter, 50);
        assert_eq!(p.seed, None);
    }

    #[test]
    fn test_canonical_tag_folds_aliases() {
        assert_eq!(ModelArch::canonical_tag("LSTM").unwrap(), "lstm");
        assert_eq!(ModelArch::canonical_tag("FNet").unwrap(), "fnet");
        assert_eq!(ModelArch::canonical_tag("quantum").unwrap(), "quantum");
        assert!(matches!(
            ModelArch::canonical_tag("gru"),
            Err(HarnessError::Configuration(_))
        ));
    }

    #[test]
    fn test_aliases_select_variants() {
        let mut v = base();
        v["model"] = json!("QLINSVT");
        v["qubits"] = json!(3);
        v["ansatz_layers"] = json!(2);
        let p = HyperParams::from_value(v).unwrap();
        assert_eq!(p.arch, ModelArch::Quantum { qubits: 3, ansatz_layers: 2 });
        assert_eq!(p.arch.tag(), "quantum");
    }

    #[test]
    fn test_unknown_model_is_configuration_error() {
        let mut v = base();
        v["model"] = json!("unknown");
        let msg = config_error(v);
        assert!(msg.contains("unknown"));
    }

    #[test]
    fn test_missing_variant_field_is_configuration_error() {
        let mut v = base();
        v["model"] = json!("transformer");
        // no `heads`
        let msg = config_error(v);
        assert!(msg.contains("heads"));
    }

    #[test]
    fn test_heads_must_divide_dimension() {
        let mut v = base();
        v["model"] = json!("transformer");
        v["heads"] = json!(3);
        config_error(v);
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut v = base();
        v["window"] = json!(0);
        config_error(v);
    }

    #[test]
    fn test_unrelated_keys_are_ignored() {
        let mut v = base();
        v["residuals"] = json!(false);
        assert!(HyperParams::from_value(v).is_ok());
    }

    #[test]
    fn test_value_round_trip_keeps_tag() {
        let p = HyperParams::from_value(base()).unwrap().with_seed(7);
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["model"], json!("lstm"));
        assert_eq!(HyperParams::from_value(v).unwrap(), p);
    }

    #[test]
    fn test_effective_batch_and_run_key() {
        let p = HyperParams::from_value(base()).unwrap();
        assert_eq!(p.effective_batch(), 8);
        assert_eq!(p.run_key(42).stem(), "lstm_42");
    }
}
