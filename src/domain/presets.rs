// ============================================================
// Layer 3 — Model Presets
// ============================================================
// Base hyperparameter templates for each model variant. A sweep
// entry is a template plus the fields that vary per run
// (model, dimension, seed).
//
// Templates are flat JSON maps rather than HyperParams values so
// that a template can omit the varying fields and still be valid
// input to HyperParams::from_value once they are filled in.

use serde_json::{json, Map, Value};

use crate::domain::error::HarnessError;

/// Embedding widths swept for the classical baselines
pub const CLASSICAL_DIMENSIONS: [usize; 2] = [96, 128];

/// Embedding widths swept for the quantum-inspired model
pub const QUANTUM_DIMENSIONS: [usize; 1] = [512];

/// Settings every variant shares
fn common() -> Map<String, Value> {
    let value = json!({
        "window":         32,
        "epochs":         30,
        "restart_epochs": 30000,
        "dropout":        0.10,
        "lr":             0.002,
        "lr_sched":       "cos",
        "wd":             0.0001,
        "eps":            1e-10,
        "batch_size":     32,
        "max_grad_norm":  5.0,
        "print_iter":     50
    });
    match value {
        Value::Object(map) => map,
        _ => unreachable!("json! object literal"),
    }
}

/// Template for a model tag (canonical or short alias), without
/// `dimension` and `seed`.
pub fn template(model: &str) -> Result<Map<String, Value>, HarnessError> {
    let mut map = common();
    let tag = match model {
        "quantum" | "QLINSVT" => {
            map.insert("qubits".into(), json!(6));
            map.insert("ansatz_layers".into(), json!(4));
            map.insert("layers".into(), json!(3));
            "quantum"
        }
        "fnet" | "FNet" => {
            map.insert("layers".into(), json!(2));
            "fnet"
        }
        "transformer" | "VAS" => {
            map.insert("heads".into(), json!(1));
            map.insert("layers".into(), json!(1));
            map.insert("lr".into(), json!(0.001));
            "transformer"
        }
        "lstm" | "LSTM" => {
            map.insert("layers".into(), json!(2));
            map.insert("dropout".into(), json!(0.30));
            "lstm"
        }
        other => {
            return Err(HarnessError::config(format!("no preset for model `{other}`")));
        }
    };
    map.insert("model".into(), json!(tag));
    Ok(map)
}

/// Default sweep dimensions for a canonical tag
pub fn default_dimensions(model: &str) -> Vec<usize> {
    match model {
        "quantum" | "QLINSVT" => QUANTUM_DIMENSIONS.to_vec(),
        _ => CLASSICAL_DIMENSIONS.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hyperparams::{HyperParams, ModelArch};

    fn complete(model: &str) -> HyperParams {
        let mut map = template(model).unwrap();
        map.insert("dimension".into(), json!(default_dimensions(model)[0]));
        HyperParams::from_value(Value::Object(map)).unwrap()
    }

    #[test]
    fn test_every_preset_parses() {
        assert_eq!(complete("quantum").arch, ModelArch::Quantum { qubits: 6, ansatz_layers: 4 });
        assert_eq!(complete("fnet").arch, ModelArch::FNet);
        assert_eq!(complete("VAS").arch, ModelArch::Transformer { heads: 1 });
        assert_eq!(complete("lstm").dropout, 0.30);
    }

    #[test]
    fn test_unknown_preset() {
        assert!(matches!(template("gpt"), Err(HarnessError::Configuration(_))));
    }
}
