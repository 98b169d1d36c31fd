// ============================================================
// Layer 2 — SweepUseCase
// ============================================================
// Nested enumeration over models × dimensions × seeds:
//
//   for (template, dimensions) in entries:
//       for dimension in dimensions:
//           seeds = fixed list, or fresh draws for this dimension
//           for seed in seeds:
//               config = template + overrides + {dimension, seed}
//               driver.train_evaluate(config)
//
// Every configuration is a NEW map cloned from its template; no
// entry can see another entry's values.
//
// Failure policy:
//   keep_going = false → the first failing configuration aborts
//   keep_going = true  → it is logged, recorded and skipped
//
// Reference: Rust Book §13 (Iterators and Closures)

use anyhow::Result;
use serde_json::{json, Map, Value};

use crate::application::train_use_case::TrainUseCase;
use crate::domain::{
    error::HarnessError,
    hyperparams::HyperParams,
    presets,
    traits::TokenSource,
};
use crate::infra::random::RandomContext;

// ─── SeedPlan ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedPlan {
    /// The same seeds for every (model, dimension)
    Fixed(Vec<u64>),
    /// `count` fresh OS-drawn seeds per (model, dimension)
    Random { count: usize },
}

impl SeedPlan {
    fn draw(&self) -> Vec<u64> {
        match self {
            SeedPlan::Fixed(seeds)      => seeds.clone(),
            SeedPlan::Random { count }  => RandomContext::sweep_seeds(*count),
        }
    }
}

// ─── SweepPlan ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct SweepEntry {
    pub template:   Map<String, Value>,
    pub dimensions: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct SweepPlan {
    pub entries:   Vec<SweepEntry>,
    pub seeds:     SeedPlan,
    /// Applied on top of every template (e.g. a shorter `epochs`)
    pub overrides: Map<String, Value>,
}

impl SweepPlan {
    /// One entry per model preset. Empty `dimensions` means the
    /// preset's default widths.
    pub fn from_presets(
        models:     &[String],
        dimensions: &[usize],
        seeds:      SeedPlan,
    ) -> Result<Self, HarnessError> {
        if models.is_empty() {
            return Err(HarnessError::config("a sweep needs at least one model"));
        }
        let entries = models
            .iter()
            .map(|model| {
                Ok(SweepEntry {
                    template:   presets::template(model)?,
                    dimensions: if dimensions.is_empty() {
                        presets::default_dimensions(model)
                    } else {
                        dimensions.to_vec()
                    },
                })
            })
            .collect::<Result<Vec<_>, HarnessError>>()?;

        Ok(Self { entries, seeds, overrides: Map::new() })
    }

    pub fn with_override(mut self, key: impl Into<String>, value: Value) -> Self {
        self.overrides.insert(key.into(), value);
        self
    }

    /// Every configuration of the sweep, in run order, each built
    /// fresh from its template.
    pub fn configurations(&self) -> Vec<Map<String, Value>> {
        let mut configs = Vec::new();
        for entry in &self.entries {
            for &dimension in &entry.dimensions {
                for seed in self.seeds.draw() {
                    let mut config = entry.template.clone();
                    config.extend(self.overrides.clone());
                    config.insert("dimension".into(), json!(dimension));
                    config.insert("seed".into(), json!(seed));
                    configs.push(config);
                }
            }
        }
        configs
    }
}

// ─── SweepOutcome ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub model:     String,
    pub dimension: usize,
    pub seed:      u64,
    /// Test loss, or the error message of a skipped configuration
    pub objective: Result<f64, String>,
}

fn describe(config: &Map<String, Value>) -> (String, usize, u64) {
    let model     = config.get("model").and_then(Value::as_str).unwrap_or("?").to_string();
    let dimension = config.get("dimension").and_then(Value::as_u64).unwrap_or(0) as usize;
    let seed      = config.get("seed").and_then(Value::as_u64).unwrap_or(0);
    (model, dimension, seed)
}

// ─── SweepUseCase ─────────────────────────────────────────────────────────────
pub struct SweepUseCase<S: TokenSource> {
    driver:     TrainUseCase<S>,
    keep_going: bool,
}

impl<S: TokenSource> SweepUseCase<S> {
    pub fn new(driver: TrainUseCase<S>, keep_going: bool) -> Self {
        Self { driver, keep_going }
    }

    /// Run every configuration of `plan` one after another.
    pub fn run(&mut self, plan: &SweepPlan) -> Result<Vec<SweepOutcome>> {
        let configs = plan.configurations();
        let total   = configs.len();
        let mut outcomes = Vec::with_capacity(total);

        for (i, config) in configs.into_iter().enumerate() {
            let (model, dimension, seed) = describe(&config);
            tracing::info!(
                "Sweep {}/{}: model={}, dimension={}, seed={}",
                i + 1, total, model, dimension, seed,
            );

            let result = HyperParams::from_value(Value::Object(config))
                .and_then(|params| self.driver.train_evaluate(params));

            let objective = match result {
                Ok(loss) => Ok(loss),
                Err(e) if self.keep_going => {
                    tracing::warn!("Skipping model={} dimension={} seed={}: {:#}", model, dimension, seed, e);
                    Err(format!("{e:#}"))
                }
                Err(e) => return Err(e),
            };
            outcomes.push(SweepOutcome { model, dimension, seed, objective });
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::random::backend_guard;
    use crate::data::dataset::TokenSplits;

    fn plan() -> SweepPlan {
        SweepPlan::from_presets(
            &["lstm".to_string(), "VAS".to_string()],
            &[8, 16],
            SeedPlan::Fixed(vec![1, 2]),
        )
        .unwrap()
    }

    fn splits() -> TokenSplits {
        let stream: Vec<u32> = (0..200).map(|i| 3 + (i % 4) as u32).collect();
        TokenSplits {
            train: stream.clone(), valid: stream.clone(), test: stream,
            pad_token: 0, vocab_size: 7,
        }
    }

    #[test]
    fn test_configurations_enumerate_in_order() {
        let configs = plan().configurations();
        assert_eq!(configs.len(), 2 * 2 * 2);

        let order: Vec<(String, usize, u64)> = configs.iter().map(describe).collect();
        assert_eq!(order[0], ("lstm".to_string(), 8, 1));
        assert_eq!(order[1], ("lstm".to_string(), 8, 2));
        assert_eq!(order[2], ("lstm".to_string(), 16, 1));
        assert_eq!(order[4], ("transformer".to_string(), 8, 1));
    }

    #[test]
    fn test_configurations_are_fresh() {
        let plan    = plan();
        let configs = plan.configurations();

        // Templates never receive the varying fields
        for entry in &plan.entries {
            assert!(!entry.template.contains_key("dimension"));
            assert!(!entry.template.contains_key("seed"));
        }
        // Every config parses on its own with its own values
        for config in configs {
            let (_, dimension, seed) = describe(&config);
            let params = HyperParams::from_value(Value::Object(config)).unwrap();
            assert_eq!(params.dimension, dimension);
            assert_eq!(params.seed, Some(seed));
        }
    }

    #[test]
    fn test_default_dimensions_and_overrides() {
        let plan = SweepPlan::from_presets(&["quantum".to_string()], &[], SeedPlan::Random { count: 3 })
            .unwrap()
            .with_override("epochs", json!(1));
        let configs = plan.configurations();
        assert_eq!(configs.len(), 3);
        assert!(configs.iter().all(|c| c["dimension"] == json!(512) && c["epochs"] == json!(1)));
    }

    #[test]
    fn test_unknown_model_rejected() {
        let err = SweepPlan::from_presets(&["gpt".to_string()], &[], SeedPlan::Fixed(vec![1])).unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));
    }

    #[test]
    fn test_keep_going_skips_failures() {
        let _backend = backend_guard();
        let dir    = tempfile::tempdir().unwrap();
        let driver = TrainUseCase::new(splits(), dir.path()).unwrap();
        // window 0 fails validation before any training starts
        let plan   = plan().with_override("window", json!(0));

        let outcomes = SweepUseCase::new(driver, true).run(&plan).unwrap();
        assert_eq!(outcomes.len(), 8);
        assert!(outcomes.iter().all(|o| o.objective.is_err()));
    }

    #[test]
    fn test_failure_aborts_without_keep_going() {
        let _backend = backend_guard();
        let dir    = tempfile::tempdir().unwrap();
        let driver = TrainUseCase::new(splits(), dir.path()).unwrap();
        let plan   = plan().with_override("window", json!(0));

        let err = SweepUseCase::new(driver, false).run(&plan).unwrap_err();
        assert!(matches!(err.downcast_ref::<HarnessError>(), Some(HarnessError::Configuration(_))));
    }

    #[test]
    fn test_sweep_runs_each_configuration() {
        let _backend = backend_guard();
        let dir    = tempfile::tempdir().unwrap();
        let driver = TrainUseCase::new(splits(), dir.path()).unwrap();
        let plan   = SweepPlan::from_presets(&["lstm".to_string()], &[4], SeedPlan::Fixed(vec![3, 4]))
            .unwrap()
            .with_override("epochs", json!(1))
            .with_override("window", json!(2))
            .with_override("batch_size", json!(2))
            .with_override("print_iter", json!(0));

        let outcomes = SweepUseCase::new(driver, false).run(&plan).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| matches!(o.objective, Ok(loss) if loss.is_finite())));
        assert!(dir.path().join("results_lstm_3.txt").exists());
        assert!(dir.path().join("results_lstm_4.txt").exists());
    }
}
