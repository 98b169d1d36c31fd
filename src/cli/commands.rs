// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Flags for `train`, `sweep` and `evaluate`. Every command takes
// the same pair of directories (corpus in, artifacts out); list
// flags such as `--models` and `--dimensions` are comma-delimited.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde_json::json;

use crate::application::sweep_use_case::{SeedPlan, SweepPlan};
use crate::domain::error::HarnessError;

/// The three top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train and evaluate one configuration file
    Train(TrainArgs),

    /// Sweep model presets × dimensions × seeds
    Sweep(SweepArgs),

    /// Re-evaluate a saved run on the validation and test splits
    Evaluate(EvaluateArgs),
}

/// Where the corpus lives and where artifacts go; shared by every command
#[derive(Args, Debug, Clone)]
pub struct DirArgs {
    /// Directory with train.txt / valid.txt / test.txt
    /// (or wiki.train.raw / wiki.valid.raw / wiki.test.raw)
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory for checkpoints, configs, metrics and the tokenizer
    #[arg(long, default_value = "trained_models")]
    pub artifact_dir: PathBuf,
}

/// Arguments for `train`: one JSON config, optional overrides
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON file with a flat hyperparameter mapping
    /// (must contain "model", e.g. "lstm", "fnet", "transformer", "quantum")
    #[arg(long)]
    pub config: PathBuf,

    #[command(flatten)]
    pub dirs: DirArgs,

    /// Seed for every RNG; drawn from the OS when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the number of epochs in the config file
    #[arg(long)]
    pub epochs: Option<usize>,
}

/// All arguments for the `sweep` command
#[derive(Args, Debug)]
pub struct SweepArgs {
    #[command(flatten)]
    pub dirs: DirArgs,

    /// Model presets to sweep, comma separated
    #[arg(long, value_delimiter = ',', default_value = "quantum")]
    pub models: Vec<String>,

    /// Embedding widths, comma separated
    /// (default: 512 for quantum, 96 and 128 for the classical models)
    #[arg(long, value_delimiter = ',')]
    pub dimensions: Vec<usize>,

    /// Number of fresh seeds per (model, dimension)
    #[arg(long, default_value_t = 1)]
    pub seeds: usize,

    /// Explicit seeds, comma separated; replaces --seeds
    #[arg(long, value_delimiter = ',')]
    pub seed_list: Vec<u64>,

    /// Override the preset number of epochs
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Log and skip failing configurations instead of aborting
    #[arg(long)]
    pub keep_going: bool,
}

/// Presets × dimensions × seeds as a SweepPlan; clap types stop here.
impl TryFrom<&SweepArgs> for SweepPlan {
    type Error = HarnessError;

    fn try_from(a: &SweepArgs) -> Result<Self, Self::Error> {
        let seeds = if a.seed_list.is_empty() {
            SeedPlan::Random { count: a.seeds }
        } else {
            SeedPlan::Fixed(a.seed_list.clone())
        };

        let plan = SweepPlan::from_presets(&a.models, &a.dimensions, seeds)?;
        Ok(match a.epochs {
            Some(epochs) => plan.with_override("epochs", json!(epochs)),
            None         => plan,
        })
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Model tag of the saved run (e.g. "lstm")
    #[arg(long)]
    pub model: String,

    /// Seed of the saved run
    #[arg(long)]
    pub seed: u64,

    #[command(flatten)]
    pub dirs: DirArgs,
}
