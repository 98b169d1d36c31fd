// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line and routes each subcommand to its use
// case, then prints the outcome:
//   1. `train`    — one configuration file, one training cycle
//   2. `sweep`    — model presets × dimensions × seeds
//   3. `evaluate` — reload a saved run and score it again
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, DirArgs, EvaluateArgs, SweepArgs, TrainArgs};

use crate::application::{
    evaluate_use_case::EvaluateUseCase,
    sweep_use_case::{SweepPlan, SweepUseCase},
    train_use_case::TrainUseCase,
};
use crate::data::corpus::TextCorpus;
use crate::domain::hyperparams::{HyperParams, ModelArch, RunKey};
use crate::infra::tokenizer_store::TokenizerStore;

/// Top-level parser for the `lm-sweep` binary.
#[derive(Parser, Debug)]
#[command(
    name = "lm-sweep",
    version,
    about = "Train, sweep and evaluate windowed next-token language models."
)]
pub struct Cli {
    /// The subcommand to run (train, sweep or evaluate)
    #[command(subcommand)]
    pub command: Commands,
}

/// Text corpus under `data_dir`, vocabulary stored next to the checkpoints
fn corpus(dirs: &DirArgs) -> TextCorpus {
    TextCorpus::new(&dirs.data_dir, TokenizerStore::new(&dirs.artifact_dir))
}

impl Cli {
    /// Dispatch to the subcommand's handler.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Sweep(args)    => run_sweep(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

/// `train`: one config file, one cycle, one summary line
fn run_train(args: TrainArgs) -> Result<()> {
    let mut params = HyperParams::from_file(&args.config)?;
    if let Some(seed) = args.seed {
        params = params.with_seed(seed);
    }
    if let Some(epochs) = args.epochs {
        params.epochs = epochs;
    }

    tracing::info!("Training {} from '{}'", params.arch.tag(), args.config.display());
    let mut use_case = TrainUseCase::new(corpus(&args.dirs), &args.dirs.artifact_dir)?;
    let report = use_case.run(params)?;

    println!(
        "Run {} done. Best epoch: {}. Test loss: {:.4}",
        report.key,
        report.best_epoch.map_or_else(|| "-".to_string(), |e| e.to_string()),
        report.objective(),
    );
    Ok(())
}

/// Handles the `sweep` subcommand.
fn run_sweep(args: SweepArgs) -> Result<()> {
    let plan = SweepPlan::try_from(&args)?;

    let driver    = TrainUseCase::new(corpus(&args.dirs), &args.dirs.artifact_dir)?;
    let mut sweep = SweepUseCase::new(driver, args.keep_going);
    let outcomes  = sweep.run(&plan)?;

    println!("\n{:<12} {:>9} {:>8}  test loss", "model", "dimension", "seed");
    for o in &outcomes {
        match &o.objective {
            Ok(loss) => println!("{:<12} {:>9} {:>8}  {:.4}", o.model, o.dimension, o.seed, loss),
            Err(e)   => println!("{:<12} {:>9} {:>8}  FAILED: {}", o.model, o.dimension, o.seed, e),
        }
    }
    Ok(())
}

/// Artifacts are named by canonical tag, so `--model LSTM` finds the
/// run trained as `lstm`
fn evaluate_key(args: &EvaluateArgs) -> Result<RunKey> {
    Ok(RunKey::new(ModelArch::canonical_tag(&args.model)?, args.seed))
}

/// Handles the `evaluate` subcommand.
fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let key      = evaluate_key(&args)?;
    let use_case = EvaluateUseCase::new(corpus(&args.dirs), &args.dirs.artifact_dir)?;
    let metrics  = use_case.evaluate(&key)?;

    println!("Run {}", key);
    println!("\t{}", metrics.summary());
    Ok(())
}
