// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Two append-only artifacts per run (model kind, seed):
//
//   metrics_<kind>_<seed>.csv  — one row per epoch
//   results_<kind>_<seed>.txt  — one line per finished cycle with
//                                the final validation/test numbers
//
// Example CSV output:
//   epoch,train_loss,train_ppl,valid_loss,valid_ppl,valid_acc,lr,improved,secs
//   1,6.912300,1004.512,6.501200,666.020,0.081000,0.00199,true,41.2
//   2,6.104500,447.950,6.220100,502.790,0.094000,0.00197,true,40.8
//
// Perplexity = exp(loss): the effective number of equally likely
// next tokens the model is choosing between. Lower is better.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use crate::domain::hyperparams::RunKey;

// ─── EvalResult ───────────────────────────────────────────────────────────────
/// Output of one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalResult {
    /// Mean cross-entropy per window
    pub loss: f64,

    /// Fraction of arg-max predictions equal to the target, in [0, 1]
    pub accuracy: f64,
}

impl EvalResult {
    pub fn perplexity(&self) -> f64 {
        self.loss.exp()
    }
}

// ─── EpochMetrics ─────────────────────────────────────────────────────────────
/// One row of metrics for a single training epoch
#[derive(Debug, Clone)]
pub struct EpochMetrics {
    /// 1-based
    pub epoch: usize,

    pub train_loss: f64,

    pub valid: EvalResult,

    /// Learning rate in effect after the epoch's last step
    pub learning_rate: f64,

    /// Whether this epoch set a new best validation loss
    /// (and therefore overwrote the checkpoint)
    pub improved: bool,

    pub elapsed_secs: f64,
}

/// The numbers reported after the best checkpoint is reloaded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalMetrics {
    pub valid: EvalResult,
    pub test:  EvalResult,
}

impl FinalMetrics {
    pub fn summary(&self) -> String {
        format!(
            "Val. Loss: {:.3} | Val. ppl: {:.3} | Val. Accuracy: {:.3}\tTest Loss: {:.3} | Test ppl: {:.3} | Test Accuracy: {:.3}",
            self.valid.loss, self.valid.perplexity(), self.valid.accuracy,
            self.test.loss,  self.test.perplexity(),  self.test.accuracy,
        )
    }
}

// ─── MetricsLogger ────────────────────────────────────────────────────────────
pub struct MetricsLogger {
    csv_path:     PathBuf,
    results_path: PathBuf,
}

impl MetricsLogger {
    /// Logger for the run `key`; a new CSV gets its header row first.
    pub fn new(dir: impl Into<PathBuf>, key: &RunKey) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create metrics dir '{}'", dir.display()))?;

        let csv_path     = dir.join(format!("metrics_{}.csv", key.stem()));
        let results_path = dir.join(format!("results_{}.txt", key.stem()));

        // Header only for a new file, so reruns append to the same log
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "epoch,train_loss,train_ppl,valid_loss,valid_ppl,valid_acc,lr,improved,secs")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path, results_path })
    }

    /// One CSV row per finished epoch
    pub fn log_epoch(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.3},{:.6},{:.3},{:.6},{:.6e},{},{:.1}",
            m.epoch,
            m.train_loss,
            m.train_loss.exp(),
            m.valid.loss,
            m.valid.perplexity(),
            m.valid.accuracy,
            m.learning_rate,
            m.improved,
            m.elapsed_secs,
        )?;
        Ok(())
    }

    /// Append the final validation/test record.
    pub fn append_final(&self, m: &FinalMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.results_path)
            .with_context(|| format!("Cannot open '{}'", self.results_path.display()))?;
        writeln!(f, "{}", m.summary())?;
        tracing::debug!("Appended final metrics to '{}'", self.results_path.display());
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }

    pub fn results_path(&self) -> &PathBuf {
        &self.results_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn eval(loss: f64, accuracy: f64) -> EvalResult {
        EvalResult { loss, accuracy }
    }

    #[test]
    fn test_perplexity_is_exp_loss() {
        assert!((eval(0.0, 1.0).perplexity() - 1.0).abs() < 1e-12);
        assert!((eval(2.0, 0.5).perplexity() - 2.0f64.exp()).abs() < 1e-12);
    }

    #[test]
    fn test_csv_rows_append() {
        let dir    = tempfile::tempdir().unwrap();
        let key    = RunKey::new("lstm", 11);
        let logger = MetricsLogger::new(dir.path(), &key).unwrap();

        for epoch in 1..=2 {
            logger.log_epoch(&EpochMetrics {
                epoch,
                train_loss:    3.0,
                valid:         eval(2.5, 0.25),
                learning_rate: 1e-3,
                improved:      epoch == 1,
                elapsed_secs:  1.0,
            }).unwrap();
        }

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("epoch,"));
        assert!(lines[1].starts_with("1,3.000000,"));
        assert!(lines[2].contains(",false,"));
    }

    #[test]
    fn test_final_record_appends() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path(), &RunKey::new("fnet", 2)).unwrap();
        let m      = FinalMetrics { valid: eval(1.0, 0.5), test: eval(1.5, 0.4) };

        logger.append_final(&m).unwrap();
        logger.append_final(&m).unwrap();

        let text = fs::read_to_string(logger.results_path()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("Test Accuracy: 0.400"));
    }
}
