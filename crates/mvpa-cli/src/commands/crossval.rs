//! Cross-validated classification

use clap::Args;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::info;

use mvpa_core::crossval::{ConfusionMatrix, CrossValidation, CvResult, PermutationResult};

use super::common::{write_json, CvArgs};
use crate::error::CliResult;
use crate::registry::Execute;
use crate::session::Session;

/// Cross-validate a classifier over chunks
#[derive(Args, Debug)]
pub struct CrossvalCommand {
    /// Dataset or session:NAME
    pub input: String,

    #[command(flatten)]
    pub cv: CvArgs,

    /// Label permutations for a null distribution (0 = none)
    #[arg(long, default_value_t = 0)]
    pub permutations: usize,

    /// Seed of the permutation generator
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Write the result as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    setup: &'a CrossValidation,
    mean_accuracy: f64,
    result: &'a CvResult,
    permutation: Option<&'a PermutationResult>,
}

fn confusion_text(cm: &ConfusionMatrix) -> String {
    let width = cm.labels.iter().map(String::len).max().unwrap_or(0).max(6) + 2;
    let mut out = format!("{:<width$}", "", width = width);
    for label in &cm.labels {
        let _ = write!(out, "{:>width$}", label, width = width);
    }
    for (label, row) in cm.labels.iter().zip(&cm.counts) {
        let _ = write!(out, "\n{:<width$}", label, width = width);
        for count in row {
            let _ = write!(out, "{:>width$}", count, width = width);
        }
    }
    out
}

impl Execute for CrossvalCommand {
    const NAME: &'static str = "crossval";
    const ABOUT: &'static str = "Cross-validated classification";

    fn execute(self, session: &mut Session) -> CliResult<()> {
        let ds = session.resolve_dataset(&self.input)?;
        let cv = self.cv.cross_validation();
        info!("Cross-validating {} with {:?}", cv.clf, cv.partitioner);

        let result = cv.run(&ds)?;
        let permutation = if self.permutations > 0 {
            Some(cv.permutation_test(&ds, self.permutations, self.seed)?)
        } else {
            None
        };

        for (i, fold) in result.folds.iter().enumerate() {
            println!(
                "fold {:>3}  test chunks [{}]  train {:>4}  test {:>4}  accuracy {:.3}",
                i,
                fold.test_chunks.join(", "),
                fold.ntrain,
                fold.ntest,
                fold.accuracy
            );
        }
        println!("mean accuracy {:.3}", result.mean_accuracy());
        println!("confusion (rows: targets, columns: predictions)\n{}", confusion_text(&result.confusion));
        if let Some(p) = &permutation {
            println!("permutation p-value {:.4} ({} permutations)", p.p_value, p.null.len());
        }

        if let Some(path) = &self.output {
            let report = Report {
                setup: &cv,
                mean_accuracy: result.mean_accuracy(),
                result: &result,
                permutation: permutation.as_ref(),
            };
            write_json(&report, Some(path))?;
        }
        Ok(())
    }
}
