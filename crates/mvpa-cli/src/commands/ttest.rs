//! Per-feature one-sample t-test

use clap::{Args, ValueEnum};
use ndarray::{Array2, Axis};
use std::path::PathBuf;
use tracing::info;

use mvpa_core::stats::{ttest_features, Alternative};
use mvpa_core::{Attribute, Dataset};

use super::common::save;
use crate::error::CliResult;
use crate::registry::Execute;
use crate::session::Session;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlternativeArg {
    TwoSided,
    Greater,
    Less,
}

impl From<AlternativeArg> for Alternative {
    fn from(a: AlternativeArg) -> Self {
        match a {
            AlternativeArg::TwoSided => Alternative::TwoSided,
            AlternativeArg::Greater => Alternative::Greater,
            AlternativeArg::Less => Alternative::Less,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stat {
    T,
    P,
}

/// Test every feature's mean across samples against a reference value
#[derive(Args, Debug)]
pub struct TtestCommand {
    /// Datasets or session:NAME, stacked vertically
    #[arg(required = true, num_args = 1..)]
    pub inputs: Vec<String>,

    /// Reference mean
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub mu: f64,

    /// Alternative hypothesis
    #[arg(long, value_enum, default_value = "two-sided")]
    pub alternative: AlternativeArg,

    /// Only output this statistic
    #[arg(long, value_enum)]
    pub stat: Option<Stat>,

    /// Output dataset
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Result dataset with one sample per statistic and the input's feature attributes
pub fn ttest_dataset(ds: &Dataset, mu: f64, alternative: Alternative, stat: Option<Stat>) -> CliResult<Dataset> {
    let result = ttest_features(ds, mu, alternative)?;
    let rows: Vec<(&str, &ndarray::Array1<f64>)> = match stat {
        Some(Stat::T) => vec![("t", &result.t)],
        Some(Stat::P) => vec![("p", &result.p)],
        None => vec![("t", &result.t), ("p", &result.p)],
    };
    let mut samples = Array2::zeros((rows.len(), ds.nfeatures()));
    for (mut row, (_, values)) in samples.axis_iter_mut(Axis(0)).zip(&rows) {
        row.assign(*values);
    }
    let mut out = Dataset::new(samples);
    out.set_sa("stat", Attribute::Str(rows.iter().map(|(n, _)| n.to_string()).collect()))?;
    for (name, attr) in ds.fa() {
        out.set_fa(name.clone(), attr.clone())?;
    }
    for (name, attr) in ds.a() {
        out.set_a(name.clone(), attr.clone());
    }
    Ok(out)
}

impl Execute for TtestCommand {
    const NAME: &'static str = "ttest";
    const ABOUT: &'static str = "One-sample t-test per feature";

    fn execute(self, session: &mut Session) -> CliResult<()> {
        let ds = session.resolve_stacked(&self.inputs)?;
        info!(
            "t-test of {} samples x {} features against {}",
            ds.nsamples(),
            ds.nfeatures(),
            self.mu
        );
        let out = ttest_dataset(&ds, self.mu, self.alternative.into(), self.stat)?;
        save(&out, &self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_rows_and_attributes() {
        let mut ds = Dataset::from_rows(vec![vec![1.0, 5.0], vec![2.0, 5.0], vec![3.0, 5.0]]).unwrap();
        ds.set_fa("roi", Attribute::Int(vec![1, 2])).unwrap();

        let out = ttest_dataset(&ds, 0.0, Alternative::TwoSided, None).unwrap();
        assert_eq!(out.shape(), (2, 2));
        assert_eq!(out.labels("stat").unwrap(), vec!["t", "p"]);
        // mean 2, sd 1, n 3
        assert!((out.samples()[[0, 0]] - 2.0 * 3f64.sqrt()).abs() < 1e-12);
        assert!(out.samples()[[0, 1]].is_infinite());
        assert_eq!(out.samples()[[1, 1]], 0.0);
        assert_eq!(out.fa_get("roi").unwrap(), ds.fa_get("roi").unwrap());

        let only_p = ttest_dataset(&ds, 0.0, Alternative::Greater, Some(Stat::P)).unwrap();
        assert_eq!(only_p.nsamples(), 1);
    }

    #[test]
    fn needs_two_samples() {
        let ds = Dataset::from_rows(vec![vec![1.0]]).unwrap();
        assert!(ttest_dataset(&ds, 0.0, Alternative::TwoSided, None).is_err());
    }
}
