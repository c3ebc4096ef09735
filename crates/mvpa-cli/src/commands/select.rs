//! Sample and feature selection

use clap::Args;
use std::path::PathBuf;
use tracing::info;

use mvpa_core::select::{filter_indices, AttrFilter};
use mvpa_core::{Dataset, MvpaError};

use super::common::save;
use crate::error::CliResult;
use crate::registry::Execute;
use crate::session::Session;

/// Select samples and features by attribute or index
#[derive(Args, Debug)]
pub struct SelectCommand {
    /// Dataset or session:NAME
    pub input: String,

    /// Keep samples matching NAME==V1,V2 / NAME!=V / NAME<V / NAME>=V ... (repeatable, AND-ed)
    #[arg(long = "samples-by-attr", value_name = "EXPR")]
    pub samples_by_attr: Vec<AttrFilter>,

    /// Keep features matching an attribute expression (repeatable, AND-ed)
    #[arg(long = "features-by-attr", value_name = "EXPR")]
    pub features_by_attr: Vec<AttrFilter>,

    /// Keep samples with these indices
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub sample_ids: Vec<usize>,

    /// Keep features with these indices
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub feature_ids: Vec<usize>,

    /// Remove these sample attributes
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub strip_sa: Vec<String>,

    /// Remove these feature attributes
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub strip_fa: Vec<String>,

    /// Output dataset
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Indices passing the filters, further restricted to `ids` when given
fn chosen(ids: &[usize], mut keep: Vec<usize>, what: &str) -> CliResult<Vec<usize>> {
    if !ids.is_empty() {
        keep.retain(|i| ids.contains(i));
    }
    if keep.is_empty() {
        return Err(MvpaError::EmptySelection {
            reason: format!("no {} selected", what),
        }
        .into());
    }
    Ok(keep)
}

pub fn apply(cmd: &SelectCommand, ds: &Dataset) -> CliResult<Dataset> {
    for &id in &cmd.sample_ids {
        if id >= ds.nsamples() {
            return Err(MvpaError::param(format!("sample id {} out of range 0..{}", id, ds.nsamples())).into());
        }
    }
    for &id in &cmd.feature_ids {
        if id >= ds.nfeatures() {
            return Err(MvpaError::param(format!("feature id {} out of range 0..{}", id, ds.nfeatures())).into());
        }
    }
    let samples = filter_indices(ds.sa(), "sa", ds.nsamples(), &cmd.samples_by_attr)?;
    let samples = chosen(&cmd.sample_ids, samples, "samples")?;
    let features = filter_indices(ds.fa(), "fa", ds.nfeatures(), &cmd.features_by_attr)?;
    let features = chosen(&cmd.feature_ids, features, "features")?;

    let mut out = ds.select_samples(&samples)?.select_features(&features)?;
    for name in &cmd.strip_sa {
        out.remove_sa(name);
    }
    for name in &cmd.strip_fa {
        out.remove_fa(name);
    }
    Ok(out)
}

impl Execute for SelectCommand {
    const NAME: &'static str = "select";
    const ABOUT: &'static str = "Select samples and features";

    fn execute(self, session: &mut Session) -> CliResult<()> {
        let ds = session.resolve_dataset(&self.input)?;
        let out = apply(&self, &ds)?;
        info!(
            "Selected {} of {} samples and {} of {} features",
            out.nsamples(),
            ds.nsamples(),
            out.nfeatures(),
            ds.nfeatures()
        );
        save(&out, &self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use mvpa_core::Attribute;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        cmd: SelectCommand,
    }

    fn parse(args: &[&str]) -> SelectCommand {
        let mut argv = vec!["select", "in.json", "-o", "out.json"];
        argv.extend_from_slice(args);
        Wrapper::parse_from(argv).cmd
    }

    fn dataset() -> Dataset {
        let mut ds = Dataset::from_rows(vec![vec![0.0, 1.0, 2.0]; 4]).unwrap();
        ds.set_sa("targets", Attribute::Str(vec!["a".into(), "b".into(), "a".into(), "c".into()]))
            .unwrap();
        ds.set_sa("chunks", Attribute::Int(vec![0, 0, 1, 1])).unwrap();
        ds.set_fa("roi", Attribute::Int(vec![1, 2, 2])).unwrap();
        ds
    }

    #[test]
    fn filters_are_and_combined() {
        let cmd = parse(&["--samples-by-attr", "targets!=c", "--samples-by-attr", "chunks<1"]);
        let out = apply(&cmd, &dataset()).unwrap();
        assert_eq!(out.nsamples(), 2);
        assert_eq!(out.labels("targets").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn ids_and_stripping() {
        let cmd = parse(&["--features-by-attr", "roi==2", "--feature-ids", "2", "--strip-sa", "chunks"]);
        let out = apply(&cmd, &dataset()).unwrap();
        assert_eq!(out.nfeatures(), 1);
        assert_eq!(out.samples()[[0, 0]], 2.0);
        assert!(out.sa_get("chunks").is_err());
    }

    #[test]
    fn empty_selection_fails() {
        let cmd = parse(&["--samples-by-attr", "targets==zzz"]);
        let err = apply(&cmd, &dataset()).unwrap_err();
        assert_eq!(err.kind_name(), "SelectionError");
        assert!(apply(&parse(&["--sample-ids", "9"]), &dataset()).is_err());
    }
}
