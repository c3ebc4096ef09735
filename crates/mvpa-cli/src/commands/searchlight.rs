//! Sphere searchlight

use clap::Args;
use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::info;

use mvpa_core::searchlight::Searchlight;

use super::common::{save, CvArgs};
use crate::error::CliResult;
use crate::registry::Execute;
use crate::session::Session;

/// Cross-validate within a sphere around every feature
#[derive(Args, Debug)]
pub struct SearchlightCommand {
    /// Dataset or session:NAME
    pub input: String,

    #[command(flatten)]
    pub cv: CvArgs,

    /// Sphere radius in voxel units
    #[arg(long, default_value_t = 1.0)]
    pub radius: f64,

    /// Feature attribute with voxel coordinates
    #[arg(long, default_value = "voxel_indices")]
    pub coords_attr: String,

    /// Only use these features as sphere centres
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub center_ids: Vec<usize>,

    /// Average accuracies across folds
    #[arg(long)]
    pub mean: bool,

    /// Worker threads, 0 for all cores (default from configuration)
    #[arg(long)]
    pub nproc: Option<usize>,

    /// Output dataset
    #[arg(short, long)]
    pub output: PathBuf,
}

fn progress_bar(show: bool, len: usize) -> ProgressBar {
    if !show || !Term::stderr().is_term() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} centres ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

impl Execute for SearchlightCommand {
    const NAME: &'static str = "searchlight";
    const ABOUT: &'static str = "Searchlight cross-validation over feature neighbourhoods";

    fn execute(self, session: &mut Session) -> CliResult<()> {
        let ds = session.resolve_dataset(&self.input)?;
        let searchlight = Searchlight {
            cv: self.cv.cross_validation(),
            radius: self.radius,
            coords_attr: self.coords_attr.clone(),
            nproc: self.nproc.unwrap_or(session.config.searchlight.nproc),
        };
        let centers = (!self.center_ids.is_empty()).then_some(self.center_ids.as_slice());
        let ncenters = centers.map_or(ds.nfeatures(), <[usize]>::len);
        info!(
            "Searchlight with radius {} over {} centres on {} threads",
            searchlight.radius, ncenters, searchlight.nproc
        );

        let pb = progress_bar(session.config.output.progress, ncenters);
        let result = searchlight.run(&ds, centers, || pb.inc(1))?;
        pb.finish_and_clear();

        let out = searchlight.result_dataset(&ds, &result, self.mean)?;
        save(&out, &self.output)
    }
}
