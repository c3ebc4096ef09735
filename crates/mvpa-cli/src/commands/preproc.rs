//! Detrending, z-scoring and invariant-feature removal

use clap::Args;
use std::path::PathBuf;
use tracing::info;

use mvpa_core::mappers::{detrend, strip_invariant_features, zscore};
use mvpa_core::select::AttrFilter;

use super::common::save;
use crate::error::{CliError, CliResult};
use crate::registry::Execute;
use crate::session::Session;

/// Preprocess a dataset: detrend, then z-score, then strip invariant features
#[derive(Args, Debug)]
pub struct PreprocCommand {
    /// Dataset or session:NAME
    pub input: String,

    /// Remove Legendre polynomial trends up to this order
    #[arg(long, value_name = "ORDER")]
    pub poly_detrend: Option<usize>,

    /// Detrend each chunk of this sample attribute separately
    #[arg(long, value_name = "ATTR")]
    pub detrend_chunks_attr: Option<String>,

    /// Z-score every feature
    #[arg(long)]
    pub zscore: bool,

    /// Z-score each chunk of this sample attribute separately
    #[arg(long, value_name = "ATTR")]
    pub zscore_chunks_attr: Option<String>,

    /// Estimate z-score parameters from the samples matching ATTR=VALUES
    #[arg(long, value_name = "ATTR=VALUES")]
    pub zscore_baseline: Option<String>,

    /// Drop features without variance across samples
    #[arg(long)]
    pub strip_invariant_features: bool,

    /// Output dataset
    #[arg(short, long)]
    pub output: PathBuf,
}

impl Execute for PreprocCommand {
    const NAME: &'static str = "preproc";
    const ABOUT: &'static str = "Detrend, z-score and clean a dataset";

    fn execute(self, session: &mut Session) -> CliResult<()> {
        let baseline = self
            .zscore_baseline
            .as_deref()
            .map(|s| s.parse::<AttrFilter>())
            .transpose()?;
        if baseline.is_some() && !self.zscore {
            return Err(CliError::invalid_args("--zscore-baseline requires --zscore"));
        }

        let mut ds = session.resolve_dataset(&self.input)?;
        if let Some(order) = self.poly_detrend {
            info!("Detrending with polynomial order {}", order);
            detrend(&mut ds, order, self.detrend_chunks_attr.as_deref())?;
        }
        if self.zscore {
            info!("Z-scoring");
            zscore(&mut ds, self.zscore_chunks_attr.as_deref(), baseline.as_ref())?;
        }
        if self.strip_invariant_features {
            let before = ds.nfeatures();
            ds = strip_invariant_features(&ds)?;
            info!("Removed {} invariant features", before - ds.nfeatures());
        }
        save(&ds, &self.output)
    }
}
