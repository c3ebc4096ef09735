//! Dataset construction from text files and existing datasets

use clap::Args;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use mvpa_core::io::{parse_text_matrix, read_lines, read_text_dataset};
use mvpa_core::{Attribute, Dataset, MvpaError};

use super::common::{attribute_from_values, parse_assignment, save};
use crate::error::{CliError, CliResult};
use crate::registry::Execute;
use crate::session::Session;

/// Build a dataset and attach attributes
#[derive(Args, Debug)]
pub struct MkdsCommand {
    /// Text matrix, one sample per line (repeatable, stacked vertically)
    #[arg(long = "txt-data", value_name = "FILE", conflicts_with = "from_dataset")]
    pub txt_data: Vec<PathBuf>,

    /// Existing dataset or session:NAME (repeatable, stacked vertically)
    #[arg(long = "from-dataset", value_name = "DS")]
    pub from_dataset: Vec<String>,

    /// Sample attribute from literal values
    #[arg(long = "add-sa", value_name = "NAME=V1,V2,..")]
    pub add_sa: Vec<String>,

    /// Feature attribute from literal values
    #[arg(long = "add-fa", value_name = "NAME=V1,V2,..")]
    pub add_fa: Vec<String>,

    /// Sample attribute from a file with one value per line
    #[arg(long = "add-sa-attr", num_args = 2, value_names = ["NAME", "FILE"])]
    pub add_sa_attr: Vec<String>,

    /// Feature attribute from a file with one value per line
    #[arg(long = "add-fa-attr", num_args = 2, value_names = ["NAME", "FILE"])]
    pub add_fa_attr: Vec<String>,

    /// Voxel grid (e.g. 4x4x2) generating fa.voxel_indices in C order
    #[arg(long, value_name = "XxYxZ")]
    pub grid: Option<String>,

    /// Feature mask with one 0/1 value per feature; keeps non-zero features
    #[arg(long, value_name = "FILE")]
    pub mask: Option<PathBuf>,

    /// Output dataset
    #[arg(short, long)]
    pub output: PathBuf,
}

impl Execute for MkdsCommand {
    const NAME: &'static str = "mkds";
    const ABOUT: &'static str = "Create a dataset from text files or other datasets";

    fn execute(self, session: &mut Session) -> CliResult<()> {
        let mut ds = if !self.txt_data.is_empty() {
            let parts = self
                .txt_data
                .iter()
                .map(read_text_dataset)
                .collect::<Result<Vec<_>, _>>()?;
            Dataset::vstack(&parts)?
        } else if !self.from_dataset.is_empty() {
            session.resolve_stacked(&self.from_dataset)?
        } else {
            return Err(CliError::invalid_args("give --txt-data or --from-dataset"));
        };
        info!("Input has {} samples x {} features", ds.nsamples(), ds.nfeatures());

        for spec in &self.add_sa {
            let (name, values) = parse_assignment(spec)?;
            let attr = attribute_from_values(&name, &values, ds.nsamples())?;
            ds.set_sa(name, attr)?;
        }
        for spec in &self.add_fa {
            let (name, values) = parse_assignment(spec)?;
            let attr = attribute_from_values(&name, &values, ds.nfeatures())?;
            ds.set_fa(name, attr)?;
        }
        for pair in self.add_sa_attr.chunks(2) {
            let attr = attribute_file(&pair[1])?;
            ds.set_sa(pair[0].clone(), attr)?;
        }
        for pair in self.add_fa_attr.chunks(2) {
            let attr = attribute_file(&pair[1])?;
            ds.set_fa(pair[0].clone(), attr)?;
        }
        if let Some(grid) = &self.grid {
            let shape = parse_grid(grid)?;
            ds.set_fa("voxel_indices", grid_coords(&shape, ds.nfeatures())?)?;
        }
        if let Some(mask) = &self.mask {
            let keep = mask_indices(mask, ds.nfeatures())?;
            debug!("mask keeps {} of {} features", keep.len(), ds.nfeatures());
            ds = ds.select_features(&keep)?;
        }

        save(&ds, &self.output)
    }
}

fn attribute_file(path: &str) -> CliResult<Attribute> {
    Ok(Attribute::infer(&read_lines(path)?))
}

/// Parse `4x4x2` into its dimensions
pub fn parse_grid(spec: &str) -> CliResult<Vec<usize>> {
    let shape = spec
        .split(['x', 'X'])
        .map(|d| d.trim().parse::<usize>().ok().filter(|&d| d > 0))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| CliError::invalid_args(format!("invalid grid '{}'", spec)))?;
    Ok(shape)
}

/// Coordinates of every cell of `shape` in C order
pub fn grid_coords(shape: &[usize], nfeatures: usize) -> CliResult<Attribute> {
    let total: usize = shape.iter().product();
    if total != nfeatures {
        return Err(MvpaError::shape(format!(
            "grid {:?} has {} cells but the dataset has {} features",
            shape, total, nfeatures
        ))
        .into());
    }
    let coords = (0..total)
        .map(|mut index| {
            let mut c = vec![0i64; shape.len()];
            for (slot, &dim) in c.iter_mut().zip(shape).rev() {
                *slot = (index % dim) as i64;
                index /= dim;
            }
            c
        })
        .collect();
    Ok(Attribute::Coords(coords))
}

fn mask_indices(path: &Path, nfeatures: usize) -> CliResult<Vec<usize>> {
    let values: Vec<f64> = parse_text_matrix(&read_lines(path)?)?.into_iter().flatten().collect();
    if values.len() != nfeatures {
        return Err(MvpaError::shape(format!(
            "mask has {} values but the dataset has {} features",
            values.len(),
            nfeatures
        ))
        .into());
    }
    let keep: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(i, &v)| (v != 0.0).then_some(i))
        .collect();
    if keep.is_empty() {
        return Err(MvpaError::EmptySelection {
            reason: "mask excludes every feature".into(),
        }
        .into());
    }
    Ok(keep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_is_c_ordered() {
        let shape = parse_grid("2x1x3").unwrap();
        let coords = grid_coords(&shape, 6).unwrap();
        let coords = coords.as_coords().unwrap();
        assert_eq!(coords[0], vec![0, 0, 0]);
        assert_eq!(coords[1], vec![0, 0, 1]);
        assert_eq!(coords[3], vec![1, 0, 0]);
        assert!(grid_coords(&shape, 5).is_err());
        assert!(parse_grid("2x0").is_err());
        assert!(parse_grid("axb").is_err());
    }
}
