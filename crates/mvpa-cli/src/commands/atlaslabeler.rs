//! Atlas labels for feature coordinates

use clap::Args;
use std::path::PathBuf;
use tracing::info;

use mvpa_core::atlas::{Atlas, UNLABELED};
use mvpa_core::{Attribute, Dataset, MvpaError};

use super::common::save;
use crate::error::{CliError, CliResult};
use crate::registry::Execute;
use crate::session::Session;

/// Label every feature with the atlas region at its coordinates
#[derive(Args, Debug)]
pub struct AtlasLabelerCommand {
    /// Dataset or session:NAME
    pub input: String,

    /// Atlas file (JSON)
    #[arg(long)]
    pub atlas: PathBuf,

    /// Feature attribute with voxel coordinates
    #[arg(long, default_value = "voxel_indices")]
    pub coords_attr: String,

    /// Shift added to coordinates before the lookup
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, value_name = "X,Y,Z")]
    pub coord_offset: Vec<i64>,

    /// Feature attribute receiving the labels
    #[arg(long, default_value = "atlas_label")]
    pub label_attr: String,

    /// Write the labelled dataset here; prints a table otherwise
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Region name per feature
pub fn label_features(ds: &Dataset, atlas: &Atlas, coords_attr: &str, offset: &[i64]) -> CliResult<Vec<String>> {
    let coords = ds
        .fa_get(coords_attr)?
        .as_coords()
        .ok_or_else(|| MvpaError::attribute(coords_attr, "not a coordinate attribute"))?;
    if !offset.is_empty() && coords.first().is_some_and(|c| c.len() != offset.len()) {
        return Err(CliError::invalid_args(format!(
            "offset has {} components, coordinates have {}",
            offset.len(),
            coords[0].len()
        )));
    }
    Ok(coords
        .iter()
        .map(|c| {
            let shifted: Vec<i64> = if offset.is_empty() {
                c.clone()
            } else {
                c.iter().zip(offset).map(|(a, b)| a + b).collect()
            };
            atlas.label_at(&shifted).to_string()
        })
        .collect())
}

impl Execute for AtlasLabelerCommand {
    const NAME: &'static str = "atlaslabeler";
    const ABOUT: &'static str = "Label features by atlas region";

    fn execute(self, session: &mut Session) -> CliResult<()> {
        let mut ds = session.resolve_dataset(&self.input)?;
        let atlas = Atlas::load(&self.atlas)?;
        let labels = label_features(&ds, &atlas, &self.coords_attr, &self.coord_offset)?;
        let unlabeled = labels.iter().filter(|l| *l == UNLABELED).count();
        info!(
            "Labelled {} features with atlas '{}' ({} unlabeled)",
            labels.len(),
            atlas.name,
            unlabeled
        );

        match &self.output {
            Some(path) => {
                ds.set_fa(self.label_attr.clone(), Attribute::Str(labels))?;
                save(&ds, path)
            }
            None => {
                let coords = ds.fa_get(&self.coords_attr)?.values();
                for (i, (c, label)) in coords.iter().zip(&labels).enumerate() {
                    println!("{}\t{}\t{}", i, c, label);
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_with_offset() {
        let atlas = Atlas::from_json(
            r#"{ "name": "toy", "shape": [2, 2], "labels": { "1": "left", "2": "right" }, "data": [1, 2, 0, 2] }"#,
        )
        .unwrap();
        let mut ds = Dataset::from_rows(vec![vec![0.0; 3]]).unwrap();
        ds.set_fa("voxel_indices", Attribute::Coords(vec![vec![0, 0], vec![0, 1], vec![5, 5]]))
            .unwrap();
        assert_eq!(
            label_features(&ds, &atlas, "voxel_indices", &[]).unwrap(),
            vec!["left", "right", UNLABELED]
        );
        assert_eq!(
            label_features(&ds, &atlas, "voxel_indices", &[1, 0]).unwrap(),
            vec![UNLABELED, "right", UNLABELED]
        );
        assert!(label_features(&ds, &atlas, "voxel_indices", &[1]).is_err());
    }
}
