//! Label atlases on a voxel grid
//!
//! An atlas is stored as JSON:
//!
//! ```json
//! { "name": "toy", "shape": [2, 2, 1],
//!   "labels": { "1": "left", "2": "right" },
//!   "data": [1, 2, 1, 0] }
//! ```
//!
//! `data` holds one region id per voxel in C order; id 0 is background.

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::channels;
use crate::error::{MvpaError, Result};

/// Label for coordinates outside the atlas, on background or without a name
pub const UNLABELED: &str = "unlabeled";

/// Region atlas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atlas {
    /// Atlas name
    pub name: String,
    /// Grid shape
    pub shape: Vec<usize>,
    /// Region names by id
    pub labels: BTreeMap<i64, String>,
    /// Region id per voxel, C order
    pub data: Vec<i64>,
}

impl Atlas {
    /// Parse and validate an atlas from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let atlas: Atlas = serde_json::from_str(text)?;
        let expected: usize = atlas.shape.iter().product();
        if atlas.shape.is_empty() || expected != atlas.data.len() {
            return Err(MvpaError::format(format!(
                "atlas '{}' has {} voxels for shape {:?}",
                atlas.name,
                atlas.data.len(),
                atlas.shape
            )));
        }
        Ok(atlas)
    }

    /// Load an atlas file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| MvpaError::io(path, e))?;
        let atlas = Self::from_json(&text)?;
        debug!(
            target: channels::ATLAS,
            "loaded atlas '{}' {:?} with {} labels",
            atlas.name,
            atlas.shape,
            atlas.labels.len()
        );
        Ok(atlas)
    }

    /// Region id at the given coordinates, `None` outside the grid
    pub fn region_at(&self, coords: &[i64]) -> Option<i64> {
        if coords.len() != self.shape.len() {
            return None;
        }
        let mut index = 0usize;
        for (&c, &dim) in coords.iter().zip(&self.shape) {
            if c < 0 || c as usize >= dim {
                return None;
            }
            index = index * dim + c as usize;
        }
        self.data.get(index).copied()
    }

    /// Region name at the given coordinates
    pub fn label_at(&self, coords: &[i64]) -> &str {
        let label = match self.region_at(coords) {
            Some(0) | None => UNLABELED,
            Some(id) => self.labels.get(&id).map(String::as_str).unwrap_or(UNLABELED),
        };
        trace!(target: channels::ATLAS, "{:?} -> {}", coords, label);
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOY: &str = r#"{ "name": "toy", "shape": [2, 2, 1],
        "labels": { "1": "left", "2": "right" },
        "data": [1, 2, 1, 0] }"#;

    #[test]
    fn labels_follow_c_order() {
        let atlas = Atlas::from_json(TOY).unwrap();
        assert_eq!(atlas.label_at(&[0, 0, 0]), "left");
        assert_eq!(atlas.label_at(&[0, 1, 0]), "right");
        assert_eq!(atlas.label_at(&[1, 1, 0]), UNLABELED);
        assert_eq!(atlas.label_at(&[2, 0, 0]), UNLABELED);
        assert_eq!(atlas.label_at(&[0, 0]), UNLABELED);
    }

    #[test]
    fn shape_must_match_data() {
        let bad = r#"{ "name": "bad", "shape": [3], "labels": {}, "data": [1] }"#;
        assert!(Atlas::from_json(bad).is_err());
    }
}
