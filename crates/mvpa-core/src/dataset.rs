//! The samples x features dataset and its attribute collections

use log::debug;
use ndarray::{concatenate, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::attr::{AttrValue, Attribute, Collection};
use crate::channels;
use crate::error::{MvpaError, Result};

/// Samples matrix with sample, feature and dataset attributes
///
/// Every sample attribute has one entry per row of `samples`, every feature
/// attribute one entry per column. The setters enforce this; the fields are
/// private so a loaded dataset cannot be put into an inconsistent state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    samples: Array2<f64>,
    #[serde(default)]
    sa: Collection,
    #[serde(default)]
    fa: Collection,
    #[serde(default)]
    a: Collection,
}

impl Dataset {
    /// Create a dataset without attributes
    pub fn new(samples: Array2<f64>) -> Self {
        Self {
            samples,
            sa: BTreeMap::new(),
            fa: BTreeMap::new(),
            a: BTreeMap::new(),
        }
    }

    /// Create a dataset from row vectors
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let nfeatures = rows.first().map(Vec::len).unwrap_or(0);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != nfeatures) {
            return Err(MvpaError::shape(format!(
                "row {} has {} values, expected {}",
                i,
                row.len(),
                nfeatures
            )));
        }
        let nsamples = rows.len();
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let samples = Array2::from_shape_vec((nsamples, nfeatures), flat)
            .map_err(|e| MvpaError::shape(e.to_string()))?;
        Ok(Self::new(samples))
    }

    /// Number of samples (rows)
    pub fn nsamples(&self) -> usize {
        self.samples.nrows()
    }

    /// Number of features (columns)
    pub fn nfeatures(&self) -> usize {
        self.samples.ncols()
    }

    /// Shape as `(nsamples, nfeatures)`
    pub fn shape(&self) -> (usize, usize) {
        (self.nsamples(), self.nfeatures())
    }

    /// Samples matrix
    pub fn samples(&self) -> &Array2<f64> {
        &self.samples
    }

    /// Mutable samples matrix; the shape cannot change through this
    pub fn samples_mut(&mut self) -> ndarray::ArrayViewMut2<'_, f64> {
        self.samples.view_mut()
    }

    /// Sample attributes
    pub fn sa(&self) -> &Collection {
        &self.sa
    }

    /// Feature attributes
    pub fn fa(&self) -> &Collection {
        &self.fa
    }

    /// Dataset attributes
    pub fn a(&self) -> &Collection {
        &self.a
    }

    /// Look up a sample attribute
    pub fn sa_get(&self, name: &str) -> Result<&Attribute> {
        self.sa.get(name).ok_or_else(|| MvpaError::MissingAttribute {
            collection: "sa",
            name: name.to_string(),
        })
    }

    /// Look up a feature attribute
    pub fn fa_get(&self, name: &str) -> Result<&Attribute> {
        self.fa.get(name).ok_or_else(|| MvpaError::MissingAttribute {
            collection: "fa",
            name: name.to_string(),
        })
    }

    /// Look up a dataset attribute
    pub fn a_get(&self, name: &str) -> Result<&Attribute> {
        self.a.get(name).ok_or_else(|| MvpaError::MissingAttribute {
            collection: "a",
            name: name.to_string(),
        })
    }

    /// Set a sample attribute, checking its length
    pub fn set_sa(&mut self, name: impl Into<String>, attr: Attribute) -> Result<()> {
        let name = name.into();
        if attr.len() != self.nsamples() {
            return Err(MvpaError::shape(format!(
                "sample attribute '{}' has {} entries for {} samples",
                name,
                attr.len(),
                self.nsamples()
            )));
        }
        debug!(target: channels::DATASET, "set sa.{} ({})", name, attr.type_name());
        self.sa.insert(name, attr);
        Ok(())
    }

    /// Set a feature attribute, checking its length
    pub fn set_fa(&mut self, name: impl Into<String>, attr: Attribute) -> Result<()> {
        let name = name.into();
        if attr.len() != self.nfeatures() {
            return Err(MvpaError::shape(format!(
                "feature attribute '{}' has {} entries for {} features",
                name,
                attr.len(),
                self.nfeatures()
            )));
        }
        debug!(target: channels::DATASET, "set fa.{} ({})", name, attr.type_name());
        self.fa.insert(name, attr);
        Ok(())
    }

    /// Set a dataset attribute (any length)
    pub fn set_a(&mut self, name: impl Into<String>, attr: Attribute) {
        self.a.insert(name.into(), attr);
    }

    /// Remove a sample attribute, returning it if present
    pub fn remove_sa(&mut self, name: &str) -> Option<Attribute> {
        self.sa.remove(name)
    }

    /// Remove a feature attribute, returning it if present
    pub fn remove_fa(&mut self, name: &str) -> Option<Attribute> {
        self.fa.remove(name)
    }

    /// New dataset holding the samples at `indices`, in that order
    pub fn select_samples(&self, indices: &[usize]) -> Result<Dataset> {
        self.check_indices(indices, self.nsamples(), "sample")?;
        Ok(Dataset {
            samples: self.samples.select(Axis(0), indices),
            sa: self.sa.iter().map(|(k, v)| (k.clone(), v.take(indices))).collect(),
            fa: self.fa.clone(),
            a: self.a.clone(),
        })
    }

    /// New dataset holding the features at `indices`, in that order
    pub fn select_features(&self, indices: &[usize]) -> Result<Dataset> {
        self.check_indices(indices, self.nfeatures(), "feature")?;
        Ok(Dataset {
            samples: self.samples.select(Axis(1), indices),
            sa: self.sa.clone(),
            fa: self.fa.iter().map(|(k, v)| (k.clone(), v.take(indices))).collect(),
            a: self.a.clone(),
        })
    }

    fn check_indices(&self, indices: &[usize], bound: usize, what: &str) -> Result<()> {
        match indices.iter().find(|&&i| i >= bound) {
            Some(i) => Err(MvpaError::param(format!(
                "{} index {} out of range (0..{})",
                what, i, bound
            ))),
            None => Ok(()),
        }
    }

    /// Stack datasets vertically (more samples, same features)
    ///
    /// Sample attributes must be present in every dataset; feature and
    /// dataset attributes are taken from the first one.
    pub fn vstack(datasets: &[Dataset]) -> Result<Dataset> {
        let first = datasets
            .first()
            .ok_or_else(|| MvpaError::param("no datasets to stack"))?;
        if datasets.len() == 1 {
            return Ok(first.clone());
        }
        for (i, ds) in datasets.iter().enumerate().skip(1) {
            if ds.nfeatures() != first.nfeatures() {
                return Err(MvpaError::shape(format!(
                    "dataset {} has {} features, expected {}",
                    i,
                    ds.nfeatures(),
                    first.nfeatures()
                )));
            }
            if ds.sa.keys().ne(first.sa.keys()) {
                return Err(MvpaError::shape(format!(
                    "dataset {} has different sample attributes",
                    i
                )));
            }
        }
        let views: Vec<_> = datasets.iter().map(|d| d.samples.view()).collect();
        let samples =
            concatenate(Axis(0), &views).map_err(|e| MvpaError::shape(e.to_string()))?;
        let mut sa = Collection::new();
        for name in first.sa.keys() {
            let mut col = first.sa[name].clone();
            for ds in &datasets[1..] {
                col = col.concat(&ds.sa[name])?;
            }
            sa.insert(name.clone(), col);
        }
        debug!(
            target: channels::DATASET,
            "vstacked {} datasets into {:?}",
            datasets.len(),
            samples.dim()
        );
        Ok(Dataset {
            samples,
            sa,
            fa: first.fa.clone(),
            a: first.a.clone(),
        })
    }

    /// Targets as labels
    pub fn labels(&self, attr: &str) -> Result<Vec<String>> {
        Ok(self.sa_get(attr)?.labels())
    }

    /// Sample counts per `(row value, column value)` of two sample attributes
    pub fn count_table(&self, rows: &str, cols: &str) -> Result<CountTable> {
        let r = self.sa_get(rows)?;
        let c = self.sa_get(cols)?;
        let row_values = r.unique();
        let col_values = c.unique();
        let mut counts = vec![vec![0usize; col_values.len()]; row_values.len()];
        for i in 0..self.nsamples() {
            let ri = row_values.binary_search(&r.get(i)).unwrap_or(0);
            let ci = col_values.binary_search(&c.get(i)).unwrap_or(0);
            counts[ri][ci] += 1;
        }
        Ok(CountTable {
            row_values,
            col_values,
            counts,
        })
    }
}

/// Contingency table of two sample attributes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountTable {
    /// Unique values of the row attribute
    pub row_values: Vec<AttrValue>,
    /// Unique values of the column attribute
    pub col_values: Vec<AttrValue>,
    /// `counts[row][col]`
    pub counts: Vec<Vec<usize>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn toy() -> Dataset {
        let mut ds = Dataset::new(array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        ds.set_sa("targets", Attribute::Str(vec!["a".into(), "b".into(), "a".into()]))
            .unwrap();
        ds.set_sa("chunks", Attribute::Int(vec![0, 0, 1])).unwrap();
        ds.set_fa("voxel_indices", Attribute::Coords(vec![vec![0, 0, 0], vec![1, 0, 0]]))
            .unwrap();
        ds
    }

    #[test]
    fn attribute_lengths_are_enforced() {
        let mut ds = toy();
        assert!(ds.set_sa("bad", Attribute::Int(vec![1])).is_err());
        assert!(ds.set_fa("bad", Attribute::Int(vec![1, 2, 3])).is_err());
    }

    #[test]
    fn select_keeps_attributes_aligned() {
        let ds = toy();
        let sub = ds.select_samples(&[2, 0]).unwrap();
        assert_eq!(sub.samples(), &array![[5.0, 6.0], [1.0, 2.0]]);
        assert_eq!(sub.sa_get("chunks").unwrap(), &Attribute::Int(vec![1, 0]));

        let f = ds.select_features(&[1]).unwrap();
        assert_eq!(f.nfeatures(), 1);
        assert_eq!(
            f.fa_get("voxel_indices").unwrap(),
            &Attribute::Coords(vec![vec![1, 0, 0]])
        );
        assert!(ds.select_features(&[5]).is_err());
    }

    #[test]
    fn vstack_concatenates_sample_attributes() {
        let ds = toy();
        let stacked = Dataset::vstack(&[ds.clone(), ds]).unwrap();
        assert_eq!(stacked.shape(), (6, 2));
        assert_eq!(stacked.sa_get("chunks").unwrap().len(), 6);
    }

    #[test]
    fn count_table_counts_pairs() {
        let t = toy().count_table("targets", "chunks").unwrap();
        assert_eq!(t.counts, vec![vec![1, 1], vec![1, 0]]);
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        assert!(Dataset::from_rows(vec![vec![1.0], vec![1.0, 2.0]]).is_err());
    }
}
