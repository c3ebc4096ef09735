//! Sphere searchlight
//!
//! For every centre feature, a cross-validation is run on the features whose
//! coordinates lie within `radius` (Euclidean, in index units) of the centre.
//! Centres are evaluated on a dedicated rayon pool; results are collected in
//! centre order, so the output does not depend on the number of threads.

use log::{debug, trace};
use ndarray::{Array2, Axis};
use rayon::prelude::*;
use std::collections::HashMap;

use crate::attr::Attribute;
use crate::channels;
use crate::crossval::CrossValidation;
use crate::dataset::Dataset;
use crate::error::{MvpaError, Result};

/// Integer offsets within a sphere of `radius` in `dims` dimensions
fn sphere_offsets(radius: f64, dims: usize) -> Vec<Vec<i64>> {
    let r = radius.floor() as i64;
    let mut offsets = vec![Vec::new()];
    for _ in 0..dims {
        offsets = offsets
            .into_iter()
            .flat_map(|prefix| {
                (-r..=r).map(move |d| {
                    let mut next = prefix.clone();
                    next.push(d);
                    next
                })
            })
            .collect();
    }
    offsets.retain(|o| {
        let sq: i64 = o.iter().map(|d| d * d).sum();
        (sq as f64) <= radius * radius + 1e-9
    });
    offsets
}

/// Feature indices within `radius` of each centre, ascending per centre
pub fn sphere_neighbourhoods(
    coords: &[Vec<i64>],
    radius: f64,
    centers: &[usize],
) -> Result<Vec<Vec<usize>>> {
    if radius < 0.0 || !radius.is_finite() {
        return Err(MvpaError::param(format!("invalid searchlight radius {}", radius)));
    }
    let dims = coords.first().map(Vec::len).unwrap_or(0);
    if coords.iter().any(|c| c.len() != dims) {
        return Err(MvpaError::shape("feature coordinates differ in dimensionality"));
    }
    let lookup: HashMap<&[i64], usize> = coords
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_slice(), i))
        .collect();
    let offsets = sphere_offsets(radius, dims);
    centers
        .iter()
        .map(|&center| {
            let origin = coords.get(center).ok_or_else(|| {
                MvpaError::param(format!("centre {} out of range (0..{})", center, coords.len()))
            })?;
            let mut members: Vec<usize> = offsets
                .iter()
                .filter_map(|o| {
                    let probe: Vec<i64> = origin.iter().zip(o).map(|(a, b)| a + b).collect();
                    lookup.get(probe.as_slice()).copied()
                })
                .collect();
            members.sort_unstable();
            Ok(members)
        })
        .collect()
}

/// Searchlight configuration
#[derive(Debug, Clone)]
pub struct Searchlight {
    /// Cross-validation run in every sphere
    pub cv: CrossValidation,
    /// Sphere radius in coordinate units
    pub radius: f64,
    /// Feature attribute holding coordinates
    pub coords_attr: String,
    /// Worker threads; 0 uses all cores
    pub nproc: usize,
}

/// Per-centre, per-fold accuracies
#[derive(Debug, Clone, PartialEq)]
pub struct SearchlightResult {
    /// Centre feature indices
    pub centers: Vec<usize>,
    /// Number of features in each sphere
    pub roi_sizes: Vec<usize>,
    /// Accuracies, folds x centres
    pub accuracies: Array2<f64>,
}

impl Searchlight {
    /// Run over `centers` (all features when `None`), calling `progress` once
    /// per finished centre
    pub fn run<F>(&self, ds: &Dataset, centers: Option<&[usize]>, progress: F) -> Result<SearchlightResult>
    where
        F: Fn() + Sync,
    {
        let coords = ds
            .fa_get(&self.coords_attr)?
            .as_coords()
            .ok_or_else(|| MvpaError::attribute(&self.coords_attr, "not a coordinate attribute"))?;
        let centers: Vec<usize> = match centers {
            Some(c) => c.to_vec(),
            None => (0..ds.nfeatures()).collect(),
        };
        let neighbourhoods = sphere_neighbourhoods(coords, self.radius, &centers)?;
        let labels = ds.labels(&self.cv.targets_attr)?;
        let folds = self.cv.folds(ds)?;
        debug!(
            target: channels::SEARCHLIGHT,
            "{} centres, radius {}, {} folds, {} threads",
            centers.len(),
            self.radius,
            folds.len(),
            self.nproc
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.nproc)
            .build()
            .map_err(|e| MvpaError::param(format!("cannot start worker pool: {}", e)))?;
        let per_center: Vec<Vec<f64>> = pool.install(|| {
            neighbourhoods
                .par_iter()
                .zip(centers.par_iter())
                .map(|(roi, &center)| {
                    let local = ds.samples().select(Axis(1), roi);
                    let result = self.cv.run_folds(local.view(), &labels, &folds)?;
                    trace!(
                        target: channels::SEARCHLIGHT,
                        "centre {} ({} features): {:.3}",
                        center,
                        roi.len(),
                        result.mean_accuracy()
                    );
                    progress();
                    Ok(result.folds.iter().map(|f| f.accuracy).collect())
                })
                .collect::<Result<Vec<Vec<f64>>>>()
        })?;

        let mut accuracies = Array2::zeros((folds.len(), centers.len()));
        for (c, values) in per_center.iter().enumerate() {
            for (f, &acc) in values.iter().enumerate() {
                accuracies[[f, c]] = acc;
            }
        }
        Ok(SearchlightResult {
            roi_sizes: neighbourhoods.iter().map(Vec::len).collect(),
            centers,
            accuracies,
        })
    }

    /// Map a result back into a dataset over the centre features
    ///
    /// With `mean`, the folds are averaged into a single sample; otherwise each
    /// fold is one sample, numbered in `sa.cvfolds`.
    pub fn result_dataset(&self, ds: &Dataset, result: &SearchlightResult, mean: bool) -> Result<Dataset> {
        let samples = if mean {
            result
                .accuracies
                .mean_axis(Axis(0))
                .ok_or_else(|| MvpaError::param("searchlight produced no folds"))?
                .insert_axis(Axis(0))
        } else {
            result.accuracies.clone()
        };
        let nsamples = samples.nrows();
        let mut out = Dataset::new(samples);
        if !mean {
            out.set_sa("cvfolds", Attribute::Int((0..nsamples as i64).collect()))?;
        }
        for (name, attr) in ds.fa() {
            out.set_fa(name.clone(), attr.take(&result.centers))?;
        }
        out.set_fa(
            "center_ids",
            Attribute::Int(result.centers.iter().map(|&c| c as i64).collect()),
        )?;
        out.set_fa(
            "roi_sizes",
            Attribute::Int(result.roi_sizes.iter().map(|&s| s as i64).collect()),
        )?;
        for (name, attr) in ds.a() {
            out.set_a(name.clone(), attr.clone());
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_offsets_counts() {
        assert_eq!(sphere_offsets(0.0, 3).len(), 1);
        // centre plus 6 face neighbours
        assert_eq!(sphere_offsets(1.0, 3).len(), 7);
        // adds 12 edge neighbours (sqrt 2)
        assert_eq!(sphere_offsets(1.5, 3).len(), 19);
    }

    #[test]
    fn neighbourhoods_on_a_line() {
        let coords: Vec<Vec<i64>> = (0..5).map(|x| vec![x, 0, 0]).collect();
        let n = sphere_neighbourhoods(&coords, 1.0, &[0, 2, 4]).unwrap();
        assert_eq!(n, vec![vec![0, 1], vec![1, 2, 3], vec![3, 4]]);
        assert!(sphere_neighbourhoods(&coords, 1.0, &[9]).is_err());
        assert!(sphere_neighbourhoods(&coords, -1.0, &[0]).is_err());
    }
}
