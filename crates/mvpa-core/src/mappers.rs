//! Preprocessing mappers: polynomial detrending, z-scoring and removal of
//! invariant features
//!
//! Detrending and z-scoring work chunk by chunk when a chunk attribute is
//! given, otherwise on all samples at once.

use log::debug;
use ndarray::{Array2, Axis};

use crate::attr::AttrValue;
use crate::channels;
use crate::dataset::Dataset;
use crate::error::{MvpaError, Result};
use crate::select::AttrFilter;

/// Sample indices grouped by the value of a sample attribute, in value order
pub fn group_by(ds: &Dataset, attr: Option<&str>) -> Result<Vec<(Option<AttrValue>, Vec<usize>)>> {
    let Some(name) = attr else {
        return Ok(vec![(None, (0..ds.nsamples()).collect())]);
    };
    let column = ds.sa_get(name)?;
    Ok(column
        .unique()
        .into_iter()
        .map(|value| {
            let members = (0..column.len()).filter(|&i| column.get(i) == value).collect();
            (Some(value), members)
        })
        .collect())
}

/// Z-score features to zero mean and unit variance
///
/// With `baseline`, the mean and standard deviation of every chunk are
/// estimated only from the samples passing the filter and then applied to all
/// samples of the chunk. Features without variance are only centered.
pub fn zscore(ds: &mut Dataset, chunks_attr: Option<&str>, baseline: Option<&AttrFilter>) -> Result<()> {
    let groups = group_by(ds, chunks_attr)?;
    let baseline_mask = match baseline {
        Some(filter) => Some(filter.mask(ds.sa_get(&filter.attr)?)),
        None => None,
    };
    let nfeatures = ds.nfeatures();
    for (chunk, members) in groups {
        let params_from: Vec<usize> = match &baseline_mask {
            Some(mask) => members.iter().copied().filter(|&i| mask[i]).collect(),
            None => members.clone(),
        };
        if params_from.is_empty() {
            return Err(MvpaError::param(format!(
                "no baseline samples in chunk {}",
                chunk.map(|c| c.to_string()).unwrap_or_else(|| "all".into())
            )));
        }
        let reference = ds.samples().select(Axis(0), &params_from);
        let means = reference
            .mean_axis(Axis(0))
            .ok_or_else(|| MvpaError::param("cannot z-score an empty chunk"))?;
        let stds = reference.std_axis(Axis(0), 0.0);
        let mut samples = ds.samples_mut();
        for &i in &members {
            for j in 0..nfeatures {
                let centered = samples[[i, j]] - means[j];
                samples[[i, j]] = if stds[j] > 0.0 { centered / stds[j] } else { centered };
            }
        }
        debug!(
            target: channels::MAPPER,
            "z-scored chunk {:?}: {} samples, params from {}",
            chunk,
            members.len(),
            params_from.len()
        );
    }
    Ok(())
}

// Legendre polynomials P_0..P_order evaluated at m points spread over [-1, 1].
fn legendre_design(m: usize, order: usize) -> Array2<f64> {
    let mut design = Array2::zeros((m, order + 1));
    for i in 0..m {
        let x = if m > 1 {
            -1.0 + 2.0 * i as f64 / (m - 1) as f64
        } else {
            0.0
        };
        design[[i, 0]] = 1.0;
        if order >= 1 {
            design[[i, 1]] = x;
        }
        for k in 1..order {
            let kf = k as f64;
            design[[i, k + 1]] =
                ((2.0 * kf + 1.0) * x * design[[i, k]] - kf * design[[i, k - 1]]) / (kf + 1.0);
        }
    }
    design
}

/// Solve `a * x = b` for square `a` by Gaussian elimination with partial pivoting
pub(crate) fn solve(a: &Array2<f64>, b: &Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    let mut a = a.clone();
    let mut b = b.clone();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&x, &y| a[[x, col]].abs().total_cmp(&a[[y, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() < 1e-12 {
            return Err(MvpaError::param("singular system in least-squares fit"));
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            for k in 0..b.ncols() {
                b.swap([col, k], [pivot, k]);
            }
        }
        for row in (col + 1)..n {
            let factor = a[[row, col]] / a[[col, col]];
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            for k in 0..b.ncols() {
                b[[row, k]] -= factor * b[[col, k]];
            }
        }
    }
    let mut x = Array2::zeros(b.raw_dim());
    for row in (0..n).rev() {
        for k in 0..b.ncols() {
            let mut acc = b[[row, k]];
            for j in (row + 1)..n {
                acc -= a[[row, j]] * x[[j, k]];
            }
            x[[row, k]] = acc / a[[row, row]];
        }
    }
    Ok(x)
}

/// Remove polynomial trends up to `order` from every feature
///
/// Trends are Legendre polynomials over the sample order of each chunk;
/// order 0 removes the mean, order 1 a linear drift and so on.
pub fn detrend(ds: &mut Dataset, order: usize, chunks_attr: Option<&str>) -> Result<()> {
    for (chunk, members) in group_by(ds, chunks_attr)? {
        if members.len() <= order {
            return Err(MvpaError::param(format!(
                "chunk {:?} has {} samples, too few for a polynomial of order {}",
                chunk,
                members.len(),
                order
            )));
        }
        let design = legendre_design(members.len(), order);
        let y = ds.samples().select(Axis(0), &members);
        let xtx = design.t().dot(&design);
        let xty = design.t().dot(&y);
        let coef = solve(&xtx, &xty)?;
        let fitted = design.dot(&coef);
        let mut samples = ds.samples_mut();
        for (row, &i) in members.iter().enumerate() {
            for j in 0..fitted.ncols() {
                samples[[i, j]] -= fitted[[row, j]];
            }
        }
        debug!(
            target: channels::MAPPER,
            "detrended chunk {:?} ({} samples) with order {}",
            chunk,
            members.len(),
            order
        );
    }
    Ok(())
}

/// Dataset without features that are constant across all samples
pub fn strip_invariant_features(ds: &Dataset) -> Result<Dataset> {
    let keep: Vec<usize> = ds
        .samples()
        .axis_iter(Axis(1))
        .enumerate()
        .filter(|(_, col)| {
            let first = col[0];
            col.iter().any(|&v| v != first)
        })
        .map(|(j, _)| j)
        .collect();
    debug!(
        target: channels::MAPPER,
        "keeping {} of {} features",
        keep.len(),
        ds.nfeatures()
    );
    if keep.is_empty() {
        return Err(MvpaError::EmptySelection {
            reason: "all features are invariant".into(),
        });
    }
    ds.select_features(&keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::Attribute;
    use ndarray::array;

    fn chunked() -> Dataset {
        let mut ds = Dataset::new(array![
            [1.0, 5.0],
            [3.0, 5.0],
            [10.0, 5.0],
            [20.0, 5.0],
        ]);
        ds.set_sa("chunks", Attribute::Int(vec![0, 0, 1, 1])).unwrap();
        ds.set_sa(
            "targets",
            Attribute::Str(vec!["rest".into(), "a".into(), "rest".into(), "a".into()]),
        )
        .unwrap();
        ds
    }

    #[test]
    fn zscore_per_chunk() {
        let mut ds = chunked();
        zscore(&mut ds, Some("chunks"), None).unwrap();
        assert_eq!(ds.samples().column(0).to_vec(), vec![-1.0, 1.0, -1.0, 1.0]);
        // constant feature is centered, not scaled
        assert_eq!(ds.samples().column(1).to_vec(), vec![0.0; 4]);
    }

    #[test]
    fn zscore_against_baseline() {
        let mut ds = chunked();
        let rest: AttrFilter = "targets==rest".parse().unwrap();
        zscore(&mut ds, Some("chunks"), Some(&rest)).unwrap();
        // baseline has zero variance per chunk: centered on the rest sample
        assert_eq!(ds.samples().column(0).to_vec(), vec![0.0, 2.0, 0.0, 10.0]);

        let none: AttrFilter = "targets==nothing".parse().unwrap();
        assert!(zscore(&mut chunked(), Some("chunks"), Some(&none)).is_err());
    }

    #[test]
    fn detrend_removes_linear_drift() {
        let mut ds = Dataset::new(array![[1.0], [2.0], [3.0], [4.0], [5.0]]);
        detrend(&mut ds, 1, None).unwrap();
        assert!(ds.samples().iter().all(|v| v.abs() < 1e-10));
    }

    #[test]
    fn detrend_order_needs_enough_samples() {
        let mut ds = Dataset::new(array![[1.0], [2.0]]);
        assert!(detrend(&mut ds, 2, None).is_err());
    }

    #[test]
    fn strip_invariant_drops_constant_columns() {
        let ds = strip_invariant_features(&chunked()).unwrap();
        assert_eq!(ds.nfeatures(), 1);
    }
}
