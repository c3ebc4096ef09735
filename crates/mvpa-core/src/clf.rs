//! Classifiers
//!
//! All classifiers share the [`Classifier`] trait: train on a samples matrix
//! with one label per row, then predict labels for new rows. Ties are broken
//! deterministically in favour of the label that sorts first.

use log::{debug, trace};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::channels;
use crate::error::{MvpaError, Result};

/// Distance between two samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    /// Euclidean distance
    Euclidean,
    /// One minus Pearson correlation
    Correlation,
}

impl Distance {
    /// Distance between `a` and `b`
    pub fn between(self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self {
            Distance::Euclidean => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y).powi(2))
                .sum::<f64>()
                .sqrt(),
            Distance::Correlation => {
                let n = a.len() as f64;
                let ma = a.sum() / n;
                let mb = b.sum() / n;
                let mut cov = 0.0;
                let mut va = 0.0;
                let mut vb = 0.0;
                for (x, y) in a.iter().zip(b.iter()) {
                    cov += (x - ma) * (y - mb);
                    va += (x - ma).powi(2);
                    vb += (y - mb).powi(2);
                }
                if va == 0.0 || vb == 0.0 {
                    1.0
                } else {
                    1.0 - cov / (va.sqrt() * vb.sqrt())
                }
            }
        }
    }
}

/// Trainable classifier
pub trait Classifier: Send {
    /// Train on `samples` (rows) with one label per row
    fn train(&mut self, samples: ArrayView2<f64>, labels: &[String]) -> Result<()>;

    /// Predict one label per row of `samples`
    fn predict(&self, samples: ArrayView2<f64>) -> Result<Vec<String>>;
}

/// Serializable classifier description used to build fresh instances
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ClassifierSpec {
    /// k nearest neighbours with majority vote
    Knn {
        /// Number of neighbours
        k: usize,
        /// Distance measure
        distance: Distance,
    },
    /// Gaussian naive Bayes
    Gnb {
        /// Pool the variance across classes
        common_variance: bool,
    },
    /// Nearest class mean
    MeanDistance {
        /// Distance measure
        distance: Distance,
    },
}

impl ClassifierSpec {
    /// Build an untrained classifier
    pub fn build(&self) -> Result<Box<dyn Classifier>> {
        match *self {
            ClassifierSpec::Knn { k, distance } => {
                if k == 0 {
                    return Err(MvpaError::param("k must be at least 1"));
                }
                Ok(Box::new(Knn::new(k, distance)))
            }
            ClassifierSpec::Gnb { common_variance } => Ok(Box::new(Gnb::new(common_variance))),
            ClassifierSpec::MeanDistance { distance } => Ok(Box::new(MeanDistance::new(distance))),
        }
    }
}

impl fmt::Display for ClassifierSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierSpec::Knn { k, distance } => write!(f, "kNN(k={}, {:?})", k, distance),
            ClassifierSpec::Gnb { common_variance } => {
                write!(f, "GNB(common_variance={})", common_variance)
            }
            ClassifierSpec::MeanDistance { distance } => write!(f, "MeanDistance({:?})", distance),
        }
    }
}

fn check_training(samples: &ArrayView2<f64>, labels: &[String]) -> Result<()> {
    if samples.nrows() == 0 {
        return Err(MvpaError::Classifier {
            reason: "no training samples".into(),
        });
    }
    if samples.nrows() != labels.len() {
        return Err(MvpaError::Classifier {
            reason: format!(
                "{} training samples but {} labels",
                samples.nrows(),
                labels.len()
            ),
        });
    }
    Ok(())
}

fn not_trained() -> MvpaError {
    MvpaError::Classifier {
        reason: "classifier used before training".into(),
    }
}

/// Class means, keyed by label in sorted order
fn class_means(samples: &ArrayView2<f64>, labels: &[String]) -> BTreeMap<String, Array1<f64>> {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        groups.entry(label.clone()).or_default().push(i);
    }
    groups
        .into_iter()
        .map(|(label, rows)| {
            let mean = samples
                .select(Axis(0), &rows)
                .mean_axis(Axis(0))
                .unwrap_or_else(|| Array1::zeros(samples.ncols()));
            (label, mean)
        })
        .collect()
}

/// k nearest neighbours
#[derive(Debug, Clone)]
pub struct Knn {
    k: usize,
    distance: Distance,
    train: Option<(Array2<f64>, Vec<String>)>,
}

impl Knn {
    /// Create an untrained kNN classifier
    pub fn new(k: usize, distance: Distance) -> Self {
        Self {
            k,
            distance,
            train: None,
        }
    }
}

impl Classifier for Knn {
    fn train(&mut self, samples: ArrayView2<f64>, labels: &[String]) -> Result<()> {
        check_training(&samples, labels)?;
        self.train = Some((samples.to_owned(), labels.to_vec()));
        trace!(target: channels::CLF, "kNN stored {} training samples", labels.len());
        Ok(())
    }

    fn predict(&self, samples: ArrayView2<f64>) -> Result<Vec<String>> {
        let (train, labels) = self.train.as_ref().ok_or_else(not_trained)?;
        let k = self.k.min(labels.len());
        let mut predictions = Vec::with_capacity(samples.nrows());
        for row in samples.axis_iter(Axis(0)) {
            let mut neighbours: Vec<(f64, &String)> = train
                .axis_iter(Axis(0))
                .zip(labels.iter())
                .map(|(t, l)| (self.distance.between(row, t), l))
                .collect();
            neighbours.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));
            // label -> (votes, summed distance)
            let mut votes: BTreeMap<&String, (usize, f64)> = BTreeMap::new();
            for (d, l) in neighbours.into_iter().take(k) {
                let entry = votes.entry(l).or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 += d;
            }
            let winner = votes
                .into_iter()
                .min_by(|a, b| {
                    b.1 .0
                        .cmp(&a.1 .0)
                        .then_with(|| a.1 .1.total_cmp(&b.1 .1))
                        .then_with(|| a.0.cmp(b.0))
                })
                .map(|(l, _)| l.clone())
                .ok_or_else(not_trained)?;
            predictions.push(winner);
        }
        Ok(predictions)
    }
}

/// Gaussian naive Bayes with class-frequency priors
#[derive(Debug, Clone)]
pub struct Gnb {
    common_variance: bool,
    model: Option<GnbModel>,
}

#[derive(Debug, Clone)]
struct GnbModel {
    labels: Vec<String>,
    log_priors: Vec<f64>,
    means: Vec<Array1<f64>>,
    variances: Vec<Array1<f64>>,
}

impl Gnb {
    /// Create an untrained GNB classifier
    pub fn new(common_variance: bool) -> Self {
        Self {
            common_variance,
            model: None,
        }
    }
}

impl Classifier for Gnb {
    fn train(&mut self, samples: ArrayView2<f64>, labels: &[String]) -> Result<()> {
        check_training(&samples, labels)?;
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, label) in labels.iter().enumerate() {
            groups.entry(label.clone()).or_default().push(i);
        }
        let n = labels.len() as f64;
        let nfeatures = samples.ncols();
        // Variance floor relative to the largest feature variance
        let max_var = samples
            .var_axis(Axis(0), 0.0)
            .iter()
            .copied()
            .fold(0.0, f64::max);
        let floor = 1e-9 * max_var.max(1.0);

        let mut model = GnbModel {
            labels: Vec::new(),
            log_priors: Vec::new(),
            means: Vec::new(),
            variances: Vec::new(),
        };
        let mut pooled = Array1::<f64>::zeros(nfeatures);
        for (label, rows) in &groups {
            let class = samples.select(Axis(0), rows);
            let mean = class
                .mean_axis(Axis(0))
                .unwrap_or_else(|| Array1::zeros(nfeatures));
            let var = class.var_axis(Axis(0), 0.0);
            pooled += &(&var * rows.len() as f64);
            model.labels.push(label.clone());
            model.log_priors.push((rows.len() as f64 / n).ln());
            model.means.push(mean);
            model.variances.push(var);
        }
        if self.common_variance {
            let pooled = pooled / n;
            for v in model.variances.iter_mut() {
                v.assign(&pooled);
            }
        }
        for v in model.variances.iter_mut() {
            v.mapv_inplace(|x| x + floor);
        }
        debug!(
            target: channels::CLF,
            "GNB trained on {} samples, {} classes",
            labels.len(),
            model.labels.len()
        );
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, samples: ArrayView2<f64>) -> Result<Vec<String>> {
        let model = self.model.as_ref().ok_or_else(not_trained)?;
        let two_pi = 2.0 * std::f64::consts::PI;
        let mut predictions = Vec::with_capacity(samples.nrows());
        for row in samples.axis_iter(Axis(0)) {
            let mut best: Option<(usize, f64)> = None;
            for c in 0..model.labels.len() {
                let mut ll = model.log_priors[c];
                for ((x, m), v) in row
                    .iter()
                    .zip(model.means[c].iter())
                    .zip(model.variances[c].iter())
                {
                    ll -= 0.5 * ((two_pi * v).ln() + (x - m).powi(2) / v);
                }
                // Strictly greater keeps the first (lowest sorting) label on ties
                if best.map_or(true, |(_, b)| ll > b) {
                    best = Some((c, ll));
                }
            }
            let (c, _) = best.ok_or_else(not_trained)?;
            predictions.push(model.labels[c].clone());
        }
        Ok(predictions)
    }
}

/// Nearest class mean
#[derive(Debug, Clone)]
pub struct MeanDistance {
    distance: Distance,
    means: Option<BTreeMap<String, Array1<f64>>>,
}

impl MeanDistance {
    /// Create an untrained nearest-mean classifier
    pub fn new(distance: Distance) -> Self {
        Self {
            distance,
            means: None,
        }
    }
}

impl Classifier for MeanDistance {
    fn train(&mut self, samples: ArrayView2<f64>, labels: &[String]) -> Result<()> {
        check_training(&samples, labels)?;
        self.means = Some(class_means(&samples, labels));
        Ok(())
    }

    fn predict(&self, samples: ArrayView2<f64>) -> Result<Vec<String>> {
        let means = self.means.as_ref().ok_or_else(not_trained)?;
        samples
            .axis_iter(Axis(0))
            .map(|row| {
                means
                    .iter()
                    .map(|(label, mean)| (self.distance.between(row, mean.view()), label))
                    .min_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)))
                    .map(|(_, label)| label.clone())
                    .ok_or_else(not_trained)
            })
            .collect()
    }
}
