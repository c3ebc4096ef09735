//! Cross-validated classification
//!
//! A [`CrossValidation`] trains a fresh classifier on the training part of
//! every fold and scores it on the held-out chunks. Results carry per-fold
//! accuracies and a confusion matrix accumulated over all folds.

use log::{debug, trace};
use ndarray::{ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::channels;
use crate::clf::ClassifierSpec;
use crate::dataset::Dataset;
use crate::error::{MvpaError, Result};
use crate::mappers::group_by;
use crate::partition::{Fold, Partitioner};

/// Counts of (target, prediction) pairs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    /// Sorted labels indexing rows (targets) and columns (predictions)
    pub labels: Vec<String>,
    /// `counts[target][prediction]`
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Empty matrix over the given labels
    pub fn new(labels: Vec<String>) -> Self {
        let n = labels.len();
        Self {
            labels,
            counts: vec![vec![0; n]; n],
        }
    }

    fn index(&self, label: &str) -> Result<usize> {
        self.labels
            .iter()
            .position(|l| l == label)
            .ok_or_else(|| MvpaError::Classifier {
                reason: format!("unknown label '{}'", label),
            })
    }

    /// Record one prediction
    pub fn add(&mut self, target: &str, predicted: &str) -> Result<()> {
        let t = self.index(target)?;
        let p = self.index(predicted)?;
        self.counts[t][p] += 1;
        Ok(())
    }

    /// Number of recorded predictions
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Fraction of correct predictions
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return f64::NAN;
        }
        let correct: usize = (0..self.labels.len()).map(|i| self.counts[i][i]).sum();
        correct as f64 / total as f64
    }
}

/// Outcome of one fold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldResult {
    /// Held-out chunk values
    pub test_chunks: Vec<String>,
    /// Number of training samples
    pub ntrain: usize,
    /// Number of testing samples
    pub ntest: usize,
    /// Fraction of test samples classified correctly
    pub accuracy: f64,
}

/// Outcome of a cross-validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CvResult {
    /// Per-fold results in fold order
    pub folds: Vec<FoldResult>,
    /// Confusion matrix accumulated over folds
    pub confusion: ConfusionMatrix,
}

impl CvResult {
    /// Mean of the per-fold accuracies
    pub fn mean_accuracy(&self) -> f64 {
        crate::stats::mean(&self.folds.iter().map(|f| f.accuracy).collect::<Vec<_>>())
    }
}

/// Permutation-based significance of a cross-validated accuracy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermutationResult {
    /// Mean accuracy on the real labels
    pub observed: f64,
    /// Mean accuracies with permuted labels
    pub null: Vec<f64>,
    /// `(#{null >= observed} + 1) / (permutations + 1)`
    pub p_value: f64,
}

/// Cross-validation configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValidation {
    /// Classifier to train per fold
    pub clf: ClassifierSpec,
    /// Fold generator
    pub partitioner: Partitioner,
    /// Sample attribute holding labels
    pub targets_attr: String,
    /// Sample attribute holding chunks
    pub chunks_attr: String,
}

impl CrossValidation {
    /// Cross-validation with the conventional `targets`/`chunks` attributes
    pub fn new(clf: ClassifierSpec, partitioner: Partitioner) -> Self {
        Self {
            clf,
            partitioner,
            targets_attr: "targets".into(),
            chunks_attr: "chunks".into(),
        }
    }

    /// Folds for a dataset
    pub fn folds(&self, ds: &Dataset) -> Result<Vec<Fold>> {
        self.partitioner.generate(ds.sa_get(&self.chunks_attr)?)
    }

    /// Run on a whole dataset
    pub fn run(&self, ds: &Dataset) -> Result<CvResult> {
        let labels = ds.labels(&self.targets_attr)?;
        let folds = self.folds(ds)?;
        let result = self.run_folds(ds.samples().view(), &labels, &folds)?;
        debug!(
            target: channels::CROSSVAL,
            "{} over {} folds: mean accuracy {:.3}",
            self.clf,
            result.folds.len(),
            result.mean_accuracy()
        );
        Ok(result)
    }

    /// Run on a samples matrix with precomputed labels and folds
    pub fn run_folds(
        &self,
        samples: ArrayView2<f64>,
        labels: &[String],
        folds: &[Fold],
    ) -> Result<CvResult> {
        let all_labels: Vec<String> = labels
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut confusion = ConfusionMatrix::new(all_labels);
        let mut results = Vec::with_capacity(folds.len());
        for fold in folds {
            let train_x = samples.select(Axis(0), &fold.train);
            let train_y: Vec<String> = fold.train.iter().map(|&i| labels[i].clone()).collect();
            let test_x = samples.select(Axis(0), &fold.test);
            let mut clf = self.clf.build()?;
            clf.train(train_x.view(), &train_y)?;
            let predictions = clf.predict(test_x.view())?;
            let mut correct = 0;
            for (&i, predicted) in fold.test.iter().zip(predictions.iter()) {
                confusion.add(&labels[i], predicted)?;
                if &labels[i] == predicted {
                    correct += 1;
                }
            }
            let accuracy = if fold.test.is_empty() {
                f64::NAN
            } else {
                correct as f64 / fold.test.len() as f64
            };
            trace!(
                target: channels::CROSSVAL,
                "fold {:?}: {} train, {} test, accuracy {:.3}",
                fold.test_chunks,
                fold.train.len(),
                fold.test.len(),
                accuracy
            );
            results.push(FoldResult {
                test_chunks: fold.test_chunks.iter().map(|c| c.to_string()).collect(),
                ntrain: fold.train.len(),
                ntest: fold.test.len(),
                accuracy,
            });
        }
        Ok(CvResult {
            folds: results,
            confusion,
        })
    }

    /// Compare the observed accuracy against accuracies with labels shuffled
    /// within chunks
    pub fn permutation_test(&self, ds: &Dataset, permutations: usize, seed: u64) -> Result<PermutationResult> {
        if permutations == 0 {
            return Err(MvpaError::param("number of permutations must be positive"));
        }
        let labels = ds.labels(&self.targets_attr)?;
        let folds = self.folds(ds)?;
        let samples = ds.samples().view();
        let observed = self.run_folds(samples, &labels, &folds)?.mean_accuracy();
        let groups = group_by(ds, Some(&self.chunks_attr))?;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut null = Vec::with_capacity(permutations);
        for _ in 0..permutations {
            let mut permuted = labels.clone();
            for (_, members) in &groups {
                let mut shuffled: Vec<String> = members.iter().map(|&i| labels[i].clone()).collect();
                shuffled.shuffle(&mut rng);
                for (&i, label) in members.iter().zip(shuffled) {
                    permuted[i] = label;
                }
            }
            null.push(self.run_folds(samples, &permuted, &folds)?.mean_accuracy());
        }
        let exceed = null.iter().filter(|&&a| a >= observed).count();
        let p_value = (exceed + 1) as f64 / (permutations + 1) as f64;
        debug!(
            target: channels::CROSSVAL,
            "permutation test: observed {:.3}, p = {:.4}",
            observed,
            p_value
        );
        Ok(PermutationResult {
            observed,
            null,
            p_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::Attribute;
    use crate::clf::Distance;

    fn separable(nchunks: i64) -> Dataset {
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        let mut chunks = Vec::new();
        for c in 0..nchunks {
            for (label, offset) in [("face", 0.0), ("house", 10.0)] {
                rows.push(vec![offset + c as f64 * 0.1, offset - c as f64 * 0.1, 1.0]);
                targets.push(label.to_string());
                chunks.push(c);
            }
        }
        let mut ds = Dataset::from_rows(rows).unwrap();
        ds.set_sa("targets", Attribute::Str(targets)).unwrap();
        ds.set_sa("chunks", Attribute::Int(chunks)).unwrap();
        ds
    }

    #[test]
    fn separable_data_is_perfectly_classified() {
        let cv = CrossValidation::new(
            ClassifierSpec::Knn { k: 1, distance: Distance::Euclidean },
            Partitioner::NFold { cvtype: 1 },
        );
        let result = cv.run(&separable(4)).unwrap();
        assert_eq!(result.folds.len(), 4);
        assert_eq!(result.mean_accuracy(), 1.0);
        assert_eq!(result.confusion.counts, vec![vec![4, 0], vec![0, 4]]);
        assert_eq!(result.confusion.accuracy(), 1.0);
    }

    #[test]
    fn missing_targets_attribute_is_reported() {
        let mut cv = CrossValidation::new(
            ClassifierSpec::Gnb { common_variance: false },
            Partitioner::OddEven,
        );
        cv.targets_attr = "labels".into();
        assert!(matches!(
            cv.run(&separable(2)),
            Err(MvpaError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn permutation_test_is_seeded() {
        let cv = CrossValidation::new(
            ClassifierSpec::MeanDistance { distance: Distance::Euclidean },
            Partitioner::NFold { cvtype: 1 },
        );
        let ds = separable(4);
        let a = cv.permutation_test(&ds, 20, 7).unwrap();
        let b = cv.permutation_test(&ds, 20, 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.observed, 1.0);
        assert!(a.p_value > 0.0 && a.p_value <= 1.0);
        assert_eq!(a.null.len(), 20);
    }
}
