//! Chunk-based data partitioning
//!
//! Samples sharing a chunk value always land on the same side of a split.

use log::debug;
use serde::Serialize;

use crate::attr::{AttrValue, Attribute};
use crate::channels;
use crate::error::{MvpaError, Result};

/// One train/test split
#[derive(Debug, Clone, PartialEq)]
pub struct Fold {
    /// Training sample indices, ascending
    pub train: Vec<usize>,
    /// Testing sample indices, ascending
    pub test: Vec<usize>,
    /// Chunk values held out for testing
    pub test_chunks: Vec<AttrValue>,
}

/// Strategy for generating folds from a chunks attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Partitioner {
    /// Leave `cvtype` chunks out, for every combination of chunks
    NFold {
        /// Number of chunks held out per fold
        cvtype: usize,
    },
    /// Odd-positioned chunks vs even-positioned chunks, both ways
    OddEven,
    /// First half of the chunks vs second half, both ways
    Half,
}

fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    fn recurse(start: usize, n: usize, k: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in start..n {
            current.push(i);
            recurse(i + 1, n, k, current, out);
            current.pop();
        }
    }
    let mut out = Vec::new();
    recurse(0, n, k, &mut Vec::with_capacity(k), &mut out);
    out
}

impl Partitioner {
    /// Generate folds over the given chunks attribute
    pub fn generate(&self, chunks: &Attribute) -> Result<Vec<Fold>> {
        let unique = chunks.unique();
        let n = unique.len();
        if n < 2 {
            return Err(MvpaError::Partition {
                reason: format!("need at least 2 distinct chunks, found {}", n),
            });
        }
        let test_sets: Vec<Vec<usize>> = match *self {
            Partitioner::NFold { cvtype } => {
                if cvtype == 0 || cvtype >= n {
                    return Err(MvpaError::Partition {
                        reason: format!("cvtype {} invalid for {} chunks", cvtype, n),
                    });
                }
                combinations(n, cvtype)
            }
            Partitioner::OddEven => {
                let odd: Vec<usize> = (0..n).filter(|i| i % 2 == 1).collect();
                let even: Vec<usize> = (0..n).filter(|i| i % 2 == 0).collect();
                vec![odd, even]
            }
            Partitioner::Half => {
                let half = n / 2;
                vec![(half..n).collect(), (0..half).collect()]
            }
        };
        let values: Vec<AttrValue> = chunks.values();
        let folds: Vec<Fold> = test_sets
            .into_iter()
            .map(|set| {
                let test_chunks: Vec<AttrValue> = set.iter().map(|&i| unique[i].clone()).collect();
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..values.len()).partition(|&i| test_chunks.contains(&values[i]));
                Fold {
                    train,
                    test,
                    test_chunks,
                }
            })
            .collect();
        debug!(
            target: channels::PARTITION,
            "{:?} generated {} folds over {} chunks",
            self,
            folds.len(),
            n
        );
        Ok(folds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinations_are_lexicographic() {
        assert_eq!(
            combinations(4, 2),
            vec![vec![0, 1], vec![0, 2], vec![0, 3], vec![1, 2], vec![1, 3], vec![2, 3]]
        );
    }

    #[test]
    fn nfold_leaves_chunks_out_without_overlap() {
        let chunks = Attribute::Int(vec![0, 0, 1, 1, 2, 2]);
        let folds = Partitioner::NFold { cvtype: 1 }.generate(&chunks).unwrap();
        assert_eq!(folds.len(), 3);
        for fold in &folds {
            assert_eq!(fold.test.len(), 2);
            assert_eq!(fold.train.len() + fold.test.len(), 6);
            assert!(fold.test.iter().all(|t| !fold.train.contains(t)));
        }
        assert_eq!(folds[1].test, vec![2, 3]);

        let folds = Partitioner::NFold { cvtype: 2 }.generate(&chunks).unwrap();
        assert_eq!(folds.len(), 3);
    }

    #[test]
    fn odd_even_and_half_produce_two_folds() {
        let chunks = Attribute::Int(vec![0, 1, 2, 3]);
        let oe = Partitioner::OddEven.generate(&chunks).unwrap();
        assert_eq!(oe[0].test, vec![1, 3]);
        assert_eq!(oe[1].test, vec![0, 2]);
        let half = Partitioner::Half.generate(&chunks).unwrap();
        assert_eq!(half[0].test, vec![2, 3]);
        assert_eq!(half[1].test, vec![0, 1]);
    }

    #[test]
    fn invalid_configurations_fail() {
        let one = Attribute::Int(vec![0, 0]);
        assert!(Partitioner::OddEven.generate(&one).is_err());
        let two = Attribute::Int(vec![0, 1]);
        assert!(Partitioner::NFold { cvtype: 2 }.generate(&two).is_err());
    }
}
