//! Head-motion quality control
//!
//! Motion estimates have six columns per volume: three rotations (radians)
//! and three translations (mm). Framewise displacement follows Power et al.
//! (2012): the sum of absolute backward differences, with rotations turned
//! into arc lengths on a 50 mm sphere.

use log::debug;
use ndarray::{s, Array2};
use serde::Serialize;
use std::path::Path;

use crate::channels;
use crate::error::{MvpaError, Result};
use crate::io::{parse_text_matrix, read_lines};
use crate::stats::{mad, mean, median};

/// Head radius used to convert rotations to displacement, in mm
pub const HEAD_RADIUS_MM: f64 = 50.0;

/// Column layout of a motion file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnOrder {
    /// Rotations first (FSL MCFLIRT)
    RotTrans,
    /// Translations first (SPM)
    TransRot,
}

/// Motion estimates, one row per volume
#[derive(Debug, Clone, PartialEq)]
pub struct MotionParams {
    /// Rotations in radians, volumes x 3
    pub rotations: Array2<f64>,
    /// Translations in mm, volumes x 3
    pub translations: Array2<f64>,
}

impl MotionParams {
    /// Split six-column rows into rotations and translations
    pub fn from_rows(rows: Vec<Vec<f64>>, order: ColumnOrder) -> Result<Self> {
        if rows.is_empty() {
            return Err(MvpaError::format("motion estimates contain no volumes"));
        }
        if let Some(row) = rows.iter().find(|r| r.len() != 6) {
            return Err(MvpaError::format(format!(
                "motion estimates need 6 columns, found {}",
                row.len()
            )));
        }
        let n = rows.len();
        let all = Array2::from_shape_vec((n, 6), rows.into_iter().flatten().collect())
            .map_err(|e| MvpaError::shape(e.to_string()))?;
        let (rot, trans) = match order {
            ColumnOrder::RotTrans => (s![.., 0..3], s![.., 3..6]),
            ColumnOrder::TransRot => (s![.., 3..6], s![.., 0..3]),
        };
        Ok(Self {
            rotations: all.slice(rot).to_owned(),
            translations: all.slice(trans).to_owned(),
        })
    }

    /// Load a motion estimate text file
    pub fn load(path: impl AsRef<Path>, order: ColumnOrder) -> Result<Self> {
        let rows = parse_text_matrix(&read_lines(path)?)?;
        Self::from_rows(rows, order)
    }

    /// Number of volumes
    pub fn volumes(&self) -> usize {
        self.rotations.nrows()
    }

    /// Framewise displacement per volume; the first volume is 0
    pub fn framewise_displacement(&self) -> Vec<f64> {
        let mut fd = vec![0.0; self.volumes()];
        for (i, value) in fd.iter_mut().enumerate().skip(1) {
            let trans: f64 = (0..3)
                .map(|k| (self.translations[[i, k]] - self.translations[[i - 1, k]]).abs())
                .sum();
            let rot: f64 = (0..3)
                .map(|k| (self.rotations[[i, k]] - self.rotations[[i - 1, k]]).abs())
                .sum();
            *value = trans + HEAD_RADIUS_MM * rot;
        }
        fd
    }
}

/// Motion summary for one subject
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectSummary {
    /// Subject identifier
    pub subject: String,
    /// Number of volumes
    pub volumes: usize,
    /// Largest absolute translation along any axis, mm
    pub max_translation: f64,
    /// Largest absolute rotation around any axis, degrees
    pub max_rotation_deg: f64,
    /// Mean framewise displacement, mm
    pub mean_fd: f64,
    /// Volumes with framewise displacement above the threshold
    pub high_fd_volumes: usize,
    /// Flagged as a group outlier
    pub outlier: bool,
}

/// Summarize one subject's motion
pub fn summarize(subject: impl Into<String>, params: &MotionParams, fd_threshold: f64) -> SubjectSummary {
    let fd = params.framewise_displacement();
    let max_abs = |a: &Array2<f64>| a.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    let summary = SubjectSummary {
        subject: subject.into(),
        volumes: params.volumes(),
        max_translation: max_abs(&params.translations),
        max_rotation_deg: max_abs(&params.rotations).to_degrees(),
        mean_fd: mean(&fd),
        high_fd_volumes: fd.iter().filter(|&&v| v > fd_threshold).count(),
        outlier: false,
    };
    debug!(
        target: channels::MOTION,
        "{}: {} volumes, mean FD {:.3}",
        summary.subject,
        summary.volumes,
        summary.mean_fd
    );
    summary
}

/// Group statistics of mean framewise displacement
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupStats {
    /// Median of the subjects' mean FD
    pub median_fd: f64,
    /// Median absolute deviation of the subjects' mean FD
    pub mad_fd: f64,
}

/// Flag subjects whose mean FD deviates from the group median by more than
/// `k` median absolute deviations
pub fn flag_outliers(subjects: &mut [SubjectSummary], k: f64) -> GroupStats {
    let values: Vec<f64> = subjects.iter().map(|s| s.mean_fd).collect();
    let stats = GroupStats {
        median_fd: median(&values),
        mad_fd: mad(&values),
    };
    for subject in subjects.iter_mut() {
        subject.outlier = (subject.mean_fd - stats.median_fd).abs() > k * stats.mad_fd;
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn still(n: usize) -> Vec<Vec<f64>> {
        vec![vec![0.0; 6]; n]
    }

    #[test]
    fn column_order_splits_parameters() {
        let rows = vec![vec![0.1, 0.2, 0.3, 1.0, 2.0, 3.0]];
        let rt = MotionParams::from_rows(rows.clone(), ColumnOrder::RotTrans).unwrap();
        assert_eq!(rt.translations.row(0).to_vec(), vec![1.0, 2.0, 3.0]);
        let tr = MotionParams::from_rows(rows, ColumnOrder::TransRot).unwrap();
        assert_eq!(tr.translations.row(0).to_vec(), vec![0.1, 0.2, 0.3]);
        assert!(MotionParams::from_rows(vec![vec![0.0; 5]], ColumnOrder::RotTrans).is_err());
    }

    #[test]
    fn framewise_displacement_sums_translation_and_arc() {
        let mut rows = still(3);
        rows[1] = vec![0.01, 0.0, 0.0, 0.5, 0.0, 0.0];
        let params = MotionParams::from_rows(rows, ColumnOrder::RotTrans).unwrap();
        let fd = params.framewise_displacement();
        assert_eq!(fd[0], 0.0);
        assert!((fd[1] - 1.0).abs() < 1e-12);
        assert!((fd[2] - 1.0).abs() < 1e-12);
        let summary = summarize("sub001", &params, 0.9);
        assert_eq!(summary.high_fd_volumes, 2);
        assert!((summary.max_translation - 0.5).abs() < 1e-12);
    }

    #[test]
    fn outliers_are_flagged_against_group() {
        let mut subjects: Vec<SubjectSummary> = [0.1, 0.12, 0.11, 0.09, 2.0]
            .iter()
            .enumerate()
            .map(|(i, &fd)| SubjectSummary {
                subject: format!("sub{:03}", i + 1),
                volumes: 10,
                max_translation: 0.0,
                max_rotation_deg: 0.0,
                mean_fd: fd,
                high_fd_volumes: 0,
                outlier: false,
            })
            .collect();
        let stats = flag_outliers(&mut subjects, 3.0);
        assert!((stats.median_fd - 0.11).abs() < 1e-12);
        let flagged: Vec<&str> = subjects
            .iter()
            .filter(|s| s.outlier)
            .map(|s| s.subject.as_str())
            .collect();
        assert_eq!(flagged, vec!["sub005"]);
    }
}
