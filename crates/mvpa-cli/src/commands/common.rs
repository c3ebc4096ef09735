//! Arguments and helpers shared by several commands

use clap::{Args, ValueEnum};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

use mvpa_core::clf::{ClassifierSpec, Distance};
use mvpa_core::crossval::CrossValidation;
use mvpa_core::partition::Partitioner;
use mvpa_core::{io, Attribute, Dataset};

use crate::error::{CliError, CliResult};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassifierKind {
    /// k nearest neighbours
    Knn,
    /// Gaussian naive Bayes
    Gnb,
    /// Nearest class mean
    MeanDistance,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceKind {
    Euclidean,
    Correlation,
}

impl From<DistanceKind> for Distance {
    fn from(kind: DistanceKind) -> Self {
        match kind {
            DistanceKind::Euclidean => Distance::Euclidean,
            DistanceKind::Correlation => Distance::Correlation,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionerKind {
    /// Leave --cvtype chunks out, every combination
    Nfold,
    /// Odd vs even chunks
    Oddeven,
    /// First vs second half of the chunks
    Half,
}

/// Classifier and partitioning options of cross-validating commands
#[derive(Args, Debug, Clone)]
pub struct CvArgs {
    /// Classifier
    #[arg(long, value_enum, default_value = "knn")]
    pub clf: ClassifierKind,

    /// Neighbours for knn
    #[arg(long, default_value_t = 1)]
    pub k: usize,

    /// Distance for knn and mean-distance
    #[arg(long, value_enum, default_value = "euclidean")]
    pub distance: DistanceKind,

    /// Pool variances across classes (gnb)
    #[arg(long)]
    pub common_variance: bool,

    /// Partitioning scheme
    #[arg(long, value_enum, default_value = "nfold")]
    pub partitioner: PartitionerKind,

    /// Chunks held out per fold (nfold)
    #[arg(long, default_value_t = 1)]
    pub cvtype: usize,

    /// Sample attribute with class labels
    #[arg(long, default_value = "targets")]
    pub targets_attr: String,

    /// Sample attribute with chunks
    #[arg(long, default_value = "chunks")]
    pub chunks_attr: String,
}

impl CvArgs {
    pub fn classifier(&self) -> ClassifierSpec {
        match self.clf {
            ClassifierKind::Knn => ClassifierSpec::Knn {
                k: self.k,
                distance: self.distance.into(),
            },
            ClassifierKind::Gnb => ClassifierSpec::Gnb {
                common_variance: self.common_variance,
            },
            ClassifierKind::MeanDistance => ClassifierSpec::MeanDistance {
                distance: self.distance.into(),
            },
        }
    }

    pub fn partitioner(&self) -> Partitioner {
        match self.partitioner {
            PartitionerKind::Nfold => Partitioner::NFold { cvtype: self.cvtype },
            PartitionerKind::Oddeven => Partitioner::OddEven,
            PartitionerKind::Half => Partitioner::Half,
        }
    }

    pub fn cross_validation(&self) -> CrossValidation {
        let mut cv = CrossValidation::new(self.classifier(), self.partitioner());
        cv.targets_attr = self.targets_attr.clone();
        cv.chunks_attr = self.chunks_attr.clone();
        cv
    }
}

/// Write a dataset and log where it went
pub fn save(ds: &Dataset, path: &Path) -> CliResult<()> {
    io::save_dataset(ds, path)?;
    info!("Wrote {} x {} dataset to {}", ds.nsamples(), ds.nfeatures(), path.display());
    Ok(())
}

/// Pretty JSON to a file, or to stdout when `path` is `None`
pub fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)?;
    write_text(&text, path)
}

/// Text to a file, or to stdout when `path` is `None`
pub fn write_text(text: &str, path: Option<&Path>) -> CliResult<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, format!("{}\n", text.trim_end_matches('\n')))?;
            info!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", text.trim_end_matches('\n'))?;
        }
    }
    Ok(())
}

/// Split `NAME=V1,V2,..` into the name and its values
pub fn parse_assignment(spec: &str) -> CliResult<(String, Vec<String>)> {
    let (name, values) = spec
        .split_once('=')
        .filter(|(n, _)| !n.trim().is_empty())
        .ok_or_else(|| CliError::invalid_args(format!("expected NAME=VALUES, got '{}'", spec)))?;
    let values = values.split(',').map(|v| v.trim().to_string()).collect();
    Ok((name.trim().to_string(), values))
}

/// Attribute column of length `len` from text values; a single value is repeated
pub fn attribute_from_values(name: &str, values: &[String], len: usize) -> CliResult<Attribute> {
    let entries: Vec<String> = if values.len() == 1 && len != 1 {
        vec![values[0].clone(); len]
    } else {
        values.to_vec()
    };
    if entries.len() != len {
        return Err(CliError::invalid_args(format!(
            "attribute '{}' has {} values, expected {}",
            name,
            entries.len(),
            len
        )));
    }
    Ok(Attribute::infer(&entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_split_on_commas() {
        let (name, values) = parse_assignment("targets=a, b,c").unwrap();
        assert_eq!(name, "targets");
        assert_eq!(values, vec!["a", "b", "c"]);
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=1").is_err());
    }

    #[test]
    fn single_values_are_repeated() {
        let attr = attribute_from_values("subject", &["s01".to_string()], 3).unwrap();
        assert_eq!(attr, Attribute::Str(vec!["s01".into(); 3]));
        let attr = attribute_from_values("chunks", &["0".into(), "1".into()], 2).unwrap();
        assert_eq!(attr, Attribute::Int(vec![0, 1]));
        assert!(attribute_from_values("chunks", &["0".into(), "1".into()], 3).is_err());
    }
}
