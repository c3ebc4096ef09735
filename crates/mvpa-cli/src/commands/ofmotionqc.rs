//! Head-motion quality control across subjects

use clap::{Args, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use mvpa_core::motion::{flag_outliers, summarize, ColumnOrder, GroupStats, MotionParams, SubjectSummary};

use super::common::{write_json, write_text};
use crate::error::{CliError, CliResult};
use crate::registry::Execute;
use crate::session::Session;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Columns {
    /// Rotations (rad) then translations (mm)
    RotTrans,
    /// Translations (mm) then rotations (rad)
    TransRot,
}

impl From<Columns> for ColumnOrder {
    fn from(c: Columns) -> Self {
        match c {
            Columns::RotTrans => ColumnOrder::RotTrans,
            Columns::TransRot => ColumnOrder::TransRot,
        }
    }
}

/// Summarize head motion per subject and flag group outliers
#[derive(Args, Debug)]
pub struct OfmotionqcCommand {
    /// Motion estimate files; the file stem names the subject
    pub inputs: Vec<PathBuf>,

    /// Search this directory for --motion-file; the first path component names the subject
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// File name of motion estimates below --base-dir
    #[arg(long, default_value = "motion.par")]
    pub motion_file: String,

    /// Column layout of the motion files
    #[arg(long, value_enum, default_value = "rot-trans")]
    pub column_order: Columns,

    /// Framewise displacement (mm) counted as high
    #[arg(long, default_value_t = 0.5)]
    pub fd_threshold: f64,

    /// Median absolute deviations from the group median that make an outlier
    #[arg(long, default_value_t = 3.0)]
    pub outlier_mad: f64,

    /// Emit JSON
    #[arg(long)]
    pub json: bool,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Report {
    fd_threshold: f64,
    outlier_mad: f64,
    group: GroupStats,
    subjects: Vec<SubjectSummary>,
}

/// `(subject, file)` pairs under `base`, sorted by subject
pub fn find_motion_files(base: &Path, file_name: &str) -> CliResult<Vec<(String, PathBuf)>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(base).follow_links(true) {
        let entry = entry.map_err(|e| CliError::Generic(e.into()))?;
        if !entry.file_type().is_file() || entry.file_name() != file_name {
            continue;
        }
        let relative = entry.path().strip_prefix(base).unwrap_or(entry.path());
        let mut components = relative.components();
        let subject = match (components.next(), components.next()) {
            (Some(first), Some(_)) => first.as_os_str().to_string_lossy().into_owned(),
            _ => continue,
        };
        debug!("motion file for {}: {}", subject, entry.path().display());
        found.push((subject, entry.path().to_path_buf()));
    }
    found.sort();
    Ok(found)
}

fn subject_from_file(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn render(report: &Report) -> String {
    let mut lines = vec![format!(
        "{:<16}{:>8}{:>12}{:>12}{:>10}{:>8}  outlier",
        "subject", "volumes", "max_trans", "max_rot", "mean_fd", "high_fd"
    )];
    for s in &report.subjects {
        lines.push(format!(
            "{:<16}{:>8}{:>12.3}{:>12.3}{:>10.3}{:>8}  {}",
            s.subject,
            s.volumes,
            s.max_translation,
            s.max_rotation_deg,
            s.mean_fd,
            s.high_fd_volumes,
            if s.outlier { "yes" } else { "no" }
        ));
    }
    lines.push(format!(
        "group median mean FD {:.3}, MAD {:.3}; outliers deviate by more than {} MAD",
        report.group.median_fd, report.group.mad_fd, report.outlier_mad
    ));
    lines.join("\n")
}

impl Execute for OfmotionqcCommand {
    const NAME: &'static str = "ofmotionqc";
    const ABOUT: &'static str = "Quality control of head-motion estimates";

    fn execute(self, _session: &mut Session) -> CliResult<()> {
        let mut files: Vec<(String, PathBuf)> = self
            .inputs
            .iter()
            .map(|p| (subject_from_file(p), p.clone()))
            .collect();
        if let Some(base) = &self.base_dir {
            files.extend(find_motion_files(base, &self.motion_file)?);
        }
        if files.is_empty() {
            return Err(CliError::invalid_args("no motion files given or found"));
        }

        let mut subjects = files
            .iter()
            .map(|(subject, path)| -> CliResult<SubjectSummary> {
                let params = MotionParams::load(path, self.column_order.into())?;
                Ok(summarize(subject.clone(), &params, self.fd_threshold))
            })
            .collect::<CliResult<Vec<_>>>()?;
        let group = flag_outliers(&mut subjects, self.outlier_mad);
        info!(
            "{} subjects, {} flagged",
            subjects.len(),
            subjects.iter().filter(|s| s.outlier).count()
        );

        let report = Report {
            fd_threshold: self.fd_threshold,
            outlier_mad: self.outlier_mad,
            group,
            subjects,
        };
        if self.json {
            write_json(&report, self.output.as_deref())
        } else {
            write_text(&render(&report), self.output.as_deref())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn walks_subject_directories() {
        let dir = tempdir().unwrap();
        for subject in ["sub02", "sub01"] {
            let run = dir.path().join(subject).join("run1");
            std::fs::create_dir_all(&run).unwrap();
            std::fs::write(run.join("motion.par"), "0 0 0 0 0 0\n").unwrap();
        }
        std::fs::write(dir.path().join("motion.par"), "0 0 0 0 0 0\n").unwrap();

        let found = find_motion_files(dir.path(), "motion.par").unwrap();
        let subjects: Vec<&str> = found.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(subjects, vec!["sub01", "sub02"]);
    }
}
