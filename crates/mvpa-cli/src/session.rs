//! Session state shared by preload scripts and the selected command

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use mvpa_core::{io, Dataset};

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::logging::SESSION;
use crate::script;

/// Prefix that makes a dataset argument refer to a session dataset
pub const SESSION_PREFIX: &str = "session:";

/// State of one `mvpa` invocation
#[derive(Debug, Default)]
pub struct Session {
    /// Effective configuration
    pub config: CliConfig,
    /// Configuration file that was consulted, if any
    pub config_path: Option<PathBuf>,
    /// Verbosity level in effect
    pub verbosity: u8,
    /// Enabled debug channels
    pub channels: Vec<String>,
    datasets: BTreeMap<String, Dataset>,
}

impl Session {
    pub fn new(config: CliConfig, config_path: Option<PathBuf>, verbosity: u8, channels: Vec<String>) -> Self {
        Self {
            config,
            config_path,
            verbosity,
            channels,
            datasets: BTreeMap::new(),
        }
    }

    /// Named datasets in name order
    pub fn datasets(&self) -> impl Iterator<Item = (&str, &Dataset)> {
        self.datasets.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn dataset(&self, name: &str) -> CliResult<&Dataset> {
        self.datasets
            .get(name)
            .ok_or_else(|| CliError::invalid_args(format!("no dataset '{}' in the session", name)))
    }

    pub fn dataset_mut(&mut self, name: &str) -> CliResult<&mut Dataset> {
        self.datasets
            .get_mut(name)
            .ok_or_else(|| CliError::invalid_args(format!("no dataset '{}' in the session", name)))
    }

    /// Store a dataset, replacing one of the same name
    pub fn insert(&mut self, name: impl Into<String>, ds: Dataset) {
        let name = name.into();
        debug!(target: SESSION, "session dataset '{}' {:?}", name, ds.shape());
        self.datasets.insert(name, ds);
    }

    pub fn remove(&mut self, name: &str) -> CliResult<Dataset> {
        self.datasets
            .remove(name)
            .ok_or_else(|| CliError::invalid_args(format!("no dataset '{}' in the session", name)))
    }

    /// Dataset named by a command argument: `session:NAME` or a file path
    pub fn resolve_dataset(&self, source: &str) -> CliResult<Dataset> {
        match source.strip_prefix(SESSION_PREFIX) {
            Some(name) => self.dataset(name).cloned(),
            None => {
                info!(target: SESSION, "Loading dataset from {}", source);
                Ok(io::load_dataset(source)?)
            }
        }
    }

    /// Resolve several sources and stack them vertically
    pub fn resolve_stacked(&self, sources: &[String]) -> CliResult<Dataset> {
        let mut datasets = sources
            .iter()
            .map(|s| self.resolve_dataset(s))
            .collect::<CliResult<Vec<_>>>()?;
        match datasets.len() {
            0 => Err(CliError::invalid_args("no input dataset given")),
            1 => Ok(datasets.remove(0)),
            _ => Ok(Dataset::vstack(&datasets)?),
        }
    }

    /// Run a script file
    pub fn run_script_file(&mut self, path: &Path) -> CliResult<()> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::script(path.display().to_string(), 0, format!("cannot read script: {}", e)))?;
        info!(target: SESSION, "Running script {}", path.display());
        script::run(self, &path.display().to_string(), &text)
    }

    /// Run script text from an inline expression
    pub fn run_script_text(&mut self, origin: &str, text: &str) -> CliResult<()> {
        script::run(self, origin, text)
    }
}

/// One-line dataset summary
pub fn summary_line(name: &str, ds: &Dataset) -> String {
    let keys = |c: &mvpa_core::Collection| c.keys().cloned().collect::<Vec<_>>().join(", ");
    format!(
        "{}: {} samples x {} features; sa: [{}]; fa: [{}]",
        name,
        ds.nsamples(),
        ds.nfeatures(),
        keys(ds.sa()),
        keys(ds.fa())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvpa_core::Attribute;
    use tempfile::tempdir;

    #[test]
    fn resolves_session_and_file_sources() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ds.json");
        let mut ds = Dataset::from_rows(vec![vec![1.0, 2.0]]).unwrap();
        ds.set_sa("targets", Attribute::Str(vec!["a".into()])).unwrap();
        io::save_dataset(&ds, &path).unwrap();

        let mut session = Session::default();
        session.insert("mine", ds.clone());
        assert_eq!(session.resolve_dataset("session:mine").unwrap(), ds);
        assert_eq!(session.resolve_dataset(path.to_str().unwrap()).unwrap(), ds);
        assert!(session.resolve_dataset("session:other").is_err());

        let stacked = session
            .resolve_stacked(&["session:mine".to_string(), "session:mine".to_string()])
            .unwrap();
        assert_eq!(stacked.shape(), (2, 2));
        assert!(session.resolve_stacked(&[]).is_err());
    }

    #[test]
    fn summary_lists_attributes() {
        let mut ds = Dataset::from_rows(vec![vec![0.0; 3]; 2]).unwrap();
        ds.set_sa("chunks", Attribute::Int(vec![0, 1])).unwrap();
        assert_eq!(summary_line("x", &ds), "x: 2 samples x 3 features; sa: [chunks]; fa: []");
    }
}
