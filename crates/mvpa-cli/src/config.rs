//! Configuration management for the mvpa CLI

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CliError, CliResult};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV: &str = "MVPA_CONFIG";

/// Global CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// General settings
    pub general: GeneralConfig,

    /// Debugging aids
    pub debug: DebugConfig,

    /// Searchlight defaults
    pub searchlight: SearchlightConfig,

    /// Terminal output
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Verbosity level used when `--verbose` is absent
    pub verbose: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Enter the post-mortem inspector on errors
    pub postmortem: bool,

    /// Debug channels enabled on every run
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchlightConfig {
    /// Worker threads (0 = all cores)
    pub nproc: usize,
}

impl Default for SearchlightConfig {
    fn default() -> Self {
        Self { nproc: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Show progress bars on terminals
    pub progress: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { progress: true }
    }
}

fn parse_bool(key: &str, value: &str) -> CliResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CliError::config(format!("{}: '{}' is not a boolean", key, other))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> CliResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::config(format!("{}: '{}' is not a valid number", key, value)))
}

impl CliConfig {
    /// Load configuration from file; a missing file yields the defaults
    pub fn load_from_file(path: &Path) -> CliResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)
                .map_err(|e| CliError::config(format!("Invalid config file {}: {}", path.display(), e)))
        } else {
            Ok(Self::default())
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> CliResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::config("Could not determine config directory"))?;
        Ok(config_dir.join("mvpa").join("config.toml"))
    }

    /// Locate and load the configuration
    ///
    /// An explicit path must exist. Otherwise `$MVPA_CONFIG` is used, then the
    /// per-user default location. Returns the path that was consulted, if any.
    pub fn resolve(explicit: Option<&Path>) -> CliResult<(Self, Option<PathBuf>)> {
        let path = match explicit {
            Some(p) => {
                if !p.exists() {
                    return Err(CliError::config(format!("config file {} not found", p.display())));
                }
                Some(p.to_path_buf())
            }
            None => match std::env::var_os(CONFIG_ENV) {
                Some(p) => Some(PathBuf::from(p)),
                None => Self::default_config_path().ok(),
            },
        };
        let mut config = match &path {
            Some(p) => Self::load_from_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok((config, path))
    }

    /// Apply `MVPA_*` overrides obtained through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> CliResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MVPA_VERBOSE") {
            self.set("general.verbose", &v)?;
        }
        if let Some(v) = lookup("MVPA_DEBUG_POSTMORTEM") {
            self.set("debug.postmortem", &v)?;
        }
        Ok(())
    }

    /// Set a value by dotted key, as done by session `set` statements
    pub fn set(&mut self, key: &str, value: &str) -> CliResult<()> {
        match key {
            "general.verbose" => self.general.verbose = parse_number(key, value)?,
            "debug.postmortem" => self.debug.postmortem = parse_bool(key, value)?,
            "debug.channels" => {
                self.debug.channels = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            }
            "searchlight.nproc" => self.searchlight.nproc = parse_number(key, value)?,
            "output.progress" => self.output.progress = parse_bool(key, value)?,
            _ => return Err(CliError::config(format!("unknown configuration key '{}'", key))),
        }
        Ok(())
    }

    /// Flattened `key = value` view for display
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("general.verbose", self.general.verbose.to_string()),
            ("debug.postmortem", self.debug.postmortem.to_string()),
            ("debug.channels", self.debug.channels.join(",")),
            ("searchlight.nproc", self.searchlight.nproc.to_string()),
            ("output.progress", self.output.progress.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = CliConfig::load_from_file(&dir.path().join("none.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.searchlight.nproc, 1);
        assert!(config.output.progress);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[debug]\npostmortem = true\n").unwrap();
        let config = CliConfig::load_from_file(&path).unwrap();
        assert!(config.debug.postmortem);
        assert_eq!(config.general.verbose, 0);

        std::fs::write(&path, "[debug]\npostmortem = 3\n").unwrap();
        assert!(CliConfig::load_from_file(&path).is_err());
    }

    #[test]
    fn set_and_overrides() {
        let mut config = CliConfig::default();
        config.set("searchlight.nproc", "4").unwrap();
        config.set("debug.channels", "crossval, io").unwrap();
        assert_eq!(config.searchlight.nproc, 4);
        assert_eq!(config.debug.channels, vec!["crossval", "io"]);
        assert!(config.set("nope", "1").is_err());
        assert!(config.set("output.progress", "maybe").is_err());

        config
            .apply_overrides(|k| (k == "MVPA_DEBUG_POSTMORTEM").then(|| "yes".to_string()))
            .unwrap();
        assert!(config.debug.postmortem);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        assert!(CliConfig::resolve(Some(Path::new("/nonexistent/mvpa.toml"))).is_err());
    }
}
