//! Information about the installation, configuration and session

use clap::{Args, ValueEnum};
use serde_json::{json, Map, Value};
use std::fmt::Write as _;

use crate::banner;
use crate::error::CliResult;
use crate::registry::{Execute, Registry};
use crate::session::{summary_line, Session};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Version,
    System,
    Config,
    Commands,
    Session,
}

impl Section {
    const ALL: [Section; 5] = [
        Section::Version,
        Section::System,
        Section::Config,
        Section::Commands,
        Section::Session,
    ];

    fn title(self) -> &'static str {
        match self {
            Section::Version => "version",
            Section::System => "system",
            Section::Config => "config",
            Section::Commands => "commands",
            Section::Session => "session",
        }
    }
}

/// Show version, system, configuration, command and session details
#[derive(Args, Debug)]
pub struct InfoCommand {
    /// Section to show (repeatable, default: all)
    #[arg(short, long = "section", value_enum)]
    pub sections: Vec<Section>,

    /// Emit a JSON object instead of text
    #[arg(long)]
    pub json: bool,
}

impl Execute for InfoCommand {
    const NAME: &'static str = "info";
    const ABOUT: &'static str = "Show version, system, configuration and session details";

    fn execute(self, session: &mut Session) -> CliResult<()> {
        let sections = if self.sections.is_empty() {
            Section::ALL.to_vec()
        } else {
            self.sections
        };
        if self.json {
            let mut object = Map::new();
            for section in sections {
                object.insert(section.title().to_string(), section_json(section, session));
            }
            println!("{}", serde_json::to_string_pretty(&Value::Object(object))?);
        } else {
            let blocks: Vec<String> = sections
                .into_iter()
                .map(|s| format!("== {} ==\n{}", s.title(), section_text(s, session)))
                .collect();
            println!("{}", blocks.join("\n\n"));
        }
        Ok(())
    }
}

fn cpus() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn section_json(section: Section, session: &Session) -> Value {
    match section {
        Section::Version => json!({
            "program": banner::PROG,
            "version": banner::VERSION,
            "core": mvpa_core::VERSION,
        }),
        Section::System => json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "cpus": cpus(),
        }),
        Section::Config => {
            let values: Map<String, Value> = session
                .config
                .entries()
                .into_iter()
                .map(|(k, v)| (k.to_string(), Value::String(v)))
                .collect();
            json!({
                "file": session.config_path.as_ref().map(|p| p.display().to_string()),
                "values": values,
            })
        }
        Section::Commands => Value::Array(
            Registry::builtin()
                .entries()
                .iter()
                .map(|e| {
                    json!({
                        "name": e.name(),
                        "available": e.is_available(),
                        "description": e.description(),
                    })
                })
                .collect(),
        ),
        Section::Session => json!({
            "verbosity": session.verbosity,
            "debug_channels": session.channels,
            "datasets": session
                .datasets()
                .map(|(name, ds)| json!({ "name": name, "shape": [ds.nsamples(), ds.nfeatures()] }))
                .collect::<Vec<_>>(),
        }),
    }
}

fn section_text(section: Section, session: &Session) -> String {
    let mut out = String::new();
    match section {
        Section::Version => out.push_str(&banner::banner()),
        Section::System => {
            let _ = writeln!(out, "os: {}", std::env::consts::OS);
            let _ = writeln!(out, "arch: {}", std::env::consts::ARCH);
            let _ = write!(out, "cpus: {}", cpus());
        }
        Section::Config => {
            let file = session
                .config_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".into());
            let _ = write!(out, "file: {}", file);
            for (key, value) in session.config.entries() {
                let _ = write!(out, "\n{} = {}", key, value);
            }
        }
        Section::Commands => {
            let registry = Registry::builtin();
            let lines: Vec<String> = registry
                .entries()
                .iter()
                .map(|e| format!("{:<14}{}", e.name(), e.description()))
                .collect();
            out.push_str(&lines.join("\n"));
        }
        Section::Session => {
            let channels = if session.channels.is_empty() {
                "none".to_string()
            } else {
                session.channels.join(", ")
            };
            let _ = writeln!(out, "verbosity: {}", session.verbosity);
            let _ = write!(out, "debug channels: {}", channels);
            for (name, ds) in session.datasets() {
                let _ = write!(out, "\n{}", summary_line(name, ds));
            }
        }
    }
    out
}
