//! Session script interpreter
//!
//! Scripts are line oriented; `#` starts a comment. Statements:
//!
//! ```text
//! load NAME PATH                      save NAME PATH
//! drop NAME                           describe NAME
//! zscore NAME [CHUNKS|none]           detrend NAME ORDER [CHUNKS|none]
//! select NAME samples|features EXPR   set KEY VALUE
//! env NAME=VALUE                      echo TEXT
//! fail MESSAGE
//! ```

use tracing::debug;

use mvpa_core::{io, mappers, select::filter_indices, select::AttrFilter, MvpaError};

use crate::error::{CliError, CliResult};
use crate::logging::SESSION;
use crate::session::{summary_line, Session};

/// Which axis a `select` statement filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Samples,
    Features,
}

/// A parsed script statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Load { name: String, path: String },
    Save { name: String, path: String },
    Drop { name: String },
    Describe { name: String },
    Zscore { name: String, chunks: Option<String> },
    Detrend { name: String, order: usize, chunks: Option<String> },
    Select { name: String, axis: Axis, filter: AttrFilter },
    Set { key: String, value: String },
    Env { name: String, value: String },
    Echo { text: String },
    Fail { message: String },
}

fn chunks_arg(token: Option<&str>) -> Option<String> {
    match token {
        None => Some("chunks".to_string()),
        Some("none") => None,
        Some(name) => Some(name.to_string()),
    }
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.find(char::is_whitespace) {
        Some(i) => (&text[..i], text[i..].trim_start()),
        None => (text, ""),
    }
}

impl Statement {
    /// Parse one non-comment line
    pub fn parse(line: &str) -> Result<Self, String> {
        let (keyword, rest) = split_word(line);
        let words: Vec<&str> = rest.split_whitespace().collect();
        let need = |n: usize, usage: &str| {
            if words.len() < n {
                Err(format!("usage: {}", usage))
            } else {
                Ok(())
            }
        };
        let statement = match keyword {
            "load" | "save" => {
                let (name, path) = split_word(rest);
                if name.is_empty() || path.is_empty() {
                    return Err(format!("usage: {} NAME PATH", keyword));
                }
                let (name, path) = (name.to_string(), path.to_string());
                if keyword == "load" {
                    Statement::Load { name, path }
                } else {
                    Statement::Save { name, path }
                }
            }
            "drop" => {
                need(1, "drop NAME")?;
                Statement::Drop { name: words[0].into() }
            }
            "describe" => {
                need(1, "describe NAME")?;
                Statement::Describe { name: words[0].into() }
            }
            "zscore" => {
                need(1, "zscore NAME [CHUNKS|none]")?;
                Statement::Zscore {
                    name: words[0].into(),
                    chunks: chunks_arg(words.get(1).copied()),
                }
            }
            "detrend" => {
                need(2, "detrend NAME ORDER [CHUNKS|none]")?;
                let order = words[1]
                    .parse()
                    .map_err(|_| format!("invalid detrend order '{}'", words[1]))?;
                Statement::Detrend {
                    name: words[0].into(),
                    order,
                    chunks: chunks_arg(words.get(2).copied()),
                }
            }
            "select" => {
                need(3, "select NAME samples|features EXPR")?;
                let axis = match words[1] {
                    "samples" => Axis::Samples,
                    "features" => Axis::Features,
                    other => return Err(format!("expected 'samples' or 'features', got '{}'", other)),
                };
                let filter = words[2..]
                    .join(" ")
                    .parse::<AttrFilter>()
                    .map_err(|e| e.to_string())?;
                Statement::Select {
                    name: words[0].into(),
                    axis,
                    filter,
                }
            }
            "set" => {
                let (key, value) = split_word(rest);
                if key.is_empty() || value.is_empty() {
                    return Err("usage: set KEY VALUE".into());
                }
                Statement::Set {
                    key: key.into(),
                    value: value.into(),
                }
            }
            "env" => {
                let (name, value) = rest
                    .split_once('=')
                    .filter(|(n, _)| !n.trim().is_empty())
                    .ok_or_else(|| "usage: env NAME=VALUE".to_string())?;
                Statement::Env {
                    name: name.trim().into(),
                    value: value.into(),
                }
            }
            "echo" => Statement::Echo { text: rest.into() },
            "fail" => Statement::Fail {
                message: if rest.is_empty() { "script failed".into() } else { rest.into() },
            },
            other => return Err(format!("unknown statement '{}'", other)),
        };
        Ok(statement)
    }
}

/// Execute one statement against the session
pub fn execute(session: &mut Session, statement: Statement) -> CliResult<()> {
    debug!(target: SESSION, "{:?}", statement);
    match statement {
        Statement::Load { name, path } => {
            let ds = session.resolve_dataset(&path)?;
            session.insert(name, ds);
        }
        Statement::Save { name, path } => io::save_dataset(session.dataset(&name)?, &path)?,
        Statement::Drop { name } => {
            session.remove(&name)?;
        }
        Statement::Describe { name } => println!("{}", summary_line(&name, session.dataset(&name)?)),
        Statement::Zscore { name, chunks } => {
            mappers::zscore(session.dataset_mut(&name)?, chunks.as_deref(), None)?
        }
        Statement::Detrend { name, order, chunks } => {
            mappers::detrend(session.dataset_mut(&name)?, order, chunks.as_deref())?
        }
        Statement::Select { name, axis, filter } => {
            let ds = session.dataset(&name)?;
            let filters = [filter];
            let selected = match axis {
                Axis::Samples => {
                    let idx = filter_indices(ds.sa(), "sa", ds.nsamples(), &filters)?;
                    non_empty(&idx, "samples", &filters[0])?;
                    ds.select_samples(&idx)?
                }
                Axis::Features => {
                    let idx = filter_indices(ds.fa(), "fa", ds.nfeatures(), &filters)?;
                    non_empty(&idx, "features", &filters[0])?;
                    ds.select_features(&idx)?
                }
            };
            session.insert(name, selected);
        }
        Statement::Set { key, value } => session.config.set(&key, &value)?,
        Statement::Env { name, value } => std::env::set_var(name, value),
        Statement::Echo { text } => println!("{}", text),
        Statement::Fail { message } => return Err(CliError::Generic(anyhow::anyhow!(message))),
    }
    Ok(())
}

fn non_empty(indices: &[usize], what: &str, filter: &AttrFilter) -> CliResult<()> {
    if indices.is_empty() {
        return Err(MvpaError::EmptySelection {
            reason: format!("no {} match '{}'", what, filter),
        }
        .into());
    }
    Ok(())
}

/// Run script text; the first failing line aborts with an error naming it
pub fn run(session: &mut Session, origin: &str, text: &str) -> CliResult<()> {
    for (number, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let statement = Statement::parse(line).map_err(|m| CliError::script(origin, number + 1, m))?;
        execute(session, statement).map_err(|e| CliError::script(origin, number + 1, e.to_string()))?;
    }
    Ok(())
}
