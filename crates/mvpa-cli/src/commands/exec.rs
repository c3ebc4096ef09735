//! Session script execution

use clap::{ArgMatches, Args, Command, FromArgMatches};
use std::path::PathBuf;
use tracing::info;

use super::common::parse_assignment;
use crate::error::{CliError, CliResult};
use crate::logging::SESSION;
use crate::registry::SubCommand;
use crate::session::Session;

/// Run session scripts and expressions in command-line order
#[derive(Args, Debug)]
pub struct ExecCommand {
    /// Script files
    #[arg(value_name = "SCRIPT")]
    pub scripts: Vec<PathBuf>,

    /// Script text to run
    #[arg(short = 'e', long = "expr", value_name = "STATEMENTS")]
    pub exprs: Vec<String>,

    /// Load a dataset into the session before running anything
    #[arg(long, value_name = "NAME=PATH")]
    pub load: Vec<String>,
}

/// One unit of work, in command-line order
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Script(PathBuf),
    Expr(String),
}

/// Scripts and expressions ordered by their position on the command line
pub fn ordered_steps(matches: &ArgMatches) -> Vec<Step> {
    let mut steps: Vec<(usize, Step)> = Vec::new();
    if let (Some(idx), Some(values)) = (matches.indices_of("scripts"), matches.get_many::<PathBuf>("scripts")) {
        steps.extend(idx.zip(values.map(|p| Step::Script(p.clone()))));
    }
    if let (Some(idx), Some(values)) = (matches.indices_of("exprs"), matches.get_many::<String>("exprs")) {
        steps.extend(idx.zip(values.map(|e| Step::Expr(e.clone()))));
    }
    steps.sort_by_key(|(i, _)| *i);
    steps.into_iter().map(|(_, s)| s).collect()
}

/// Handler for `exec`; it reads argument positions, so it works on the raw matches
pub struct ExecHandler;

impl SubCommand for ExecHandler {
    fn name(&self) -> &'static str {
        "exec"
    }

    fn about(&self) -> &'static str {
        "Run session scripts and -e expressions"
    }

    fn configure(&self, cmd: Command) -> Command {
        ExecCommand::augment_args(cmd)
    }

    fn run(&self, matches: &ArgMatches, session: &mut Session) -> CliResult<()> {
        let args = ExecCommand::from_arg_matches(matches).map_err(|e| CliError::invalid_args(e.to_string()))?;
        for spec in &args.load {
            let (name, mut paths) = parse_assignment(spec)?;
            let path = paths.pop().filter(|_| paths.is_empty()).ok_or_else(|| {
                CliError::invalid_args(format!("expected NAME=PATH, got '{}'", spec))
            })?;
            let ds = session.resolve_dataset(&path)?;
            session.insert(name, ds);
        }

        let steps = ordered_steps(matches);
        if steps.is_empty() && args.load.is_empty() {
            return Err(CliError::invalid_args("nothing to execute"));
        }
        for (n, step) in steps.into_iter().enumerate() {
            match step {
                Step::Script(path) => session.run_script_file(&path)?,
                Step::Expr(text) => {
                    info!(target: SESSION, "Running expression {}", n + 1);
                    session.run_script_text("-e", &text)?
                }
            }
        }
        Ok(())
    }
}
