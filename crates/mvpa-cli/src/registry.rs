//! Compile-time registry of sub-commands
//!
//! The registry holds one entry per name in [`COMMAND_NAMES`], in that order.
//! An entry is either an available handler or a disabled placeholder that is
//! still listed in help so users learn why it cannot run.

use clap::{Arg, ArgMatches, Args, Command};
use std::marker::PhantomData;

use crate::commands;
use crate::error::{CliError, CliResult};
use crate::session::Session;

/// Every sub-command name, in help order
pub const COMMAND_NAMES: [&str; 13] = [
    "info",
    "mkds",
    "mkevds",
    "describe",
    "dump",
    "preproc",
    "crossval",
    "searchlight",
    "select",
    "atlaslabeler",
    "exec",
    "ofmotionqc",
    "ttest",
];

/// Parser configuration and execution of one sub-command
pub trait SubCommand: Send + Sync {
    /// Name on the command line
    fn name(&self) -> &'static str;

    /// One-line description for help
    fn about(&self) -> &'static str;

    /// Add this command's arguments to its sub-parser
    fn configure(&self, cmd: Command) -> Command;

    /// Run with the matches of the sub-parser
    fn run(&self, matches: &ArgMatches, session: &mut Session) -> CliResult<()>;
}

/// A derive-based argument struct that knows how to execute itself
pub trait Execute: Args {
    const NAME: &'static str;
    const ABOUT: &'static str;

    fn execute(self, session: &mut Session) -> CliResult<()>;
}

/// Adapter turning an [`Execute`] type into a [`SubCommand`]
pub struct Handler<T>(PhantomData<fn() -> T>);

impl<T> Handler<T> {
    pub fn boxed() -> Box<dyn SubCommand>
    where
        T: Execute + 'static,
    {
        Box::new(Handler::<T>(PhantomData))
    }
}

impl<T: Execute> SubCommand for Handler<T> {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn about(&self) -> &'static str {
        T::ABOUT
    }

    fn configure(&self, cmd: Command) -> Command {
        T::augment_args(cmd)
    }

    fn run(&self, matches: &ArgMatches, session: &mut Session) -> CliResult<()> {
        let args = T::from_arg_matches(matches).map_err(|e| CliError::invalid_args(e.to_string()))?;
        args.execute(session)
    }
}

/// One registry slot
pub enum CommandEntry {
    Available(Box<dyn SubCommand>),
    Disabled { name: &'static str, reason: String },
}

impl CommandEntry {
    pub fn name(&self) -> &'static str {
        match self {
            CommandEntry::Available(handler) => handler.name(),
            CommandEntry::Disabled { name, .. } => name,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, CommandEntry::Available(_))
    }

    /// Help line for this entry
    pub fn description(&self) -> String {
        match self {
            CommandEntry::Available(handler) => handler.about().to_string(),
            CommandEntry::Disabled { reason, .. } => format!("[unavailable: {}]", reason),
        }
    }

    /// Sub-parser for this entry
    ///
    /// Disabled entries accept any trailing arguments so that invoking them
    /// reaches the handler and reports why they are unavailable.
    pub fn subparser(&self) -> Command {
        let cmd = Command::new(self.name()).about(self.description());
        match self {
            CommandEntry::Available(handler) => handler.configure(cmd),
            CommandEntry::Disabled { .. } => cmd.arg(
                Arg::new("args")
                    .num_args(0..)
                    .trailing_var_arg(true)
                    .allow_hyphen_values(true)
                    .hide(true),
            ),
        }
    }

    /// Run the entry
    pub fn run(&self, matches: &ArgMatches, session: &mut Session) -> CliResult<()> {
        match self {
            CommandEntry::Available(handler) => handler.run(matches, session),
            CommandEntry::Disabled { name, reason } => Err(CliError::Unavailable {
                name: name.to_string(),
                reason: reason.clone(),
            }),
        }
    }
}

/// Ordered set of sub-command entries
pub struct Registry {
    entries: Vec<CommandEntry>,
}

impl Registry {
    /// Registry of the commands compiled into this binary
    pub fn builtin() -> Self {
        Self::from_entries(COMMAND_NAMES.iter().map(|&name| commands::resolve(name)))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = CommandEntry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    /// Attach a sub-parser per entry to `root`
    pub fn register(&self, root: Command) -> Command {
        self.entries
            .iter()
            .fold(root, |root, entry| root.subcommand(entry.subparser()))
    }
}
