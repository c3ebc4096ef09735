//! Top-level dispatcher: parser construction, global flags, error handling

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use std::ffi::OsString;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::argfile;
use crate::banner::{long_version, PROG, VERSION};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::logging::{self, CMDLINE};
use crate::postmortem::{self, Failure};
use crate::registry::Registry;
use crate::session::Session;

/// Exit status for successful runs
pub const EXIT_OK: i32 = 0;
/// Exit status when the command or a preload script fails
pub const EXIT_FAILURE: i32 = 1;
/// Exit status for command line usage errors
pub const EXIT_USAGE: i32 = 2;

/// Global flags given before the sub-command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalArgs {
    /// `Some(0)` for a bare `--verbose`, `None` when absent
    pub verbose: Option<u8>,
    pub preload: Vec<PathBuf>,
    pub dbg: bool,
    pub channels: Vec<String>,
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            verbose: matches.get_one::<u8>("verbose").copied(),
            preload: matches
                .get_many::<PathBuf>("preload")
                .map(|v| v.cloned().collect())
                .unwrap_or_default(),
            dbg: matches.get_flag("dbg"),
            channels: matches
                .get_many::<String>("dbg-channel")
                .map(|v| v.cloned().collect())
                .unwrap_or_default(),
            config: matches.get_one::<PathBuf>("config").cloned(),
        }
    }
}

/// Main parser with one sub-parser per registry entry
pub fn build_cli(registry: &Registry) -> Command {
    let root = Command::new(PROG)
        .version(VERSION)
        .long_version(long_version())
        .propagate_version(true)
        .about("Multivariate pattern analysis from the command line")
        .long_about(
            "mvpa builds datasets from text files, preprocesses them and runs \
             cross-validated classification, searchlights and statistics. Datasets \
             can be passed as files or as session:NAME after a --preload script \
             loaded them. Arguments can be read from files with @path.",
        )
        .subcommand_precedence_over_arg(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .value_name("LEVEL")
                .num_args(0..=1)
                .default_missing_value("0")
                .value_parser(value_parser!(u8))
                .help("Verbosity level; 0 without a value"),
        )
        .arg(
            Arg::new("preload")
                .long("preload")
                .value_name("FILE")
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf))
                .help("Session script to run before the command (repeatable)"),
        )
        .arg(
            Arg::new("dbg")
                .long("dbg")
                .action(ArgAction::SetTrue)
                .help("Enter the post-mortem inspector when the command fails"),
        )
        .arg(
            Arg::new("dbg-channel")
                .long("dbg-channel")
                .value_name("NAME[,NAME]")
                .action(ArgAction::Append)
                .value_delimiter(',')
                .help("Enable trace output of a debug channel (repeatable)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file"),
        )
        .arg(
            Arg::new("completion")
                .long("completion")
                .value_name("SHELL")
                .value_parser(value_parser!(Shell))
                .help("Print a shell completion script and exit"),
        );
    registry.register(root)
}

fn report(error: &CliError) {
    eprintln!("{}: error: {} [{}]", PROG, error, error.kind_name());
}

/// Run the preload scripts and the selected command, catching panics
fn execute(
    registry: &Registry,
    name: &str,
    matches: &ArgMatches,
    preload: &[PathBuf],
    session: &mut Session,
) -> CliResult<()> {
    let outcome = catch_unwind(AssertUnwindSafe(|| -> CliResult<()> {
        for script in preload {
            session.run_script_file(script)?;
        }
        let entry = registry
            .get(name)
            .ok_or_else(|| CliError::invalid_args(format!("unknown command '{}'", name)))?;
        info!(target: CMDLINE, "Running command '{}'", name);
        entry.run(matches, session)
    }));
    match outcome {
        Ok(result) => result,
        Err(payload) => {
            let message = postmortem::last_panic_message()
                .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(CliError::Panic(message))
        }
    }
}

/// Run `mvpa` with the given arguments and return the process exit status
pub fn run<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args = match argfile::expand(args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}: error: {}", PROG, e);
            return EXIT_USAGE;
        }
    };

    let registry = Registry::builtin();
    let mut cli = build_cli(&registry);
    let matches = match cli.try_get_matches_from_mut(args) {
        Ok(matches) => matches,
        Err(e) => {
            let _ = e.print();
            return e.exit_code();
        }
    };

    if let Some(shell) = matches.get_one::<Shell>("completion") {
        clap_complete::generate(*shell, &mut cli, PROG, &mut std::io::stdout());
        return EXIT_OK;
    }

    let Some((name, sub_matches)) = matches.subcommand() else {
        eprintln!("{}", cli.render_help());
        return EXIT_USAGE;
    };

    let globals = GlobalArgs::from_matches(&matches);
    let (config, config_path) = match CliConfig::resolve(globals.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            report(&e);
            return EXIT_FAILURE;
        }
    };

    let verbosity = globals.verbose.unwrap_or(config.general.verbose);
    let mut channels = config.debug.channels.clone();
    channels.extend(globals.channels.iter().cloned());
    logging::init(verbosity, &channels);
    debug!(target: CMDLINE, "verbosity {}, channels {:?}, config {:?}", verbosity, channels, config_path);

    let mut session = Session::new(config, config_path, verbosity, channels);
    postmortem::install_panic_hook();

    match execute(&registry, name, sub_matches, &globals.preload, &mut session) {
        Ok(()) => EXIT_OK,
        Err(error) => {
            report(&error);
            if globals.dbg || session.config.debug.postmortem {
                let panic = postmortem::take_panic();
                postmortem::inspect(&Failure::new(error, panic), &session);
            }
            EXIT_FAILURE
        }
    }
}
