//! Post-mortem inspection of a failed command

use console::Term;
use dialoguer::{theme::ColorfulTheme, Select};
use std::backtrace::Backtrace;
use std::error::Error as _;
use std::fmt::Write as _;
use std::sync::Mutex;

use crate::error::CliError;
use crate::session::{summary_line, Session};

/// What the panic hook saw
#[derive(Debug, Clone)]
pub struct PanicReport {
    pub message: String,
    pub location: Option<String>,
    pub backtrace: String,
}

static LAST_PANIC: Mutex<Option<PanicReport>> = Mutex::new(None);

/// Record panics for the inspector instead of printing them
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        let report = PanicReport {
            message,
            location: info.location().map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column())),
            backtrace: Backtrace::force_capture().to_string(),
        };
        if let Ok(mut slot) = LAST_PANIC.lock() {
            *slot = Some(report);
        }
    }));
}

/// Message of the most recent panic, leaving the report in place
pub fn last_panic_message() -> Option<String> {
    LAST_PANIC
        .lock()
        .ok()
        .and_then(|slot| slot.as_ref().map(|p| p.message.clone()))
}

/// Take the most recent panic report
pub fn take_panic() -> Option<PanicReport> {
    LAST_PANIC.lock().ok().and_then(|mut slot| slot.take())
}

/// A failure handed to the inspector
pub struct Failure {
    pub error: CliError,
    pub panic: Option<PanicReport>,
}

impl Failure {
    pub fn new(error: CliError, panic: Option<PanicReport>) -> Self {
        Self { error, panic }
    }

    /// Error message followed by its sources
    pub fn chain(&self) -> String {
        let mut out = format!("{} [{}]", self.error, self.error.kind_name());
        let mut source = self.error.source();
        while let Some(cause) = source {
            let _ = write!(out, "\n  caused by: {}", cause);
            source = cause.source();
        }
        if let Some(location) = self.panic.as_ref().and_then(|p| p.location.as_ref()) {
            let _ = write!(out, "\n  panicked at {}", location);
        }
        out
    }

    pub fn backtrace(&self) -> String {
        match &self.panic {
            Some(panic) => panic.backtrace.clone(),
            None => "no backtrace: the command returned an error without panicking".to_string(),
        }
    }
}

fn datasets(session: &Session) -> String {
    let lines: Vec<String> = session.datasets().map(|(n, ds)| summary_line(n, ds)).collect();
    if lines.is_empty() {
        "no session datasets".to_string()
    } else {
        lines.join("\n")
    }
}

fn configuration(session: &Session) -> String {
    let mut out = match &session.config_path {
        Some(path) => format!("file: {}\n", path.display()),
        None => "file: (none)\n".to_string(),
    };
    for (key, value) in session.config.entries() {
        let _ = writeln!(out, "{} = {}", key, value);
    }
    let _ = write!(out, "verbosity = {}", session.verbosity);
    out
}

/// Inspect a failure: a menu on terminals, a full dump otherwise
pub fn inspect(failure: &Failure, session: &Session) {
    let term = Term::stderr();
    if !term.is_term() {
        dump(&term, failure, session);
        return;
    }

    let items = ["Error chain", "Backtrace", "Session datasets", "Configuration", "Quit"];
    let _ = term.write_line("Entering post-mortem inspection");
    loop {
        let choice = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Inspect")
            .items(&items)
            .default(0)
            .interact_on_opt(&term);
        let text = match choice {
            Ok(Some(0)) => failure.chain(),
            Ok(Some(1)) => failure.backtrace(),
            Ok(Some(2)) => datasets(session),
            Ok(Some(3)) => configuration(session),
            _ => break,
        };
        let _ = term.write_line(&text);
    }
}

fn dump(term: &Term, failure: &Failure, session: &Session) {
    let sections = [
        ("error", failure.chain()),
        ("backtrace", failure.backtrace()),
        ("session", datasets(session)),
        ("config", configuration(session)),
    ];
    for (title, body) in sections {
        let _ = term.write_line(&format!("--- post-mortem: {} ---\n{}", title, body));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_includes_sources_and_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CliError = mvpa_core::MvpaError::io("data.json", io).into();
        let failure = Failure::new(err, None);
        let chain = failure.chain();
        assert!(chain.contains("[IoError]"));
        assert!(chain.contains("caused by: gone"));
        assert!(failure.backtrace().starts_with("no backtrace"));
    }

    #[test]
    fn configuration_lists_effective_values() {
        let session = Session::default();
        let text = configuration(&session);
        assert!(text.contains("searchlight.nproc = 1"));
        assert!(text.ends_with("verbosity = 0"));
    }
}
