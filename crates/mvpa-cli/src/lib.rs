//! # mvpa CLI
//!
//! Command dispatcher for the `mvpa` binary. The binary only forwards its
//! arguments to [`run`]; everything else lives here so that the dispatcher,
//! the registry and each sub-command can be tested in-process.

pub mod argfile;
pub mod banner;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod postmortem;
pub mod registry;
pub mod script;
pub mod session;

pub use dispatch::run;
pub use error::{CliError, CliResult};
pub use session::Session;
