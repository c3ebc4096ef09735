//! # mvpa - multivariate pattern analysis from the command line
//!
//! Builds, preprocesses and analyses datasets through a fixed set of
//! sub-commands. See `mvpa --help`.

fn main() {
    std::process::exit(mvpa_cli::run(std::env::args_os()));
}
