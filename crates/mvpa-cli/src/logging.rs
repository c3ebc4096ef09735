//! Logging setup: verbosity level and debug channels

use console::Term;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Session and script execution
pub const SESSION: &str = "session";
/// Command line handling and dispatch
pub const CMDLINE: &str = "cmdline";

/// Every channel that `--dbg-channel` accepts
pub fn known_channels() -> Vec<&'static str> {
    let mut all = mvpa_core::channels::ALL.to_vec();
    all.extend([SESSION, CMDLINE]);
    all
}

/// Base level for a verbosity value
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Filter directives for the given settings
///
/// `rust_log`, when set, replaces the verbosity-derived base level. Returns the
/// directive string and the channel names that are not known.
pub fn directives(verbosity: u8, channels: &[String], rust_log: Option<&str>) -> (String, Vec<String>) {
    let known = known_channels();
    let mut parts = vec![match rust_log {
        Some(filter) if !filter.trim().is_empty() => filter.trim().to_string(),
        _ => level_for(verbosity).to_string(),
    }];
    let mut unknown = Vec::new();
    for channel in channels {
        if known.contains(&channel.as_str()) {
            parts.push(format!("{}=trace", channel));
        } else {
            unknown.push(channel.clone());
        }
    }
    (parts.join(","), unknown)
}

/// Install the global subscriber writing to stderr
///
/// Calling it again is harmless; the first subscriber stays in place.
pub fn init(verbosity: u8, channels: &[String]) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let (spec, unknown) = directives(verbosity, channels, rust_log.as_deref());
    let filter = EnvFilter::try_new(&spec).unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(Term::stderr().is_term())
                .with_target(verbosity >= 2 || !channels.is_empty()),
        )
        .with(filter)
        .try_init();

    for channel in unknown {
        warn!(target: CMDLINE, "unknown debug channel '{}' (known: {})", channel, known_channels().join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_for(0), "warn");
        assert_eq!(level_for(1), "info");
        assert_eq!(level_for(2), "debug");
        assert_eq!(level_for(7), "trace");
    }

    #[test]
    fn channels_add_trace_directives() {
        let channels = vec!["crossval".to_string(), "bogus".to_string(), "session".to_string()];
        let (spec, unknown) = directives(1, &channels, None);
        assert_eq!(spec, "info,crossval=trace,session=trace");
        assert_eq!(unknown, vec!["bogus"]);
    }

    #[test]
    fn rust_log_replaces_base_level() {
        let (spec, _) = directives(0, &[], Some("mvpa_cli=debug"));
        assert_eq!(spec, "mvpa_cli=debug");
        let (spec, _) = directives(2, &[], Some("  "));
        assert_eq!(spec, "debug");
    }
}
