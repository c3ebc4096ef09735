//! `@file` argument indirection

use std::ffi::OsString;
use std::path::Path;

use crate::error::{CliError, CliResult};

/// Deepest nesting of `@file` references
pub const MAX_DEPTH: usize = 16;

/// Replace every `@path` argument by the lines of that file
///
/// Each non-empty line becomes one argument; lines may themselves be `@path`
/// references. The first argument (program name) is never expanded.
pub fn expand<I, T>(args: I) -> CliResult<Vec<OsString>>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut iter = args.into_iter().map(Into::into);
    let mut out = Vec::new();
    if let Some(prog) = iter.next() {
        out.push(prog);
    }
    for arg in iter {
        expand_one(arg, 0, &mut out)?;
    }
    Ok(out)
}

fn expand_one(arg: OsString, depth: usize, out: &mut Vec<OsString>) -> CliResult<()> {
    let path = match arg.to_str().and_then(|s| s.strip_prefix('@')) {
        Some(path) if !path.is_empty() => path.to_string(),
        _ => {
            out.push(arg);
            return Ok(());
        }
    };
    if depth >= MAX_DEPTH {
        return Err(CliError::invalid_args(format!(
            "@{}: argument files nested deeper than {}",
            path, MAX_DEPTH
        )));
    }
    let content = std::fs::read_to_string(Path::new(&path))
        .map_err(|e| CliError::invalid_args(format!("cannot read argument file {}: {}", path, e)))?;
    for line in content.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        expand_one(OsString::from(line), depth + 1, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn expands_nested_files() {
        let dir = tempdir().unwrap();
        let inner = dir.path().join("inner.args");
        let outer = dir.path().join("outer.args");
        std::fs::write(&inner, "--k\n3\n").unwrap();
        std::fs::write(&outer, format!("crossval\n\n@{}\n", inner.display())).unwrap();

        let args = expand(["mvpa".to_string(), format!("@{}", outer.display()), "-q".into()]).unwrap();
        assert_eq!(args, vec!["mvpa", "crossval", "--k", "3", "-q"]);
    }

    #[test]
    fn bare_at_and_program_name_are_kept() {
        let args = expand(["@prog", "@"]).unwrap();
        assert_eq!(args, vec!["@prog", "@"]);
    }

    #[test]
    fn missing_and_recursive_files_fail() {
        assert!(expand(["mvpa", "@/nonexistent/args"]).is_err());

        let dir = tempdir().unwrap();
        let selfref = dir.path().join("loop.args");
        std::fs::write(&selfref, format!("@{}\n", selfref.display())).unwrap();
        let err = expand(["mvpa".to_string(), format!("@{}", selfref.display())]).unwrap_err();
        assert!(err.to_string().contains("nested deeper"));
    }
}
