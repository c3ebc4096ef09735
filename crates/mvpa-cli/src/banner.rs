//! Program name, version and license banner

/// Program name used in help, version output and error reports
pub const PROG: &str = "mvpa";

/// Package version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const LICENSE: &str = "\
Copyright (c) mvpa Development Team

Licensed under either of
  * Apache License, Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
  * MIT license (http://opensource.org/licenses/MIT)
at your option.

This program is distributed in the hope that it will be useful, but WITHOUT
ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
FOR A PARTICULAR PURPOSE.";

/// Text printed after `mvpa <version>` by `--version`
pub fn long_version() -> String {
    format!(
        "{} (mvpa-core {})\n\n{}",
        VERSION,
        mvpa_core::VERSION,
        LICENSE
    )
}

/// Full banner as shown by `mvpa info`
pub fn banner() -> String {
    format!("{} {}", PROG, long_version())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_names_program_and_licenses() {
        let text = banner();
        assert!(text.starts_with("mvpa "));
        assert!(text.contains("MIT"));
        assert!(text.contains("Apache License, Version 2.0"));
    }
}
