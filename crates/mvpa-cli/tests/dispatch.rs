use assert_cmd::Command;
use predicates::prelude::*;
use std::error::Error;
use std::path::Path;
use tempfile::tempdir;

const COMMANDS: [&str; 13] = [
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

/// `mvpa` isolated from the user's configuration and log settings
fn mvpa(dir: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mvpa")?;
    cmd.current_dir(dir)
        .env("MVPA_CONFIG", dir.join("no-config.toml"))
        .env_remove("RUST_LOG")
        .env_remove("MVPA_VERBOSE")
        .env_remove("MVPA_DEBUG_POSTMORTEM");
    Ok(cmd)
}

#[test]
fn version_names_program_and_license() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    mvpa(tmp.path())?
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mvpa").and(predicate::str::contains("Apache License, Version 2.0")));
    Ok(())
}

#[test]
fn every_subcommand_reports_version() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    for name in COMMANDS {
        mvpa(tmp.path())?
            .args([name, "--version"])
            .assert()
            .success()
            .stdout(predicate::str::contains("mvpa").and(predicate::str::contains("MIT")));
    }
    Ok(())
}

#[test]
fn help_lists_all_commands() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let assert = mvpa(tmp.path())?.arg("--help").assert().success();
    let out = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    for name in COMMANDS {
        assert!(out.contains(name), "{} missing from help:\n{}", name, out);
    }
    Ok(())
}

#[test]
fn unknown_command_is_a_usage_error() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    mvpa(tmp.path())?
        .arg("frobnicate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("frobnicate"));
    Ok(())
}

#[test]
fn missing_command_prints_help() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    mvpa(tmp.path())?
        .arg("--dbg")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("crossval"));
    Ok(())
}

#[test]
fn verbose_level_reaches_the_command() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    mvpa(tmp.path())?
        .args(["--verbose", "3", "info", "--section", "session"])
        .assert()
        .success()
        .stdout(predicate::str::contains("verbosity: 3"));
    mvpa(tmp.path())?
        .args(["--verbose", "info", "--section", "session"])
        .assert()
        .success()
        .stdout(predicate::str::contains("verbosity: 0"));
    Ok(())
}

#[test]
fn config_supplies_default_verbosity() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let config = tmp.path().join("mvpa.toml");
    std::fs::write(&config, "[general]\nverbose = 2\n[searchlight]\nnproc = 4\n")?;
    mvpa(tmp.path())?
        .arg("--config")
        .arg(&config)
        .args(["info", "--section", "session", "--section", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("verbosity: 2").and(predicate::str::contains("searchlight.nproc = 4")));
    Ok(())
}

#[test]
fn info_json_has_requested_sections() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let assert = mvpa(tmp.path())?
        .args(["info", "--json", "--section", "commands", "--section", "system"])
        .assert()
        .success();
    let value: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(value["commands"].as_array().map(Vec::len), Some(13));
    assert_eq!(value["commands"][0]["name"], "info");
    assert!(value["system"]["cpus"].as_u64().unwrap_or(0) >= 1);
    assert!(value.get("version").is_none());
    Ok(())
}

#[test]
fn argument_files_are_expanded() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    std::fs::write(tmp.path().join("args.txt"), "info\n\n--section\nversion\n")?;
    mvpa(tmp.path())?
        .arg("@args.txt")
        .assert()
        .success()
        .stdout(predicate::str::contains("== version =="));

    mvpa(tmp.path())?.arg("@missing.txt").assert().code(2);
    Ok(())
}

#[test]
fn failing_preload_exits_with_one() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    std::fs::write(tmp.path().join("boot.mvpa"), "# setup\necho starting\nfail broken setup\n")?;
    mvpa(tmp.path())?
        .args(["--preload", "boot.mvpa", "info"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("starting"))
        .stderr(predicate::str::contains("broken setup").and(predicate::str::contains("ScriptError")));
    Ok(())
}

#[test]
fn preload_sets_configuration() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    std::fs::write(tmp.path().join("boot.mvpa"), "set searchlight.nproc 6\n")?;
    mvpa(tmp.path())?
        .args(["--preload", "boot.mvpa", "info", "--section", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("searchlight.nproc = 6"));
    Ok(())
}

#[test]
fn command_errors_report_kind() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    mvpa(tmp.path())?
        .args(["describe", "does-not-exist.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("IoError"));
    Ok(())
}

#[test]
fn debug_mode_dumps_post_mortem_off_terminal() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    mvpa(tmp.path())?
        .args(["--dbg", "describe", "does-not-exist.json"])
        .assert()
        .code(1)
        .stderr(
            predicate::str::contains("post-mortem: error")
                .and(predicate::str::contains("post-mortem: config")),
        );

    mvpa(tmp.path())?
        .env("MVPA_DEBUG_POSTMORTEM", "1")
        .args(["describe", "does-not-exist.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("post-mortem: backtrace"));
    Ok(())
}

#[test]
fn unknown_debug_channel_warns() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    mvpa(tmp.path())?
        .args(["--dbg-channel", "nonsense", "info", "--section", "session"])
        .assert()
        .success()
        .stderr(predicate::str::contains("unknown debug channel"));
    Ok(())
}

#[test]
fn session_channel_traces_dataset_loads() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    mvpa(tmp.path())?
        .args(["describe", "does-not-exist.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Loading dataset from").not());

    mvpa(tmp.path())?
        .args(["--dbg-channel", "session", "describe", "does-not-exist.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Loading dataset from does-not-exist.json"));
    Ok(())
}

#[test]
fn completion_script_is_generated() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    mvpa(tmp.path())?
        .args(["--completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mvpa"));
    Ok(())
}
