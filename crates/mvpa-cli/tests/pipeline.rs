use assert_cmd::Command;
use predicates::prelude::*;
use std::error::Error;
use std::path::Path;
use tempfile::tempdir;

use mvpa_core::io::load_dataset;

fn mvpa(dir: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mvpa")?;
    cmd.current_dir(dir)
        .env("MVPA_CONFIG", dir.join("no-config.toml"))
        .env_remove("RUST_LOG")
        .env_remove("MVPA_VERBOSE")
        .env_remove("MVPA_DEBUG_POSTMORTEM");
    Ok(cmd)
}

/// 4 chunks x 4 samples, alternating targets a/b, 8 features on a 2x2x2 grid.
/// Class a is high on the first four features, class b on the last four.
fn write_inputs(dir: &Path) -> Result<(), Box<dyn Error>> {
    let mut lines = Vec::new();
    let mut targets = Vec::new();
    let mut chunks = Vec::new();
    for i in 0..16usize {
        let is_a = i % 2 == 0;
        let row: Vec<String> = (0..8usize)
            .map(|f| {
                let signal = if (f < 4) == is_a { 2.0 } else { 0.0 };
                let noise = 0.01 * ((i * 7 + f * 3) % 5) as f64;
                format!("{}", signal + noise)
            })
            .collect();
        lines.push(row.join(" "));
        targets.push(if is_a { "a" } else { "b" });
        chunks.push((i / 4).to_string());
    }
    std::fs::write(dir.join("data.txt"), lines.join("\n"))?;
    std::fs::write(dir.join("targets.txt"), targets.join("\n"))?;
    std::fs::write(dir.join("chunks.txt"), chunks.join("\n"))?;
    Ok(())
}

fn make_dataset(dir: &Path) -> Result<(), Box<dyn Error>> {
    write_inputs(dir)?;
    mvpa(dir)?
        .args([
            "mkds",
            "--txt-data",
            "data.txt",
            "--add-sa-attr",
            "targets",
            "targets.txt",
            "--add-sa-attr",
            "chunks",
            "chunks.txt",
            "--add-sa",
            "subject=s01",
            "--grid",
            "2x2x2",
            "-o",
            "ds.mvds",
        ])
        .assert()
        .success();
    Ok(())
}

#[test]
fn mkds_builds_attributes() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    make_dataset(tmp.path())?;
    let ds = load_dataset(tmp.path().join("ds.mvds"))?;
    assert_eq!(ds.shape(), (16, 8));
    assert_eq!(ds.labels("subject")?, vec!["s01"; 16]);
    assert_eq!(ds.fa_get("voxel_indices")?.as_coords().map(|c| c[7].clone()), Some(vec![1, 1, 1]));

    mvpa(tmp.path())?
        .args(["describe", "ds.mvds", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"nsamples\": 16"));
    Ok(())
}

#[test]
fn mkds_rejects_wrong_grid() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    write_inputs(tmp.path())?;
    mvpa(tmp.path())?
        .args(["mkds", "--txt-data", "data.txt", "--grid", "3x3", "-o", "x.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ShapeError"));
    Ok(())
}

#[test]
fn preprocess_then_classify() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    make_dataset(tmp.path())?;
    mvpa(tmp.path())?
        .args([
            "preproc",
            "ds.mvds",
            "--poly-detrend",
            "0",
            "--detrend-chunks-attr",
            "chunks",
            "--zscore",
            "--zscore-chunks-attr",
            "chunks",
            "-o",
            "z.json",
        ])
        .assert()
        .success();
    let z = load_dataset(tmp.path().join("z.json"))?;
    let first_chunk_mean: f64 = (0..4).map(|i| z.samples()[[i, 0]]).sum::<f64>() / 4.0;
    assert!(first_chunk_mean.abs() < 1e-9);

    mvpa(tmp.path())?
        .args(["crossval", "z.json", "--clf", "knn", "--k", "1", "-o", "cv.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mean accuracy 1.000"));
    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(tmp.path().join("cv.json"))?)?;
    assert_eq!(report["result"]["folds"].as_array().map(Vec::len), Some(4));
    assert_eq!(report["mean_accuracy"], 1.0);

    mvpa(tmp.path())?
        .args([
            "crossval",
            "z.json",
            "--clf",
            "gnb",
            "--partitioner",
            "oddeven",
            "--permutations",
            "9",
            "--seed",
            "3",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("permutation p-value"));
    Ok(())
}

#[test]
fn searchlight_and_group_ttest() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    make_dataset(tmp.path())?;
    mvpa(tmp.path())?
        .args([
            "searchlight",
            "ds.mvds",
            "--clf",
            "mean-distance",
            "--radius",
            "1",
            "--nproc",
            "2",
            "-o",
            "sl.json",
        ])
        .assert()
        .success();
    let sl = load_dataset(tmp.path().join("sl.json"))?;
    assert_eq!(sl.shape(), (4, 8));
    assert_eq!(sl.labels("cvfolds")?, vec!["0", "1", "2", "3"]);
    assert!(sl.fa_get("roi_sizes").is_ok());
    assert!(sl.fa_get("voxel_indices").is_ok());

    mvpa(tmp.path())?
        .args(["searchlight", "ds.mvds", "--center-ids", "0,7", "--mean", "-o", "slm.json"])
        .assert()
        .success();
    assert_eq!(load_dataset(tmp.path().join("slm.json"))?.shape(), (1, 2));

    mvpa(tmp.path())?
        .args(["ttest", "sl.json", "--mu", "0.5", "--alternative", "greater", "-o", "t.mvds"])
        .assert()
        .success();
    let t = load_dataset(tmp.path().join("t.mvds"))?;
    assert_eq!(t.shape(), (2, 8));
    assert_eq!(t.labels("stat")?, vec!["t", "p"]);
    Ok(())
}

#[test]
fn select_and_dump() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    make_dataset(tmp.path())?;
    mvpa(tmp.path())?
        .args([
            "select",
            "ds.mvds",
            "--samples-by-attr",
            "targets==a",
            "--samples-by-attr",
            "chunks<2",
            "--feature-ids",
            "0,1,2",
            "-o",
            "sel.json",
        ])
        .assert()
        .success();
    assert_eq!(load_dataset(tmp.path().join("sel.json"))?.shape(), (4, 3));

    mvpa(tmp.path())?
        .args(["dump", "sel.json", "--sa", "targets"])
        .assert()
        .success()
        .stdout("a\na\na\na\n");
    mvpa(tmp.path())?
        .args(["dump", "sel.json", "--fa", "voxel_indices", "-f", "csv"])
        .assert()
        .success()
        .stdout("0,0,0\n0,0,1\n0,1,0\n");

    mvpa(tmp.path())?
        .args(["select", "ds.mvds", "--samples-by-attr", "targets==zzz", "-o", "none.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("SelectionError"));
    Ok(())
}

#[test]
fn event_related_dataset() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    make_dataset(tmp.path())?;
    std::fs::write(tmp.path().join("events.txt"), "onset duration cond\n0 2 x\n4 2 y\n15 2 z\n")?;
    mvpa(tmp.path())?
        .args(["mkevds", "ds.mvds", "--events", "events.txt", "-o", "ev.json"])
        .assert()
        .code(1);
    mvpa(tmp.path())?
        .args(["mkevds", "ds.mvds", "--events", "events.txt", "--skip-incomplete", "-o", "ev.json"])
        .assert()
        .success();
    let ev = load_dataset(tmp.path().join("ev.json"))?;
    assert_eq!(ev.shape(), (2, 16));
    assert_eq!(ev.labels("cond")?, vec!["x", "y"]);
    assert_eq!(ev.labels("event_onsetidx")?, vec!["0", "4"]);

    mvpa(tmp.path())?
        .args(["mkevds", "ds.mvds", "--onsets", "1,5,9", "--duration", "3", "-o", "ev2.json"])
        .assert()
        .success();
    assert_eq!(load_dataset(tmp.path().join("ev2.json"))?.shape(), (3, 24));
    Ok(())
}

#[cfg(feature = "atlas")]
#[test]
fn atlas_labels_features() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    make_dataset(tmp.path())?;
    std::fs::write(
        tmp.path().join("atlas.json"),
        r#"{ "name": "halves", "shape": [2, 2, 2], "labels": { "1": "front", "2": "back" },
             "data": [1, 1, 1, 1, 2, 2, 2, 0] }"#,
    )?;
    mvpa(tmp.path())?
        .args(["atlaslabeler", "ds.mvds", "--atlas", "atlas.json", "-o", "lab.json"])
        .assert()
        .success();
    let lab = load_dataset(tmp.path().join("lab.json"))?;
    let labels = lab.fa_get("atlas_label")?.labels();
    assert_eq!(labels[0], "front");
    assert_eq!(labels[4], "back");
    assert_eq!(labels[7], "unlabeled");
    Ok(())
}

#[test]
fn session_scripts_feed_commands() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    make_dataset(tmp.path())?;
    std::fs::write(
        tmp.path().join("prep.mvpa"),
        "load d ds.mvds\nzscore d chunks\nselect d samples chunks!=3\n",
    )?;
    mvpa(tmp.path())?
        .args(["--preload", "prep.mvpa", "describe", "session:d"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dataset: 12 samples x 8 features"));

    mvpa(tmp.path())?
        .args(["exec", "--load", "d=ds.mvds", "-e", "describe d", "-e", "save d copy.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("d: 16 samples x 8 features"));
    assert_eq!(load_dataset(tmp.path().join("copy.json"))?.nsamples(), 16);

    mvpa(tmp.path())?
        .args(["exec", "-e", "drop nothing"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("-e:1:"));
    Ok(())
}

#[test]
fn motion_qc_across_subjects() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    for (subject, step) in [("sub01", 0.0), ("sub02", 0.01), ("sub03", 0.0), ("sub04", 0.5)] {
        let dir = tmp.path().join("data").join(subject).join("func");
        std::fs::create_dir_all(&dir)?;
        let rows: Vec<String> = (0..5)
            .map(|v| format!("0 0 0 {} 0 0", step * v as f64))
            .collect();
        std::fs::write(dir.join("motion.par"), rows.join("\n"))?;
    }
    let assert = mvpa(tmp.path())?
        .args(["ofmotionqc", "--base-dir", "data", "--outlier-mad", "2", "--json"])
        .assert()
        .success();
    let report: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    let subjects = report["subjects"].as_array().cloned().unwrap_or_default();
    assert_eq!(subjects.len(), 4);
    assert_eq!(subjects[3]["subject"], "sub04");
    assert_eq!(subjects[3]["outlier"], true);
    assert_eq!(subjects[0]["outlier"], false);

    mvpa(tmp.path())?
        .args(["ofmotionqc", "--base-dir", "data", "--motion-file", "other.par"])
        .assert()
        .code(1);
    Ok(())
}
