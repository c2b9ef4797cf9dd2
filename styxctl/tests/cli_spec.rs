#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ENGINE: &str = r#"#!/bin/sh
printf '%s\n' "$@" > "$(dirname "$0")/engine-args.txt"
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "--mount" ]; then
    case "$arg" in
      *,target=/styx_output)
        out=${arg#type=bind,source=}
        out=${out%,target=/styx_output}
        ;;
    esac
  fi
  prev=$arg
done
cd "$out" || exit 125
exec bash ./run.sh
"#;

fn fake_engine(dir: &Path) -> PathBuf {
    let engine = dir.join("fake-docker");
    fs::write(&engine, ENGINE).unwrap();
    fs::set_permissions(&engine, fs::Permissions::from_mode(0o755)).unwrap();
    engine
}

fn styxctl(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("styxctl").unwrap();
    for key in [
        "STYX_DOCKER_EXECUTABLE",
        "STYX_DATA_DIR",
        "STYX_DOCKER_USER_ID",
        "STYX_IMAGE_OVERRIDES",
        "STYX_DOCKER_ENV",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd.current_dir(temp.path());
    cmd
}

#[test]
fn version_prints_package_version() {
    let temp = tempfile::tempdir().unwrap();
    styxctl(&temp)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn run_requires_tool_arguments() {
    let temp = tempfile::tempdir().unwrap();
    styxctl(&temp)
        .args(["run", "--name", "t", "--image", "img"])
        .assert()
        .failure();
}

#[test]
fn run_reports_produced_outputs() {
    let temp = tempfile::tempdir().unwrap();
    let engine = fake_engine(temp.path());

    styxctl(&temp)
        .arg("run")
        .args(["--name", "writer", "--image", "styx/test:1.0", "--no-user"])
        .arg("--docker")
        .arg(&engine)
        .args(["--data-dir", "data"])
        .args(["--output", "result.txt", "--optional-output", "extra.txt"])
        .args(["--", "sh", "-c", "echo hi > result.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("result.txt\t"))
        .stdout(predicate::str::contains("extra.txt").not());

    let data = temp.path().join("data");
    let runs: Vec<_> = fs::read_dir(&data).unwrap().collect();
    assert_eq!(runs.len(), 1);
    let run_dir = runs[0].as_ref().unwrap().path();
    assert!(run_dir.to_string_lossy().ends_with("-0-writer"));
    assert_eq!(fs::read_to_string(run_dir.join("result.txt")).unwrap(), "hi\n");
}

#[test]
fn input_placeholders_are_substituted_into_run_script() {
    let temp = tempfile::tempdir().unwrap();
    let engine = fake_engine(temp.path());

    styxctl(&temp)
        .arg("run")
        .args(["--name", "skullstrip", "--image", "bet:7.4", "--user-id", "1000"])
        .arg("--docker")
        .arg(&engine)
        .args(["--data-dir", "data"])
        .args(["--input", "/data/t1.nii.gz", "--input-dir", "/data/atlas/mni.nii.gz"])
        .args(["--mutable-input", "/data/work/scratch.txt"])
        .args(["--env", "FSLOUTPUTTYPE=NIFTI_GZ"])
        .args(["--", "echo", "{0}", "{1}", "{2}"])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "/styx_input/0/t1.nii.gz /styx_input/1/mni.nii.gz /styx_input/2/scratch.txt",
        ));

    let recorded = fs::read_to_string(temp.path().join("engine-args.txt")).unwrap();
    assert!(recorded.contains("-u\n1000\n"));
    assert!(recorded.contains("type=bind,source=/data/atlas,target=/styx_input/1,readonly\n"));
    assert!(recorded.contains(
        "type=bind,source=/data/work/scratch.txt,target=/styx_input/2/scratch.txt\n"
    ));
    assert!(recorded.contains("--env\nFSLOUTPUTTYPE=NIFTI_GZ\n"));
}

#[test]
fn tool_output_is_logged_at_info_unless_filtered() {
    let temp = tempfile::tempdir().unwrap();
    let engine = fake_engine(temp.path());
    let run = |cmd: &mut Command| {
        cmd.arg("run")
            .args(["--name", "chatty", "--image", "img", "--no-user"])
            .arg("--docker")
            .arg(&engine)
            .args(["--data-dir", "data"])
            .args(["--", "sh", "-c", "echo to-stdout; echo to-stderr >&2"])
            .assert()
            .success()
    };

    run(&mut styxctl(&temp))
        .stderr(predicate::str::contains("to-stdout"))
        .stderr(predicate::str::contains("to-stderr"));

    run(styxctl(&temp).env("RUST_LOG", "error"))
        .stderr(predicate::str::contains("to-stdout").not())
        .stderr(predicate::str::contains("to-stderr"));
}

#[test]
fn failing_tool_propagates_exit_code_and_diagnostics() {
    let temp = tempfile::tempdir().unwrap();
    let engine = fake_engine(temp.path());

    styxctl(&temp)
        .arg("run")
        .args(["--name", "fail", "--image", "img", "--no-user"])
        .arg("--docker")
        .arg(&engine)
        .args(["--data-dir", "data"])
        .args(["--", "sh", "-c", "exit 3"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("- Return code: 3"))
        .stderr(predicate::str::contains("- Command args: sh -c 'exit 3'"));
}

#[test]
fn missing_required_output_fails() {
    let temp = tempfile::tempdir().unwrap();
    let engine = fake_engine(temp.path());

    styxctl(&temp)
        .arg("run")
        .args(["--name", "lazy", "--image", "img", "--no-user"])
        .arg("--docker")
        .arg(&engine)
        .args(["--data-dir", "data", "--output", "never.txt"])
        .args(["--", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing required outputs"));
}

#[test]
fn missing_image_is_a_configuration_error() {
    let temp = tempfile::tempdir().unwrap();

    styxctl(&temp)
        .args(["run", "--name", "untagged", "--data-dir", "data", "--", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No container image tag"));

    assert!(!temp.path().join("data").exists());
}

#[test]
fn yaml_config_supplies_engine_and_overrides() {
    let temp = tempfile::tempdir().unwrap();
    let engine = fake_engine(temp.path());
    let config = temp.path().join("runner.yaml");
    fs::write(
        &config,
        format!(
            "dockerExecutable: {}\ndataDir: data\ndockerUserId: null\nimageOverrides:\n  bet:7.4: myregistry/bet:7.4-patched\n",
            engine.display()
        ),
    )
    .unwrap();

    styxctl(&temp)
        .arg("run")
        .args(["--name", "bet", "--image", "bet:7.4", "--config"])
        .arg(&config)
        .args(["--", "true"])
        .assert()
        .success();

    let recorded = fs::read_to_string(temp.path().join("engine-args.txt")).unwrap();
    assert!(recorded.ends_with("myregistry/bet:7.4-patched\n./run.sh\n"));
    assert!(!recorded.contains("-u\n"));
}
