use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn odyssey(config_dir: &std::path::Path, data_dir: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_odyssey"));
    command
        .env("ODYSSEY_CONFIG_DIR", config_dir)
        .env("ODYSSEY_DATA_DIR", data_dir)
        .env("RUST_LOG", "warn");
    command
}

#[test]
fn config_show_prints_defaults_without_a_file() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    let data_dir = root.path().join("data");

    let output = odyssey(&config_dir, &data_dir)
        .args(["config", "show"])
        .output()
        .expect("failed to run odyssey config show");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("[window]"), "stdout: {stdout}");
    assert!(stdout.contains("name = \"odyssey\""), "stdout: {stdout}");
    assert!(stdout.contains("aspect = \"7:3\""), "stdout: {stdout}");
}

#[test]
fn config_show_merges_file_and_flags() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    let data_dir = root.path().join("data");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("odyssey.toml"),
        "[shader]\nname = \"tunnel\"\n\n[soundtrack]\nvolume = 0.25\n",
    )
    .unwrap();

    let output = odyssey(&config_dir, &data_dir)
        .args(["--size", "640x480", "config", "show"])
        .output()
        .expect("failed to run odyssey config show");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("name = \"tunnel\""), "stdout: {stdout}");
    assert!(stdout.contains("volume = 0.25"), "stdout: {stdout}");
    assert!(stdout.contains("width = 640"), "stdout: {stdout}");
    assert!(stdout.contains("height = 480"), "stdout: {stdout}");
}

#[test]
fn config_where_reports_env_directories() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    let data_dir = root.path().join("data");

    let output = odyssey(&config_dir, &data_dir)
        .args(["config", "where"])
        .output()
        .expect("failed to run odyssey config where");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(&config_dir.join("odyssey.toml").display().to_string()));
    assert!(stdout.contains(&data_dir.display().to_string()));
    assert!(stdout.contains("missing, using defaults"));
}

#[test]
fn invalid_config_fails_with_every_problem() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    let data_dir = root.path().join("data");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("odyssey.toml"),
        "[scene]\naspect = \"wide\"\nrows = 1\n",
    )
    .unwrap();

    let output = odyssey(&config_dir, &data_dir)
        .args(["config", "show"])
        .output()
        .expect("failed to run odyssey config show");

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("aspect"), "stderr: {stderr}");
    assert!(stderr.contains("rows"), "stderr: {stderr}");
}

#[test]
fn unknown_keys_are_rejected() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    let data_dir = root.path().join("data");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("odyssey.toml"), "[window]\nwidht = 800\n").unwrap();

    let status = odyssey(&config_dir, &data_dir)
        .args(["config", "show"])
        .status()
        .expect("failed to run odyssey config show");

    assert!(!status.success());
}
