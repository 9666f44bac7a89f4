//! End-to-end CLI surface tests that never touch a device.

use assert_cmd::Command;
use predicates::prelude::*;

fn panoply() -> Command {
    Command::cargo_bin("panoply").expect("panoply binary")
}

#[test]
fn help_lists_every_subcommand() {
    panoply()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("info")
                .and(predicate::str::contains("tag-audit"))
                .and(predicate::str::contains("wildfire"))
                .and(predicate::str::contains("zone-split"))
                .and(predicate::str::contains("config")),
        );
}

#[test]
fn no_arguments_shows_help_and_fails() {
    panoply()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn wildfire_requires_a_hash_file_argument() {
    panoply()
        .arg("wildfire")
        .assert()
        .failure()
        .stderr(predicate::str::contains("HASH_FILE"));
}

#[test]
fn zone_split_without_a_device_group_is_a_usage_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "").expect("write config");

    panoply()
        .args(["--config", &config.to_string_lossy(), "zone-split"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("device_group"));
}

#[test]
fn completions_generate_for_bash() {
    panoply()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("panoply"));
}

#[test]
fn config_path_prints_a_toml_location() {
    panoply()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn config_show_redacts_the_wildfire_key() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[wildfire]\napi_key = \"supersecret\"\n").expect("write config");

    panoply()
        .args(["--config", &config.to_string_lossy(), "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("<redacted>")
                .and(predicate::str::contains("supersecret").not()),
        );
}

#[test]
fn aborted_prompting_fails_cleanly_instead_of_hanging() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "").expect("write config");

    // No host flag and no terminal: the host prompt cannot complete, and
    // the run must end with a reported error rather than block forever.
    panoply()
        .args(["--config", &config.to_string_lossy(), "info"])
        .env_remove("PANOPLY_HOST")
        .write_stdin("")
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .failure()
        .stderr(predicate::str::is_empty().not());
}

#[test]
fn invalid_timeout_is_rejected_before_connecting() {
    panoply()
        .args(["--timeout", "0", "info"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("timeout"));
}
