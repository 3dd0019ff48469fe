// tests/integration_test.rs
use std::process::Command;

fn mod_release() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mod-release"));
    cmd.env("RUST_LOG", "off");
    cmd
}

#[test]
fn test_mod_release_help() {
    let output = mod_release().arg("--help").output().expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("mod-release"));
    assert!(stdout.contains("update-remote"));
    assert!(stdout.contains("--mock"));
}

#[test]
fn test_release_help_lists_flags() {
    let output = mod_release()
        .args(["release", "--help"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    for flag in ["--prerelease", "--draft", "--major", "--force-commit", "--forum-title", "--no-steam"] {
        assert!(stdout.contains(flag), "missing {} in:\n{}", flag, stdout);
    }
}

#[test]
fn test_dry_run_release_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    git2::Repository::init(dir.path()).unwrap();

    let output = mod_release()
        .current_dir(dir.path())
        .args(["--dry-run", "release", "--no-forum"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(output.status.success(), "stdout:\n{}", stdout);
    assert!(stdout.contains("would check for uncommitted changes"));
    assert!(stdout.contains("forum-post (skipped)"));
    assert!(stdout.contains("Dry run:"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_outside_repository_fails() {
    let dir = tempfile::tempdir().unwrap();

    let output = mod_release()
        .args(["--source", &dir.path().display().to_string(), "update"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("no git repository"));
}

#[test]
fn test_unknown_subcommand_rejected() {
    let output = mod_release().arg("publish").output().expect("Failed to execute command");
    assert_eq!(output.status.code(), Some(2));
}
