use assert_cmd::Command;
use predicates::prelude::*;

fn z2r() -> Command {
    let mut cmd = Command::cargo_bin("z2r").unwrap();
    cmd.env_remove("GITHUB_TOKEN")
        .env_remove("ZIP2REPO_CLIENT_ID")
        .env_remove("ZIP2REPO_PROXY_URL");
    cmd
}

#[test]
fn help_lists_commands() {
    z2r()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("auth"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn upload_rejects_invalid_repository_name() {
    z2r()
        .args(["upload", "site.zip", "--name", "not a valid/name"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid repository name"));
}

#[test]
fn upload_rejects_non_zip_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("site.tar.gz");
    std::fs::write(&path, b"not a zip").unwrap();

    z2r()
        .arg("upload")
        .arg(&path)
        .args(["--name", "site"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a ZIP file"));
}

#[test]
fn upload_rejects_corrupt_archive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("site.zip");
    std::fs::write(&path, b"definitely not a zip archive").unwrap();

    z2r()
        .arg("upload")
        .arg(&path)
        .args(["--name", "site"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot read archive"));
}

#[test]
fn config_rejects_unknown_key() {
    z2r()
        .args(["config", "get", "no-such-key"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
