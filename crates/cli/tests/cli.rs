use assert_cmd::Command;

#[test]
fn help_lists_subcommands() {
    let output = Command::cargo_bin("libris")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("check"));
}

#[test]
fn check_succeeds_with_in_memory_store() {
    Command::cargo_bin("libris")
        .unwrap()
        .arg("check")
        .env("LIBRIS_CONFIG_DIR", env!("CARGO_MANIFEST_DIR"))
        .env("LIBRIS_DATABASE__BACKEND", "memory")
        .env_remove("LIBRIS_ENV")
        .assert()
        .success();
}

#[test]
fn unknown_environment_fails() {
    Command::cargo_bin("libris")
        .unwrap()
        .args(["check", "--env", "moon"])
        .assert()
        .failure();
}
