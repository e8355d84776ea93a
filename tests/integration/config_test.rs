use assert_cmd::Command;
use predicates::prelude::*;

fn config_show(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("apiscan").unwrap();
    cmd.args(["config", "show", "--path", dir.to_str().unwrap()]);
    cmd
}

#[test]
fn config_show_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    config_show(tmp.path())
        .env_remove("APISCAN_FORMAT")
        .env_remove("APISCAN_QUIET")
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded config files: (none)"))
        .stdout(predicate::str::contains("Resolved settings"))
        .stdout(predicate::str::contains("defaults.format: md <- default"))
        .stdout(predicate::str::contains("defaults.quiet: false <- default"))
        .stdout(predicate::str::contains("filters.auth: any <- default"));
}

#[test]
fn config_show_with_project_config() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join(".apiscan.toml"),
        r#"
[defaults]
format = "csv"
lang = "java"

[filters]
auth = "authenticated"
"#,
    )
    .unwrap();

    config_show(tmp.path())
        .env_remove("APISCAN_FORMAT")
        .env_remove("APISCAN_LANG")
        .assert()
        .success()
        .stdout(predicate::str::contains(".apiscan.toml"))
        .stdout(predicate::str::contains("defaults.format: csv <- project config"))
        .stdout(predicate::str::contains("defaults.lang: java <- project config"))
        .stdout(predicate::str::contains(
            "filters.auth: authenticated <- project config",
        ));
}

#[test]
fn config_show_env_overrides_project() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join(".apiscan.toml"), "[defaults]\nformat = \"csv\"\n").unwrap();

    config_show(tmp.path())
        .env("APISCAN_FORMAT", "json")
        .env("APISCAN_IGNORE_PATHS", "src/test;target")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "defaults.format: json <- env var (APISCAN_FORMAT)",
        ))
        .stdout(predicate::str::contains(
            "targeting.ignore_paths: [src/test, target] <- env var (APISCAN_IGNORE_PATHS)",
        ));
}

#[test]
fn invalid_config_value_fails() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join(".apiscan.toml"), "[defaults]\nformat = \"yaml\"\n").unwrap();

    config_show(tmp.path())
        .env_remove("APISCAN_FORMAT")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown output format: yaml"));
}
