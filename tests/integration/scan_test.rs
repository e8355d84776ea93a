use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn apiscan() -> Command {
    let mut cmd = Command::cargo_bin("apiscan").unwrap();
    for var in [
        "APISCAN_FORMAT",
        "APISCAN_LANG",
        "APISCAN_QUIET",
        "APISCAN_IGNORE_PATHS",
        "APISCAN_EXT",
        "APISCAN_EXCLUDE_EXT",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Run a quiet JSON scan and return the report records.
fn scan_json(fixture: &str, extra: &[&str]) -> Vec<Value> {
    let output = apiscan()
        .arg("scan")
        .arg(fixture_path(fixture))
        .args(["--format", "json", "--quiet"])
        .args(extra)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice::<Value>(&output.stdout)
        .unwrap()
        .as_array()
        .unwrap()
        .clone()
}

fn routes(records: &[Value]) -> Vec<(String, String)> {
    records
        .iter()
        .map(|r| {
            (
                r["Method"].as_str().unwrap().to_string(),
                r["Endpoint"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

fn pair(method: &str, path: &str) -> (String, String) {
    (method.to_string(), path.to_string())
}

#[test]
fn scan_python_app_json() {
    let records = scan_json("python_app", &[]);
    assert_eq!(
        routes(&records),
        vec![
            pair("GET", "/health"),
            pair("GET", "/items/{item_id}"),
            pair("POST", "/items"),
            pair("DELETE", "/items/{item_id}"),
        ]
    );

    let read_item = &records[1];
    assert_eq!(read_item["Location"], "app/main.py:12");
    assert_eq!(read_item["Parameters"]["path"], "item_id");
    assert_eq!(read_item["Parameters"]["query"], "q");
    assert!(read_item["Parameters"]["body"].is_null());
    assert_eq!(read_item["Authentication"], "Unknown");

    let create = &records[2];
    assert_eq!(create["Parameters"]["body"], "item");
    assert_eq!(create["Parameters"]["header"], "x_token");
}

#[test]
fn scan_java_app_applies_base_paths_and_auth() {
    let records = scan_json("java_app", &[]);
    let found = routes(&records);
    assert_eq!(
        found,
        vec![
            pair("GET", "/api/orders/{id}"),
            pair("POST", "/api/orders"),
            pair("GET", "/status"),
        ]
    );
    assert_eq!(records[0]["Authentication"], "Yes");
    assert_eq!(records[0]["Parameters"]["path"], "id");
    assert_eq!(records[0]["Parameters"]["query"], "expand");
    assert_eq!(records[1]["Parameters"]["body"], "order");
    assert_eq!(records[2]["Authentication"], "Unknown");
    assert_eq!(records[2]["Parameters"]["query"], "verbose");
}

#[test]
fn scan_express_app_covers_js_and_ts() {
    let records = scan_json("express_app", &[]);
    let found = routes(&records);
    assert!(found.contains(&pair("GET", "/users/:id")));
    assert!(found.contains(&pair("POST", "/users")));
    assert!(found.contains(&pair("DELETE", "/admin/cache")));
    assert!(found.contains(&pair("PATCH", "/admin/users/:userId")));
    assert!(found.contains(&pair("GET", "/test-only")));

    let get_user = records
        .iter()
        .find(|r| r["Endpoint"] == "/users/:id")
        .unwrap();
    assert_eq!(get_user["Parameters"]["path"], "id");
    assert_eq!(get_user["Parameters"]["query"], "fields");
}

#[test]
fn ignore_paths_and_extension_filters() {
    let records = scan_json("express_app", &["--ignore-paths", "test;routes"]);
    assert_eq!(
        routes(&records),
        vec![pair("GET", "/users/:id"), pair("POST", "/users")]
    );

    let records = scan_json("express_app", &["--ext", "ts"]);
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|r| r["Location"].as_str().unwrap().starts_with("routes/admin.ts:")));
}

#[test]
fn path_filter_limits_the_walk_but_keeps_root_relative_paths() {
    let records = scan_json("express_app", &["--path-filter", "routes"]);
    assert_eq!(records.len(), 2);
    assert!(records[0]["Location"]
        .as_str()
        .unwrap()
        .starts_with("routes/admin.ts:"));
}

#[test]
fn verb_and_auth_filters() {
    let records = scan_json("python_app", &["--include-verbs", "get,delete", "--exclude-verbs", "DELETE"]);
    assert_eq!(
        routes(&records),
        vec![pair("GET", "/health"), pair("GET", "/items/{item_id}")]
    );

    let records = scan_json("java_app", &["--auth"]);
    assert_eq!(records.len(), 2);
    let records = scan_json("java_app", &["--no-auth"]);
    assert_eq!(routes(&records), vec![pair("GET", "/status")]);
}

#[test]
fn forced_language_skips_other_files() {
    let records = scan_json("express_app", &["--lang", "nodejs"]);
    assert_eq!(records.len(), 5);
    let records = scan_json("express_app", &["--lang", "java"]);
    assert!(records.is_empty());
}

#[test]
fn status_lines_go_to_stderr() {
    apiscan()
        .arg("scan")
        .arg(fixture_path("python_app"))
        .args(["--format", "csv", "--include-verbs", "POST"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "Endpoint|Method|Parameters|Authentication|Location|Snippet",
        ))
        .stdout(predicate::str::contains("/items|POST|Body: item Header: x_token|Unknown|app/main.py:17|"))
        .stderr(predicate::str::contains(
            "Analysis complete. Analyzed 2 files and found 4 potential endpoints.",
        ))
        .stderr(predicate::str::contains("3 endpoints filtered out. 1 remaining."));
}

#[test]
fn verbose_lists_each_file() {
    apiscan()
        .arg("scan")
        .arg(fixture_path("java_app"))
        .args(["--verbose", "--format", "json"])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            " -> Analyzing src/main/java/com/acme/shop/OrderController.java as java",
        ));
}

#[test]
fn markdown_is_the_default_and_output_file_is_written() {
    let tmp = tempfile::tempdir().unwrap();
    let report = tmp.path().join("report.md");
    apiscan()
        .arg("scan")
        .arg(fixture_path("python_app"))
        .arg("--output")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Results saved to"));

    let content = std::fs::read_to_string(&report).unwrap();
    assert!(content.starts_with("| Endpoint | Method |"));
    assert!(content.contains("[app/main.py:7]"));
    assert!(content.contains("<b>Path:</b> item_id<br><b>Query:</b> q"));
}

#[test]
fn empty_directory_renders_an_empty_report() {
    let tmp = tempfile::tempdir().unwrap();
    apiscan()
        .arg("scan")
        .arg(tmp.path())
        .args(["--format", "json", "--quiet"])
        .assert()
        .success()
        .stdout("[]\n");
}

#[test]
fn invalid_sources_fail() {
    apiscan()
        .args(["scan", "/definitely/not/a/real/dir"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a valid directory"));

    apiscan()
        .arg("scan")
        .arg(fixture_path("python_app"))
        .args(["--path-filter", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Path filter 'missing' does not exist"));
}

#[test]
fn auth_flags_are_mutually_exclusive() {
    apiscan()
        .arg("scan")
        .arg(fixture_path("java_app"))
        .args(["--auth", "--no-auth"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn project_config_sets_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("app.py"),
        "@app.get(\"/a\")\ndef a():\n    pass\n\n@app.put(\"/b\")\ndef b():\n    pass\n",
    )
    .unwrap();
    std::fs::write(
        tmp.path().join(".apiscan.toml"),
        "[defaults]\nformat = \"json\"\nquiet = true\n[filters]\nexclude_verbs = [\"put\"]\n",
    )
    .unwrap();

    let output = apiscan().arg("scan").arg(tmp.path()).output().unwrap();
    assert!(output.status.success());
    assert!(output.stderr.is_empty());
    let records: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(routes(records.as_array().unwrap()), vec![pair("GET", "/a")]);
}
