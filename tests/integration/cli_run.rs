#![allow(missing_docs)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let config = dir.path().join("cli.toml");
        fs::write(&config, "").expect("write config");
        Self { dir, config }
    }

    fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("write file");
        path
    }

    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("triq");
        cmd.env_remove("TRIQ_LOG")
            .env_remove("TRIQ_CONFIG")
            .arg("--config")
            .arg(&self.config);
        cmd
    }
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("utf8 stdout")
}

#[test]
fn missing_script_argument_is_a_usage_failure() {
    let ws = Workspace::new();
    ws.cmd().arg("run").assert().failure().code(2);
}

#[test]
fn malformed_channel_size_is_a_usage_failure() {
    let ws = Workspace::new();
    let script = ws.file("script.bql", "INSERT (a, b, c)\n");
    for bad in [
        "--channel_size=-1",
        "--channel_size=abc",
        "--channel_size=1.5",
        "--channel_size=4611686018427387904",
    ] {
        let output = ws
            .cmd()
            .args(["run", bad])
            .arg(&script)
            .assert()
            .failure()
            .code(2)
            .get_output()
            .clone();
        assert!(
            !stdout_of(&output).contains("Processing"),
            "{bad} must not run any statement"
        );
    }
}

#[test]
fn unreadable_script_is_fatal() {
    let ws = Workspace::new();
    let missing = ws.dir.path().join("missing.bql");
    let output = ws
        .cmd()
        .arg("run")
        .arg(&missing)
        .assert()
        .failure()
        .code(1)
        .get_output()
        .clone();
    assert!(stdout_of(&output).is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read script"), "{stderr}");
}

#[test]
fn failed_statements_still_exit_successfully() {
    let ws = Workspace::new();
    let script = ws.file(
        "script.bql",
        "# comment\n\nBADSTATEMENT\nSELECT x WHERE (x)\n",
    );
    let output = ws
        .cmd()
        .args(["--theme", "plain", "--quiet", "run", "--channel_size=0"])
        .arg(&script)
        .assert()
        .success()
        .get_output()
        .clone();
    let stdout = stdout_of(&output);
    assert!(stdout.starts_with(&format!("Processing file {}\n\n", script.display())));
    assert!(stdout.contains("Processing statement (1/2):\nBADSTATEMENT\n\n[FAIL] compile: "));
    assert!(stdout.contains("Processing statement (2/2):\nSELECT x WHERE (x)\n\n[FAIL] compile: "));
    assert!(!stdout.contains("# comment"));
    assert_eq!(stdout.matches("Processing statement").count(), 2);
}

#[test]
fn results_render_only_when_rows_exist() {
    let ws = Workspace::new();
    let script = ws.file(
        "script.bql",
        "SELECT ?o WHERE (a, b, ?o)\nINSERT (a, b, c)\nSELECT ?o WHERE (a, b, ?o)\n",
    );
    let output = ws
        .cmd()
        .args(["--theme", "plain", "--quiet", "run", "--channel-size", "1"])
        .arg(&script)
        .assert()
        .success()
        .get_output()
        .clone();
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Processing statement (1/3):\nSELECT ?o WHERE (a, b, ?o)\n\nResult:\nOK\n"));
    assert!(stdout.contains("Processing statement (2/3):\nINSERT (a, b, c)\n\nResult:\nOK\n"));
    assert!(stdout.contains(
        "Processing statement (3/3):\nSELECT ?o WHERE (a, b, ?o)\n\nResult:\n+----+\n| ?o |\n+----+\n| c  |\n+----+\nOK\n"
    ));
}

#[test]
fn json_format_reports_each_statement_and_a_summary() {
    let ws = Workspace::new();
    let script = ws.file("script.bql", "INSERT (a, b, c)\nDELETE (?x, b, c)\n");
    let output = ws
        .cmd()
        .args(["--format", "json", "run"])
        .arg(&script)
        .assert()
        .success()
        .get_output()
        .clone();
    let lines: Vec<Value> = stdout_of(&output)
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["status"], "succeeded");
    assert_eq!(lines[1]["status"], "failed");
    assert_eq!(lines[1]["failure"]["stage"], "compile");
    assert_eq!(lines[2]["kind"], "summary");
    assert_eq!(lines[2]["succeeded"], 1);
    assert_eq!(lines[2]["failed"], 1);
}

#[test]
fn seed_and_read_only_shape_the_store() {
    let ws = Workspace::new();
    let seed = ws.file("seed.triples", "# people\n(alice, knows, bob)\n");
    let script = ws.file(
        "script.bql",
        "SELECT ?who WHERE (alice, knows, ?who)\nINSERT (bob, knows, alice)\n",
    );
    let output = ws
        .cmd()
        .args(["--theme", "plain", "--quiet", "run", "--read-only", "--seed"])
        .arg(&seed)
        .arg(&script)
        .assert()
        .success()
        .get_output()
        .clone();
    let stdout = stdout_of(&output);
    assert!(stdout.contains("| bob  |"), "{stdout}");
    assert!(stdout.contains("[FAIL] plan: "), "{stdout}");
}

#[test]
fn broken_seed_file_is_fatal() {
    let ws = Workspace::new();
    let seed = ws.file("seed.triples", "(alice, knows)\n");
    let script = ws.file("script.bql", "INSERT (a, b, c)\n");
    ws.cmd()
        .args(["run", "--seed"])
        .arg(&seed)
        .arg(&script)
        .assert()
        .failure()
        .code(1);
}

#[test]
fn config_supplies_defaults_and_bad_values_are_usage_errors() {
    let ws = Workspace::new();
    let script = ws.file("script.bql", "INSERT (a, b, c)\n");
    fs::write(&ws.config, "[run]\nformat = \"json\"\n").expect("write config");
    let output = ws
        .cmd()
        .arg("run")
        .arg(&script)
        .assert()
        .success()
        .get_output()
        .clone();
    let first = stdout_of(&output);
    let first = first.lines().next().expect("one line");
    let json: Value = serde_json::from_str(first).expect("json");
    assert_eq!(json["kind"], "statement");

    for bad in ["[run]\ntheme = \"neon\"\n", "[run]\nchannel_size = 4611686018427387904\n"] {
        fs::write(&ws.config, bad).expect("write config");
        ws.cmd().arg("run").arg(&script).assert().failure().code(2);
    }
}
