//! CLI tests for the `specimen` binary

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

use common::{schema_file, SHOP_SCHEMA};

fn specimen_cmd() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("specimen").unwrap();
    cmd.env_remove("SPECIMEN_SEED")
        .env_remove("SPECIMEN_LENIENT")
        .env_remove("RUST_LOG");
    cmd
}

fn documents(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[test]
fn test_generate_prints_one_document_per_value() {
    let schema = schema_file(SHOP_SCHEMA);
    let output = specimen_cmd()
        .args(["generate", "--type", "Order", "--count", "3", "--seed", "42"])
        .arg("--schema")
        .arg(schema.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let docs = documents(&output);
    assert_eq!(docs.len(), 3);
    for doc in &docs {
        assert!(doc["id"].is_string());
        assert!(doc["customer"]["address"]["city"].is_string());
        assert!(doc["lines"].is_array());
    }
}

#[test]
fn test_generate_is_reproducible_with_seed() {
    let schema = schema_file(SHOP_SCHEMA);
    let run = || {
        specimen_cmd()
            .args(["generate", "--type", "Order", "--seed", "7"])
            .arg("--schema")
            .arg(schema.path())
            .assert()
            .success()
            .get_output()
            .stdout
            .clone()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_seed_from_environment() {
    let schema = schema_file(SHOP_SCHEMA);
    let run = |cmd: &mut Command, extra: &[&str]| {
        cmd.args(["generate", "--type", "Customer"])
            .args(extra)
            .arg("--schema")
            .arg(schema.path())
            .assert()
            .success()
            .get_output()
            .stdout
            .clone()
    };
    let from_env = run(specimen_cmd().env("SPECIMEN_SEED", "99"), &[]);
    let from_flag = run(&mut specimen_cmd(), &["--seed", "99"]);
    assert_eq!(from_env, from_flag);
}

#[test]
fn test_set_ignore_and_nullable() {
    let schema = schema_file(SHOP_SCHEMA);
    let output = specimen_cmd()
        .args([
            "generate",
            "--type",
            "Order",
            "--seed",
            "3",
            "--set",
            "customer.name=\"Ada\"",
            "--set",
            "status=Paid",
            "--set",
            "placed=\"2024-01-31\"",
            "--ignore",
            "lines",
            "--nullable",
            "notes",
        ])
        .arg("--schema")
        .arg(schema.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let doc = &documents(&output)[0];
    assert_eq!(doc["customer"]["name"], "Ada");
    assert_eq!(doc["status"], "Paid");
    assert_eq!(doc["placed"], "2024-01-31");
    assert!(doc.get("lines").is_none());
}

#[test]
fn test_set_rejects_wrong_value() {
    let schema = schema_file(SHOP_SCHEMA);
    specimen_cmd()
        .args(["generate", "--type", "Order", "--set", "status=Lost"])
        .arg("--schema")
        .arg(schema.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("status"));
}

#[test]
fn test_set_rejects_unknown_path() {
    let schema = schema_file(SHOP_SCHEMA);
    specimen_cmd()
        .args(["generate", "--type", "Order", "--set", "customer.nope=1"])
        .arg("--schema")
        .arg(schema.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("customer.nope"));
}

#[test]
fn test_unused_path_fails_unless_lenient() {
    let schema = schema_file(SHOP_SCHEMA);
    specimen_cmd()
        .args(["generate", "--type", "Order", "--ignore", "nothing.here"])
        .arg("--schema")
        .arg(schema.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unused selector"));

    specimen_cmd()
        .args(["generate", "--type", "Order", "--ignore", "nothing.here", "--lenient"])
        .arg("--schema")
        .arg(schema.path())
        .assert()
        .success();

    specimen_cmd()
        .env("SPECIMEN_LENIENT", "1")
        .args(["generate", "--type", "Order", "--ignore", "nothing.here"])
        .arg("--schema")
        .arg(schema.path())
        .assert()
        .success();
}

#[test]
fn test_generic_root_needs_type_args() {
    let schema = schema_file(
        r#"{ "types": [ { "name": "Pair", "params": ["L", "R"],
            "fields": [ { "name": "left", "type": "L" }, { "name": "right", "type": "R" } ] } ] }"#,
    );
    specimen_cmd()
        .args(["generate", "--type", "Pair"])
        .arg("--schema")
        .arg(schema.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("type parameter"));

    let output = specimen_cmd()
        .args(["generate", "--type", "Pair", "--type-arg", "String", "--type-arg", "bool"])
        .arg("--schema")
        .arg(schema.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let doc = &documents(&output)[0];
    assert!(doc["left"].is_string());
    assert!(doc["right"].is_boolean());
}

#[test]
fn test_json_report() {
    let schema = schema_file(SHOP_SCHEMA);
    let output = specimen_cmd()
        .args(["--json", "generate", "--type", "Line", "--count", "2", "--seed", "5"])
        .arg("--schema")
        .arg(schema.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["type"], "Line");
    assert_eq!(report["seed"], 5);
    assert_eq!(report["values"].as_array().map(Vec::len), Some(2));
}

#[test]
fn test_inspect_prints_tree() {
    let schema = schema_file(
        r#"{ "types": [ { "name": "Node",
            "fields": [ { "name": "value", "type": "i32" }, { "name": "next", "type": "Node" } ] } ] }"#,
    );
    specimen_cmd()
        .args(["inspect", "--type", "Node"])
        .arg("--schema")
        .arg(schema.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("value: i32"))
        .stdout(predicate::str::contains("[cycle]"));
}

#[test]
fn test_inspect_json_with_depth() {
    let schema = schema_file(
        r#"{ "types": [ { "name": "Node",
            "fields": [ { "name": "value", "type": "i32" }, { "name": "next", "type": "Node" } ] } ] }"#,
    );
    let output = specimen_cmd()
        .args(["--json", "inspect", "--type", "Node", "--max-depth", "2"])
        .arg("--schema")
        .arg(schema.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let nodes: Vec<serde_json::Value> = serde_json::from_slice(&output).unwrap();
    let paths: Vec<&str> = nodes.iter().filter_map(|n| n["path"].as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "Node",
            "Node.value",
            "Node.next",
            "Node.next.value",
            "Node.next.next"
        ]
    );
    assert!(nodes.iter().all(|n| n["depth"].as_u64().unwrap() <= 2));
    assert_eq!(nodes[3]["terminal"], "depth");
}

#[test]
fn test_missing_schema_file() {
    specimen_cmd()
        .args(["generate", "--type", "Order", "--schema", "/nonexistent/schema.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read schema"));
}
