use assert_cmd::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn finfocus() -> Command {
    Command::cargo_bin("finfocus").unwrap()
}

fn empty_dirs() -> (tempfile::TempDir, tempfile::TempDir) {
    (tempdir().unwrap(), tempdir().unwrap())
}

#[test]
fn empty_input_exits_two_with_empty_bundle() {
    let (plugins, specs) = empty_dirs();
    let assert = finfocus()
        .arg("--input")
        .arg("/dev/null")
        .arg("--plugins-dir")
        .arg(plugins.path())
        .arg("--specs-dir")
        .arg(specs.path())
        .assert()
        .code(2);
    let output = assert.get_output();
    let doc: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(doc["bundle"]["results"].as_array().unwrap().is_empty());
}

#[test]
fn validation_failure_produces_placeholder_and_exit_one() {
    let (plugins, specs) = empty_dirs();
    let tmp = tempdir().unwrap();
    let input = tmp.path().join("plan.json");
    fs::write(
        &input,
        serde_json::to_vec(&json!([
            {"provider": "aws", "resource_type": "aws:ec2:Instance", "sku": "", "region": "us-east-1", "id": "r1"}
        ]))
        .unwrap(),
    )
    .unwrap();

    let assert = finfocus()
        .arg("--input")
        .arg(&input)
        .arg("--plugins-dir")
        .arg(plugins.path())
        .arg("--specs-dir")
        .arg(specs.path())
        .assert()
        .code(1);
    let doc: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    let results = doc["bundle"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0]["notes"].as_str().unwrap().starts_with("VALIDATION: "));
}

#[test]
fn falls_back_to_local_spec_when_no_plugins_installed() {
    let (plugins, specs) = empty_dirs();
    fs::write(
        specs.path().join("aws.yaml"),
        "resources:\n  aws:ec2:Instance:\n    us-east-1:\n      t3.micro: { monthly: 7.50, currency: USD }\n",
    )
    .unwrap();

    let tmp = tempdir().unwrap();
    let input = tmp.path().join("plan.json");
    fs::write(
        &input,
        serde_json::to_vec(&json!([
            {"provider": "aws", "resource_type": "aws:ec2:Instance", "sku": "t3.micro", "region": "us-east-1", "id": "r1"}
        ]))
        .unwrap(),
    )
    .unwrap();

    let assert = finfocus()
        .arg("--input")
        .arg(&input)
        .arg("--plugins-dir")
        .arg(plugins.path())
        .arg("--specs-dir")
        .arg(specs.path())
        .assert()
        .code(0);
    let doc: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    let results = doc["bundle"]["results"].as_array().unwrap();
    assert_eq!(results[0]["adapter"], "spec");
    assert_eq!(results[0]["monthly"], "7.50");
}

#[test]
fn no_candidate_matches_yields_none_adapter_and_partial_exit() {
    let (plugins, specs) = empty_dirs();
    let tmp = tempdir().unwrap();
    let input = tmp.path().join("plan.json");
    fs::write(
        &input,
        serde_json::to_vec(&json!([
            {"provider": "gcp", "resource_type": "gcp:compute:Instance", "sku": "n1", "region": "us-central1", "id": "r1"}
        ]))
        .unwrap(),
    )
    .unwrap();

    let assert = finfocus()
        .arg("--input")
        .arg(&input)
        .arg("--plugins-dir")
        .arg(plugins.path())
        .arg("--specs-dir")
        .arg(specs.path())
        .assert()
        .code(1);
    let doc: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(doc["bundle"]["results"][0]["adapter"], "none");
}

#[test]
fn invalid_group_by_dimension_errors() {
    let (plugins, specs) = empty_dirs();
    let tmp = tempdir().unwrap();
    let input = tmp.path().join("plan.json");
    fs::write(
        &input,
        serde_json::to_vec(&json!([
            {"provider": "aws", "resource_type": "aws:ec2:Instance", "sku": "t3.micro", "region": "us-east-1", "id": "r1"}
        ]))
        .unwrap(),
    )
    .unwrap();

    finfocus()
        .arg("--input")
        .arg(&input)
        .arg("--plugins-dir")
        .arg(plugins.path())
        .arg("--specs-dir")
        .arg(specs.path())
        .arg("--group-by")
        .arg("bogus")
        .assert()
        .failure()
        .code(3);
}

#[test]
fn actual_mode_requires_start_and_end() {
    let (plugins, specs) = empty_dirs();
    let tmp = tempdir().unwrap();
    let input = tmp.path().join("plan.json");
    fs::write(
        &input,
        serde_json::to_vec(&json!([
            {"provider": "aws", "resource_type": "aws:ec2:Instance", "sku": "t3.micro", "region": "us-east-1", "id": "r1"}
        ]))
        .unwrap(),
    )
    .unwrap();

    finfocus()
        .arg("--input")
        .arg(&input)
        .arg("--plugins-dir")
        .arg(plugins.path())
        .arg("--specs-dir")
        .arg(specs.path())
        .arg("--mode")
        .arg("actual")
        .assert()
        .failure()
        .code(3)
        .stderr(predicates::str::contains("requires --start"));
}
