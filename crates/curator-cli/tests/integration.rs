#![allow(deprecated)]
use assert_cmd::Command;
use chrono::{TimeZone, Utc};
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

use curator_core::store::{CheckpointStore, DedupLedger, StateDb};
use curator_core::types::{ActionRecord, ContentRef};

const GOOD: &str = r#"
account: curator-bot
nodes: ["http://127.0.0.1:9"]
credentials:
  access_token: token
rules:
  - author: alice
    delay_minutes: 30
    weight: 100
    disqualifying_tags: [nsfw]
  - author: bob
    vote_delay: 5
    weight: 12.5
"#;

fn curator(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("curator").unwrap();
    cmd.current_dir(dir.path())
        .env("CURATOR_STATE_DIR", dir.path().join("state"))
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, body).unwrap();
    path
}

fn seed_state(dir: &TempDir) {
    let db = StateDb::open(&dir.path().join("state").join("state.redb")).unwrap();
    db.save_checkpoint(42).unwrap();
    for (id, hour) in [("first", 9), ("second", 10)] {
        let at = Utc.with_ymd_and_hms(2026, 10, 17, hour, 0, 0).unwrap();
        db.record(&ActionRecord::new(&ContentRef::new("alice", id), at))
            .unwrap();
    }
}

// ---------------------------------------------------------------------------
// curator config validate
// ---------------------------------------------------------------------------

#[test]
fn validate_accepts_good_config() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, GOOD);
    curator(&dir)
        .args(["config", "validate"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid: 2 rule(s)"));
}

#[test]
fn validate_json_lists_warnings() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "account: bot\n");
    let output = curator(&dir)
        .args(["config", "validate", "--json"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["account"], "bot");
    assert_eq!(value["nodes"][0], "https://api.steemit.com");
    let warnings = value["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().all(|w| w["level"] == "warning"));
}

#[test]
fn validate_rejects_duplicate_authors() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "account: bot\nrules:\n  - {author: alice, weight: 10}\n  - {author: alice, weight: 20}\n",
    );
    curator(&dir)
        .args(["config", "validate"])
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("duplicate rule for author 'alice'"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn validate_rejects_out_of_range_weight() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "account: bot\nrules:\n  - {author: alice, weight: 101}\n");
    curator(&dir)
        .args(["config", "validate"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn missing_config_fails() {
    let dir = TempDir::new().unwrap();
    curator(&dir)
        .args(["config", "validate", "nope.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

// ---------------------------------------------------------------------------
// curator status / history
// ---------------------------------------------------------------------------

#[test]
fn status_on_fresh_state_dir() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, GOOD);
    curator(&dir)
        .arg("status")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("checkpoint").and(predicate::str::contains("none")));
    assert!(dir.path().join("state/state.redb").exists());
}

#[test]
fn status_json_reports_seeded_state() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, GOOD);
    seed_state(&dir);

    let output = curator(&dir)
        .args(["status", "--json"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["checkpoint"], 42);
    assert_eq!(value["records"], 2);
    assert_eq!(value["rules"], 2);
}

#[test]
fn history_lists_newest_first() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, GOOD);
    seed_state(&dir);

    let output = curator(&dir).arg("history").arg(&path).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let second = stdout.find("@alice/second").unwrap();
    let first = stdout.find("@alice/first").unwrap();
    assert!(second < first);

    curator(&dir)
        .args(["history", "--limit", "1", "--json"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("second").and(predicate::str::contains("first").not()));
}

#[test]
fn history_on_empty_store() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, GOOD);
    curator(&dir)
        .arg("history")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("No votes recorded."));
}

#[test]
fn state_dir_flag_overrides_env() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, GOOD);
    let other = dir.path().join("elsewhere");
    curator(&dir)
        .arg("--state-dir")
        .arg(&other)
        .arg("status")
        .arg(&path)
        .assert()
        .success();
    assert!(other.join("state.redb").exists());
    assert!(!dir.path().join("state/state.redb").exists());
}

// ---------------------------------------------------------------------------
// curator run
// ---------------------------------------------------------------------------

#[test]
fn run_with_invalid_config_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "account: ''\n");
    curator(&dir)
        .arg("run")
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("account must not be empty"));
}

#[test]
fn run_without_reachable_node_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, GOOD);
    curator(&dir)
        .arg("run")
        .arg(&path)
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no reachable ledger node"));
}
