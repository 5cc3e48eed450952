//! Smoke tests for the `memory-cli` binary surface: each subcommand is
//! invoked the way an operator would, against the in-process storage
//! adapter a fresh process starts with (§4.1, §4.6, §4.7, §4.8, §3).

use assert_cmd::Command;
use predicates::prelude::*;

fn cli() -> Command {
    Command::cargo_bin("memory-cli").expect("binary should build")
}

#[test]
fn ingest_extracts_via_ad_hoc_rule() {
    cli()
        .args([
            "ingest",
            "--user-id",
            "u1",
            "--agent-id",
            "a1",
            "--rule",
            "I prefer (.+)=>semantic:0.8",
            "--message",
            "I prefer dark mode",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Extracted 1 memories"))
        .stdout(predicate::str::contains("dark mode"));
}

#[test]
fn ingest_dry_run_skips_processing() {
    cli()
        .args(["ingest", "--user-id", "u1", "--agent-id", "a1", "--message", "hello", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dry run"));
}

#[test]
fn ingest_rejects_empty_user_id() {
    // clap itself doesn't enforce non-empty strings; the pipeline's
    // InvalidArgument check (§4.1) should surface as a failing exit code.
    cli()
        .args(["ingest", "--user-id", "", "--agent-id", "a1", "--message", "hello"])
        .assert()
        .failure();
}

#[test]
fn decay_reports_zero_memories_for_unknown_agent() {
    cli()
        .args(["decay", "--user-id", "ghost", "--agent-id", "ghost"])
        .assert()
        .success()
        .stdout(predicate::str::contains("processed"));
}

#[test]
fn lifecycle_run_reports_stage_counts() {
    cli()
        .args(["lifecycle", "run", "--user-id", "u1", "--agent-id", "a1"])
        .assert()
        .success();
}

#[test]
fn rules_list_is_empty_for_fresh_agent() {
    cli()
        .args(["rules", "list", "--user-id", "u1", "--agent-id", "a1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Extraction rules (0)"))
        .stdout(predicate::str::contains("Decay rules (0)"));
}

#[test]
fn rules_add_extraction_rejects_invalid_regex() {
    cli()
        .args([
            "rules",
            "add-extraction",
            "--user-id",
            "u1",
            "--agent-id",
            "a1",
            "--pattern",
            "(unterminated",
            "--type",
            "semantic",
            "--importance",
            "0.5",
        ])
        .assert()
        .failure();
}

#[test]
fn rules_add_extraction_accepts_valid_rule() {
    cli()
        .args([
            "rules",
            "add-extraction",
            "--user-id",
            "u1",
            "--agent-id",
            "a1",
            "--pattern",
            "I like (.+)",
            "--type",
            "semantic",
            "--importance",
            "0.5",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("extraction rule added"));
}

#[test]
fn graph_clusters_reports_connected_components() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    use std::io::Write as _;
    write!(
        file,
        r#"[
            {{"source_id": "a", "target_id": "b", "type": "related", "strength": 0.9}},
            {{"source_id": "b", "target_id": "c", "type": "related", "strength": 0.7}}
        ]"#
    )
    .expect("write connections");

    cli()
        .args([
            "graph",
            "clusters",
            "--user-id",
            "u1",
            "--agent-id",
            "a1",
            "--connections-file",
        ])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("size=3"));
}

#[test]
fn config_check_reports_validity() {
    cli()
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("configuration valid: true"));
}

#[test]
fn config_show_reports_resolved_settings() {
    cli()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("batch.max_batch_size"));
}

#[test]
fn json_output_format_is_valid_json() {
    let output = cli()
        .args(["--format", "json", "config", "show"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let parsed: serde_json::Value = serde_json::from_slice(&output).expect("stdout should be valid JSON");
    assert!(parsed.get("max_batch_size").is_some());
}
