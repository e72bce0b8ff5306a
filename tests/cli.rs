//! Binary-level tests for commands that need no model.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn search_agent() -> Command {
    let mut cmd = Command::cargo_bin("search-agent").unwrap_or_else(|e| unreachable!("{e}"));
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("SEARCH_AGENT_API_KEY")
        .env_remove("SEARCH_AGENT_FEATURES")
        .env_remove("RUST_LOG")
        .env_remove("SEARCH_AGENT_LOG")
        .arg("--no-color");
    cmd
}

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap_or_else(|e| unreachable!("{e}"));
    path
}

#[test]
fn test_plan_order_prints_waves() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let plan = write(
        &dir,
        "plan.json",
        r#"{"query_graph": [
            {"id": 4, "question": "root", "sub_queries": [2, 3]},
            {"id": 1, "question": "leaf", "sub_queries": []},
            {"id": 2, "question": "left", "sub_queries": [1]},
            {"id": 3, "question": "right", "sub_queries": [1]}
        ]}"#,
    );

    search_agent()
        .args(["plan", "order"])
        .arg(&plan)
        .assert()
        .success()
        .stdout("Root: 4\nWave 1: 1\nWave 2: 2, 3\nWave 3: 4\nOrder: 1, 2, 3, 4\n");
}

#[test]
fn test_plan_order_json() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let plan = write(
        &dir,
        "plan.json",
        r#"{"query_graph": [{"id": 1, "question": "only", "sub_queries": []}]}"#,
    );

    search_agent()
        .args(["--format", "json", "plan", "order"])
        .arg(&plan)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"root\": 1"));
}

#[test]
fn test_plan_order_cycle_fails() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let plan = write(
        &dir,
        "plan.json",
        r#"{"query_graph": [
            {"id": 1, "question": "A", "sub_queries": [2]},
            {"id": 2, "question": "B", "sub_queries": [1]},
            {"id": 3, "question": "root", "sub_queries": [1]}
        ]}"#,
    );

    search_agent()
        .args(["plan", "order"])
        .arg(&plan)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "circular dependencies exist among these queries: {1:{2}, 2:{1}}",
        ));
}

#[test]
fn test_plan_order_two_roots_fails() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let plan = write(
        &dir,
        "plan.json",
        r#"{"query_graph": [
            {"id": 1, "question": "A", "sub_queries": []},
            {"id": 2, "question": "B", "sub_queries": []}
        ]}"#,
    );

    search_agent()
        .args(["plan", "order"])
        .arg(&plan)
        .assert()
        .failure()
        .stderr(predicate::str::contains("[1, 2]"));
}

#[test]
fn test_init_prompts_writes_templates() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let target = dir.path().join("prompts");

    search_agent()
        .arg("init-prompts")
        .arg("--dir")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 4 prompt template(s)"));
    for file in ["role.md", "planner.md", "parameters.md", "excerpt.md"] {
        assert!(target.join(file).exists(), "{file} missing");
    }

    search_agent()
        .arg("init-prompts")
        .arg("--dir")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("already exist"));
}

#[test]
fn test_ask_without_api_key_fails() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let corpus = write(&dir, "corpus.json", "[]");

    search_agent()
        .args(["ask", "Who teaches CS101?", "--corpus"])
        .arg(&corpus)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no API key configured"));
}

#[test]
fn test_ask_rejects_out_of_range_top_k() {
    search_agent()
        .args(["ask", "q", "--corpus", "corpus.json", "-k", "0"])
        .assert()
        .failure();
}
