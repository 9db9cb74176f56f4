use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn lens_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_lens"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = r#"[model]
provider = "disabled"

[retrieval]
top_k = 3

[server]
bind = "127.0.0.1:7349"
"#;

    let config_path = config_dir.join("lens.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn with_catalog(tmp: &TempDir, config_path: &Path) {
    let catalog_path = tmp.path().join("config").join("documents.toml");
    fs::write(
        &catalog_path,
        r#"[[documents]]
title = "Deploy Runbook"
content = "Deploys happen on Tuesday. Rollbacks need approval from the release manager."

[[documents]]
title = "Team Directory"
content = "The release manager is Priya Nair. The on-call lead is Tomas Berg."
"#,
    )
    .unwrap();

    let mut config = fs::read_to_string(config_path).unwrap();
    config.push_str(&format!("\n[catalog]\npath = \"{}\"\n", catalog_path.display()));
    fs::write(config_path, config).unwrap();
}

fn run_lens(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = lens_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run lens binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_scenarios_lists_all_four() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_lens(&config_path, &["scenarios"]);
    assert!(success, "scenarios failed: stderr={}", stderr);
    for id in ["normal", "data", "search", "document"] {
        assert!(stdout.contains(id), "missing scenario {}: {}", id, stdout);
    }
    assert!(stdout.contains("Document Library (RAG)"));
}

#[test]
fn test_documents_builtin_catalog() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_lens(&config_path, &["documents"]);
    assert!(success);
    assert!(stdout.contains("Project Nova: Executive Summary"));
    assert!(stdout.contains("Annual Company Offsite Logistics"));
}

#[test]
fn test_retrieve_ranks_budget_sentence_first() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_lens(
        &config_path,
        &["retrieve", "What is the budget for Project Nova?", "--json"],
    );
    assert!(success, "retrieve failed: stderr={}", stderr);

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["query"], "budget project nova");
    let results = json["results"].as_array().unwrap();
    assert!(!results.is_empty());
    assert!(results.len() <= 3, "top_k from config not applied");
    assert!(results[0]["text"].as_str().unwrap().contains("$4 million"));
    assert_eq!(results[0]["sourceTitle"], "Project Nova: Executive Summary");

    let totals: Vec<u64> = results
        .iter()
        .map(|r| r["score"]["total"].as_u64().unwrap())
        .collect();
    assert!(totals.windows(2).all(|w| w[0] >= w[1]));
    assert!(totals.iter().all(|t| *t > 0));
}

#[test]
fn test_retrieve_text_output() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_lens(&config_path, &["retrieve", "Who is the lead engineer?"]);
    assert!(success);
    assert!(stdout.contains("query: lead engineer"));
    assert!(stdout.contains("Evelyn Reed"));
    assert!(stdout.contains("Score: "));
}

#[test]
fn test_retrieve_no_matches() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_lens(&config_path, &["retrieve", "zebra xylophone"]);
    assert!(success);
    assert!(stdout.contains("No relevant document chunks found."));
}

#[test]
fn test_retrieve_custom_catalog() {
    let (tmp, config_path) = setup_test_env();
    with_catalog(&tmp, &config_path);

    let (stdout, stderr, success) = run_lens(
        &config_path,
        &["retrieve", "Who is the release manager?", "--json"],
    );
    assert!(success, "retrieve failed: stderr={}", stderr);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let results = json["results"].as_array().unwrap();
    assert!(results
        .iter()
        .any(|r| r["text"].as_str().unwrap().contains("Priya Nair")));
    assert!(!stdout.contains("Project Nova"));
}

#[test]
fn test_ask_with_disabled_model_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_lens(&config_path, &["ask", "--scenario", "normal", "hello"]);
    assert!(!success);
    assert!(
        stderr.contains("model provider is disabled"),
        "unexpected stderr: {}",
        stderr
    );
}

#[test]
fn test_ask_unknown_scenario_rejected() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_lens(&config_path, &["ask", "--scenario", "poetry", "hi"]);
    assert!(!success);
    assert!(stderr.contains("poetry"), "unexpected stderr: {}", stderr);
}

#[test]
fn test_invalid_config_rejected() {
    let (_tmp, config_path) = setup_test_env();
    fs::write(&config_path, "[retrieval]\ntop_k = 0\n").unwrap();

    let (_, stderr, success) = run_lens(&config_path, &["documents"]);
    assert!(!success);
    assert!(stderr.contains("top_k"));
}

#[test]
fn test_chat_keeps_message_on_failure() {
    let (_tmp, config_path) = setup_test_env();

    let mut child = Command::new(lens_binary())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(["chat", "--scenario", "normal"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"hello there\n/history\n/new\n/context\n/quit\n")
        .unwrap();

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("Sorry, I encountered an error. Please try again."));
    // newest first
    let model_line = stdout.find("#1 [model]").unwrap();
    let user_line = stdout.find("#0 [you] hello there").unwrap();
    assert!(model_line < user_line);
    assert!(stdout.contains("2 messages archived"));
    assert!(stdout.contains("No context yet."));
}
