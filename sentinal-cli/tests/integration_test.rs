//! Integration tests for the sentinal library and CLI
//!
//! Library tests go through ingestion and the pipeline the way the CLI
//! does. Binary tests run the built `sentinal` executable against
//! artifacts written to an isolated temp directory, with no config file
//! and no report backend in reach.

use sentinal::config::LimitsConfig;
use sentinal::detectors::RuleCatalog;
use sentinal::ingest::load_artifacts;
use sentinal::models::{Artifact, ArtifactKind, DependencyKind, ReportSource, RiskLevel, Severity};
use sentinal::pipeline::Pipeline;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;

/// Temp directory holding the given (name, content) files
fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).expect("Failed to write artifact");
    }
    dir
}

fn pipeline() -> Pipeline {
    Pipeline::new(Arc::new(RuleCatalog::builtin().expect("builtin catalog"))).with_workers(2)
}

/// Run the binary inside `dir` and return (stdout, stderr, exit_code)
fn run_sentinal(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_sentinal"))
        .args(args)
        .current_dir(dir)
        .env_remove("SENTINAL_CONFIG")
        .env_remove("SENTINAL_MAX_FILES")
        .env_remove("SENTINAL_MAX_FILE_SIZE")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute sentinal binary");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

// ============================================================================
// Library
// ============================================================================

#[test]
fn test_unfiltered_delete_found_by_rules_and_parser() {
    let run = pipeline().run(vec![Artifact::new("d.sql", ArtifactKind::Sql, "DELETE FROM users;")]);
    let high: Vec<&str> = run
        .findings()
        .iter()
        .filter(|f| f.severity == Severity::High)
        .map(|f| f.category.as_str())
        .collect();
    assert!(high.contains(&"UNFILTERED_DELETE"));
    assert!(high.contains(&"UNFILTERED_DML"));
}

#[test]
fn test_filtered_select_is_clean() {
    let run = pipeline().run(vec![Artifact::new(
        "q.sql",
        ArtifactKind::Sql,
        "SELECT * FROM users WHERE id=1;",
    )]);
    assert!(run.findings().is_empty());
    assert_eq!(run.score(), 0);
    assert_eq!(run.classification(), RiskLevel::Low);
    assert!(!run.nothing_analyzed());
}

#[test]
fn test_directory_batch_drop_conflict() {
    let dir = workspace(&[
        ("a.sql", "DROP TABLE users;\n"),
        ("b.sql", "SELECT * FROM users;\n"),
    ]);
    let artifacts = load_artifacts(&[dir.path().to_path_buf()], &LimitsConfig::default()).unwrap();
    assert_eq!(artifacts.len(), 2);

    let run = pipeline().run(artifacts);
    let conflicts: Vec<_> = run
        .dependencies()
        .iter()
        .filter(|d| d.kind == DependencyKind::DropConflict)
        .collect();
    assert_eq!(conflicts.len(), 1);
    assert!(conflicts[0].source.ends_with("b.sql"));
    assert!(conflicts[0].target.ends_with("a.sql"));
    assert_eq!(conflicts[0].severity, Severity::Critical);
    assert_eq!(run.score(), 80);
    assert_eq!(run.classification(), RiskLevel::Critical);
}

#[test]
fn test_mixed_terraform_and_yaml() {
    let tf = "resource \"aws_s3_bucket\" \"logs\" {\n  bucket        = \"logs\"\n  force_destroy = true\n}\n";
    let yaml = "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\nspec:\n  replicas: 0\n";
    let run = pipeline().run(vec![
        Artifact::new("main.tf", ArtifactKind::Terraform, tf),
        Artifact::new("deploy.yaml", ArtifactKind::Yaml, yaml),
    ]);

    let categories: Vec<&str> = run.findings().iter().map(|f| f.category.as_str()).collect();
    assert_eq!(
        categories,
        vec!["FORCE_DESTROY", "MISSING_LIFECYCLE", "ZERO_REPLICAS", "MISSING_RESOURCE_LIMITS"]
    );
    assert_eq!(run.score(), 80);
    assert!(run.dependencies().is_empty());
    assert_eq!(run.suggested_order().map(|p| p.order.len()), Some(2));
}

#[test]
fn test_directory_without_artifacts() {
    let dir = workspace(&[("README.md", "# notes\n")]);
    let artifacts = load_artifacts(&[dir.path().to_path_buf()], &LimitsConfig::default()).unwrap();
    let run = pipeline().run(artifacts);
    assert!(run.nothing_analyzed());
    assert_eq!(run.classification(), RiskLevel::Low);
    assert_eq!(run.report_source(), ReportSource::Fallback);
}

#[test]
fn test_finding_ids_stable_across_runs() {
    let batch = || vec![Artifact::new("m.sql", ArtifactKind::Sql, "DROP TABLE a;\nTRUNCATE TABLE b;")];
    let first: Vec<String> = pipeline().run(batch()).findings().iter().map(|f| f.id.clone()).collect();
    let second: Vec<String> = pipeline().run(batch()).findings().iter().map(|f| f.id.clone()).collect();
    assert_eq!(first, second);
    assert!(first.iter().all(|id| id.len() == 16));
}

// ============================================================================
// Binary
// ============================================================================

#[test]
fn test_cli_json_output() {
    let dir = workspace(&[("drop.sql", "DROP TABLE users;\n")]);
    let (stdout, stderr, code) = run_sentinal(dir.path(), &["analyze", "drop.sql", "--format", "json"]);
    assert_eq!(code, 0, "stderr: {}", stderr);

    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON on stdout");
    assert_eq!(parsed["score"], 40);
    assert_eq!(parsed["classification"], "HIGH");
    assert_eq!(parsed["findings"][0]["category"], "DROP_TABLE");
    assert_eq!(parsed["findings"][0]["line"], 1);
    assert_eq!(parsed["report_source"], "fallback");
}

#[test]
fn test_cli_fail_on_threshold() {
    let dir = workspace(&[("drop.sql", "DROP TABLE users;\n")]);
    let (stdout, stderr, code) = run_sentinal(dir.path(), &["analyze", "drop.sql", "--fail-on", "critical"]);
    assert_eq!(code, 1);
    assert!(stdout.contains("DROP_TABLE"));
    assert!(stderr.contains("--fail-on=critical"));
}

#[test]
fn test_cli_clean_file_passes_gate() {
    let dir = workspace(&[("q.sql", "SELECT * FROM users WHERE id = 1;\n")]);
    let (_, stderr, code) = run_sentinal(
        dir.path(),
        &["analyze", "q.sql", "--fail-on", "low", "--no-report"],
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
}

#[test]
fn test_cli_markdown_to_file() {
    let dir = workspace(&[("drop.sql", "DROP TABLE users;\n")]);
    let (_, stderr, code) = run_sentinal(
        dir.path(),
        &["analyze", "drop.sql", "--format", "md", "--output", "report.md"],
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    let md = std::fs::read_to_string(dir.path().join("report.md")).unwrap();
    assert!(md.contains("Deployment Risk Report"));
    assert!(md.contains("# Defense Memo: drop.sql"));
}

#[test]
fn test_cli_max_files_limit() {
    let dir = workspace(&[("a.sql", "SELECT 1;"), ("b.sql", "SELECT 2;")]);
    let (_, stderr, code) = run_sentinal(dir.path(), &["analyze", ".", "--max-files", "1"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Too many files"), "stderr: {}", stderr);
}

#[test]
fn test_cli_order_violation() {
    let dir = workspace(&[
        ("query.sql", "SELECT * FROM users;\n"),
        ("create.sql", "CREATE TABLE users (id INT);\n"),
    ]);
    let (stdout, _, code) = run_sentinal(
        dir.path(),
        &["order", "query.sql", "create.sql", "--format", "json"],
    );
    assert_eq!(code, 1);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(parsed["violations"][0]["kind"], "EXECUTION_ORDER_VIOLATION");
    assert_eq!(parsed["suggested_order"]["order"][0], "create.sql");
}

#[test]
fn test_cli_analyze_validates_given_order() {
    let dir = workspace(&[
        ("query.sql", "SELECT * FROM users;\n"),
        ("create.sql", "CREATE TABLE users (id INT);\n"),
    ]);
    let args = ["analyze", "query.sql", "create.sql", "--format", "json"];

    let (stdout, _, code) = run_sentinal(dir.path(), &args);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    let kinds: Vec<&str> = parsed["dependencies"]
        .as_array()
        .expect("dependencies array")
        .iter()
        .filter_map(|d| d["kind"].as_str())
        .collect();
    assert!(!kinds.contains(&"EXECUTION_ORDER_VIOLATION"));

    let mut validated = args.to_vec();
    validated.push("--validate-order");
    let (stdout, _, code) = run_sentinal(dir.path(), &validated);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    let violation = parsed["dependencies"]
        .as_array()
        .expect("dependencies array")
        .iter()
        .find(|d| d["kind"] == "EXECUTION_ORDER_VIOLATION")
        .expect("order violation recorded");
    assert_eq!(violation["source"], "query.sql");
    assert_eq!(violation["target"], "create.sql");
    assert!(parsed["findings"]
        .as_array()
        .expect("findings array")
        .iter()
        .any(|f| f["category"] == "EXECUTION_ORDER_VIOLATION"));
    assert_eq!(parsed["suggested_order"]["order"][0], "create.sql");
    assert_eq!(parsed["entities"][1]["entities"]["tables_created"][0], "users");
}

#[test]
fn test_cli_rules_listing() {
    let dir = workspace(&[]);
    let (stdout, _, code) = run_sentinal(dir.path(), &["rules", "--kind", "sql"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("SQL (12 rules)"));
    assert!(stdout.contains("DROP_TABLE"));
    assert!(!stdout.contains("FORCE_DESTROY"));
}

#[test]
fn test_cli_config_disables_rule() {
    let dir = workspace(&[
        ("sentinal.toml", "[rules]\ndisabled = [\"drop-table\"]\n"),
        ("drop.sql", "DROP TABLE users;\n"),
    ]);
    let (stdout, _, code) = run_sentinal(dir.path(), &["analyze", "drop.sql", "--format", "json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["findings"].as_array().unwrap().len(), 0);
}

#[test]
fn test_cli_init_writes_config() {
    let dir = workspace(&[]);
    let (_, _, code) = run_sentinal(dir.path(), &["init"]);
    assert_eq!(code, 0);
    let path: PathBuf = dir.path().join("sentinal.toml");
    let written = std::fs::read_to_string(path).unwrap();
    assert!(written.contains("[limits]"));
}
