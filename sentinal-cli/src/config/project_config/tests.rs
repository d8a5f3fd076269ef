use super::*;
use tempfile::tempdir;

#[test]
fn test_defaults() {
    let config = ProjectConfig::default();
    assert_eq!(config.limits.max_files, 10);
    assert_eq!(config.limits.max_file_size, 1_000_000);
    assert!(config.report.enabled);
    assert!(config.report.backend.is_none());
    assert!(config.rules.custom.is_empty());
}

#[test]
fn test_parse_toml_sections() {
    let toml_str = r#"
[limits]
max_files = 3

[rules]
disabled = ["drop-column"]
severity = { DROP_TABLE = "high" }

[[rules.custom]]
kind = "sql"
category = "GRANT_ALL"
pattern = 'GRANT\s+ALL'
severity = "high"
description = "Grants everything"

[report]
enabled = false
backend = "openai"
cost_per_1m_input_tokens = 2.5

[defaults]
format = "json"
fail_on = "high"
workers = 2
"#;
    let config: ProjectConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.limits.max_files, 3);
    assert_eq!(config.limits.max_file_size, 1_000_000);
    assert_eq!(config.rules.disabled, vec!["drop-column".to_string()]);
    assert_eq!(config.rules.severity.get("DROP_TABLE").map(String::as_str), Some("high"));
    assert_eq!(config.rules.custom[0].pattern, r"GRANT\s+ALL");
    assert!(config.rules.custom[0].recommendation.is_none());
    assert!(!config.report.enabled);
    assert_eq!(config.report.backend.as_deref(), Some("openai"));
    assert_eq!(config.report.max_tokens, 2048);
    assert!((config.report.cost_per_1m_input_tokens - 2.5).abs() < f64::EPSILON);
    assert_eq!(config.defaults.format.as_deref(), Some("json"));
    assert_eq!(config.defaults.workers, Some(2));
}

#[test]
fn test_example_config_parses() {
    let config: ProjectConfig = toml::from_str(example_config()).unwrap();
    assert_eq!(config.limits.max_files, 10);
    assert_eq!(config.defaults.format.as_deref(), Some("text"));
}

#[test]
fn test_load_prefers_toml() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("sentinal.toml"), "[limits]\nmax_files = 4\n").unwrap();
    std::fs::write(
        dir.path().join(".sentinalrc.json"),
        r#"{"limits": {"max_files": 7}}"#,
    )
    .unwrap();
    assert_eq!(load_project_config(dir.path()).limits.max_files, 4);
}

#[test]
fn test_load_json() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join(".sentinalrc.json"),
        r#"{"limits": {"max_files": 7}, "report": {"enabled": false}}"#,
    )
    .unwrap();
    let config = load_project_config(dir.path());
    assert_eq!(config.limits.max_files, 7);
    assert!(!config.report.enabled);
}

#[test]
fn test_invalid_file_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("sentinal.toml"), "[limits\nmax_files = ").unwrap();
    let config = load_project_config(dir.path());
    assert_eq!(config.limits.max_files, 10);
}

#[test]
fn test_missing_dir_gives_defaults() {
    let dir = tempdir().unwrap();
    let config = load_project_config(&dir.path().join("nope"));
    assert_eq!(config.limits.max_file_size, 1_000_000);
}

#[test]
fn test_load_config_file_reports_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "limits = 5").unwrap();
    assert!(load_config_file(&path).is_err());
    assert!(load_config_file(&dir.path().join("absent.toml")).is_err());
}
