//! Project-level configuration support
//!
//! Loads configuration from `sentinal.toml` or `.sentinalrc.json` in the
//! working directory, or from an explicit `--config` path.
//!
//! # Configuration Format
//!
//! ```toml
//! # sentinal.toml
//!
//! [limits]
//! max_files = 10
//! max_file_size = 1000000
//!
//! [rules]
//! disabled = ["COMMENTED_ROLLBACK"]
//! severity = { DROP_COLUMN = "critical" }
//!
//! [[rules.custom]]
//! kind = "sql"
//! category = "GRANT_ALL"
//! pattern = 'GRANT\s+ALL'
//! severity = "high"
//! description = "Grants every privilege on an object"
//!
//! [report]
//! enabled = true
//! backend = "anthropic"
//! cost_per_1m_input_tokens = 3.0
//! cost_per_1m_output_tokens = 15.0
//!
//! [defaults]
//! format = "text"
//! fail_on = "critical"
//! workers = 4
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// File names searched in the working directory, in priority order
pub const CONFIG_FILE_NAMES: &[&str] = &["sentinal.toml", ".sentinalrc.json"];

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub defaults: CliDefaults,
}

/// Ingestion limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Bytes per artifact
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_max_files() -> usize {
    10
}

fn default_max_file_size() -> u64 {
    1_000_000
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// Adjustments to the built-in rule catalog
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RulesConfig {
    /// Categories to switch off (case and `-`/`_` insensitive)
    #[serde(default)]
    pub disabled: Vec<String>,

    /// Severity overrides keyed by category
    #[serde(default)]
    pub severity: HashMap<String, String>,

    #[serde(default)]
    pub custom: Vec<CustomRuleConfig>,
}

/// A user-defined pattern rule
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustomRuleConfig {
    /// `sql`, `terraform` or `yaml`
    pub kind: String,
    pub category: String,
    pub pattern: String,
    pub severity: String,
    pub description: String,
    #[serde(default)]
    pub recommendation: Option<String>,
}

/// Report generation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Produce a memo at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// LLM backend; without one the deterministic memo is used
    #[serde(default)]
    pub backend: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// USD per million prompt tokens
    #[serde(default)]
    pub cost_per_1m_input_tokens: f64,

    /// USD per million completion tokens
    #[serde(default)]
    pub cost_per_1m_output_tokens: f64,
}

fn default_true() -> bool {
    true
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: None,
            model: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            cost_per_1m_input_tokens: 0.0,
            cost_per_1m_output_tokens: 0.0,
        }
    }
}

/// Default CLI flags that can be set in project config
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CliDefaults {
    /// Default output format (text, json, markdown)
    #[serde(default)]
    pub format: Option<String>,

    /// Default CI gate severity
    #[serde(default)]
    pub fail_on: Option<String>,

    #[serde(default)]
    pub workers: Option<usize>,
}

/// Load project configuration from `dir`.
///
/// Tries `sentinal.toml`, then `.sentinalrc.json`. A missing file gives
/// defaults; a broken file is logged and skipped.
pub fn load_project_config(dir: &Path) -> ProjectConfig {
    for name in CONFIG_FILE_NAMES {
        let path = dir.join(name);
        if !path.exists() {
            continue;
        }
        match load_config_file(&path) {
            Ok(config) => {
                debug!("Loaded project config from {}", path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
            }
        }
    }

    debug!("No project config found, using defaults");
    ProjectConfig::default()
}

/// Load one config file, picking the parser from its extension
pub fn load_config_file(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let config = if is_json {
        serde_json::from_str(&content)?
    } else {
        toml::from_str(&content)?
    };
    Ok(config)
}

/// Commented example written by `sentinal init`
pub fn example_config() -> &'static str {
    r#"# SentinAL project configuration

[limits]
max_files = 10
max_file_size = 1000000

[rules]
# disabled = ["COMMENTED_ROLLBACK"]
# severity = { DROP_COLUMN = "critical" }

# [[rules.custom]]
# kind = "sql"
# category = "GRANT_ALL"
# pattern = 'GRANT\s+ALL'
# severity = "high"
# description = "Grants every privilege on an object"
# recommendation = "Grant only the privileges the role needs"

[report]
enabled = true
# backend = "anthropic"   # anthropic, openai, deepinfra, openrouter, ollama
# model = "claude-sonnet-4-20250514"
max_tokens = 2048
temperature = 0.2
timeout_secs = 120
cost_per_1m_input_tokens = 0.0
cost_per_1m_output_tokens = 0.0

[defaults]
format = "text"
# fail_on = "critical"
# workers = 4
"#
}

#[cfg(test)]
mod tests;
