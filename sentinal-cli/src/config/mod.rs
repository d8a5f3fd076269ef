//! Configuration module
//!
//! This module handles:
//! - Project-level configuration (sentinal.toml / .sentinalrc.json)
//! - Rule catalog adjustments
//! - Report generator settings
//! - CLI defaults

mod project_config;

pub use project_config::{
    example_config, load_config_file, load_project_config, CliDefaults, CustomRuleConfig,
    LimitsConfig, ProjectConfig, ReportConfig, RulesConfig, CONFIG_FILE_NAMES,
};
