//! Output reporters for analysis runs
//!
//! Supports multiple output formats:
//! - `text` - Terminal output with colors
//! - `json` - Machine-readable JSON of the whole run
//! - `markdown` - GitHub-flavored Markdown, e.g. for PR comments

mod json;
mod markdown;
mod text;

use crate::models::{AnalysisRun, EntitySet};
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(anyhow!(
                "Unknown format '{}'. Valid formats: text, json, markdown",
                s
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// Render a run in the named format
pub fn report(run: &AnalysisRun, format: &str) -> Result<String> {
    let fmt = OutputFormat::from_str(format)?;
    report_with_format(run, fmt)
}

pub fn report_with_format(run: &AnalysisRun, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render(run),
        OutputFormat::Json => json::render(run),
        OutputFormat::Markdown => markdown::render(run),
    }
}

/// Non-empty entity groups of one artifact, labelled for display
pub(crate) fn entity_groups(entities: &EntitySet) -> Vec<(&'static str, Vec<&str>)> {
    [
        ("creates", &entities.tables_created),
        ("drops", &entities.tables_dropped),
        ("truncates", &entities.tables_truncated),
        ("alters", &entities.tables_altered),
        ("references", &entities.tables_referenced),
        ("resources", &entities.resources),
        ("kinds", &entities.kinds),
    ]
    .into_iter()
    .filter(|(_, set)| !set.is_empty())
    .map(|(label, set)| (label, set.iter().map(String::as_str).collect()))
    .collect()
}

/// Location as `artifact:line`, or just the artifact
pub(crate) fn location(artifact: &str, line: Option<u32>) -> String {
    match line {
        Some(line) => format!("{}:{}", artifact, line),
        None => artifact.to_string(),
    }
}
