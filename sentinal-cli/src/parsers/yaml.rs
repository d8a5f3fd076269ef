//! Kubernetes manifest scanner
//!
//! Line based: no YAML model is built. Full-line comments are ignored.

use crate::models::{EntitySet, Finding, Severity};
use regex::Regex;
use std::sync::OnceLock;

pub const YAML_DETECTOR: &str = "yaml_parser_tool";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YamlAnalysis {
    /// Every `kind:` value, in file order
    pub kinds: Vec<String>,
    /// Non-empty documents separated by `---`
    pub documents: usize,
    pub has_deployment: bool,
    pub has_resource_limits: bool,
}

impl YamlAnalysis {
    /// Distinct manifest kinds as an entity set
    pub fn entities(&self) -> EntitySet {
        EntitySet {
            kinds: self.kinds.iter().cloned().collect(),
            ..Default::default()
        }
    }
}

static KIND: OnceLock<Regex> = OnceLock::new();
static LIMITS: OnceLock<Regex> = OnceLock::new();

fn kind_pattern() -> &'static Regex {
    KIND.get_or_init(|| {
        Regex::new(r#"\bkind:\s*["']?([A-Za-z_][A-Za-z0-9_]*)"#).expect("static YAML pattern")
    })
}

fn limits_pattern() -> &'static Regex {
    LIMITS.get_or_init(|| Regex::new(r"\blimits:").expect("static YAML pattern"))
}

pub fn analyze(content: &str) -> YamlAnalysis {
    let mut analysis = YamlAnalysis::default();
    let mut document_has_content = false;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            continue;
        }
        if line.starts_with("---") {
            if document_has_content {
                analysis.documents += 1;
            }
            document_has_content = false;
            continue;
        }
        if !trimmed.is_empty() && trimmed != "..." {
            document_has_content = true;
        }

        for caps in kind_pattern().captures_iter(line) {
            analysis.kinds.push(caps[1].to_string());
        }
        if limits_pattern().is_match(line) {
            analysis.has_resource_limits = true;
        }
    }
    if document_has_content {
        analysis.documents += 1;
    }

    analysis.has_deployment = analysis.kinds.iter().any(|k| k == "Deployment");
    analysis
}

/// Entities and structural findings for a YAML artifact
pub fn parse(artifact: &str, content: &str) -> (EntitySet, Vec<Finding>) {
    let analysis = analyze(content);
    let mut findings = Vec::new();

    if analysis.has_deployment && !analysis.has_resource_limits {
        findings.push(
            Finding::new(
                YAML_DETECTOR,
                artifact,
                None,
                Severity::Medium,
                "MISSING_RESOURCE_LIMITS",
                "No resource limits found, can cause cluster instability",
            )
            .with_reasoning(format!(
                "Deployment declared without any resources.limits section ({} document(s) scanned)",
                analysis.documents
            ))
            .with_recommendation("Add resources.limits and resources.requests to containers"),
        );
    }

    (analysis.entities(), findings)
}
