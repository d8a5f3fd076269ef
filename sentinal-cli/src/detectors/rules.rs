//! Pattern rule engine
//!
//! Applies the ordered rule table for an artifact's kind to its raw text.
//! Every non-overlapping match of every rule becomes one finding; rules
//! never short-circuit each other, so one span can trip several rules.
//!
//! Patterns are compiled once, when the catalog is built. A bad pattern is
//! a startup error, never a per-artifact one.

use crate::config::RulesConfig;
use crate::detectors::base::{Detector, DetectorOutput};
use crate::detectors::catalog::{builtin_rules, RuleSpec};
use crate::models::{Artifact, ArtifactKind, Finding, Severity};
use regex::{Regex, RegexBuilder};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Detector id recorded on rule findings
pub const RULES_DETECTOR: &str = "rules_tool";

/// Characters of context kept on each side of a match
const SNIPPET_CONTEXT: usize = 20;

/// Errors raised while building a rule catalog
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule '{category}' has an invalid pattern: {source}")]
    InvalidPattern {
        category: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{category}' targets unknown artifact kind '{kind}'")]
    UnknownKind { category: String, kind: String },

    #[error("rule '{category}': {message}")]
    InvalidSeverity { category: String, message: String },

    #[error("custom rule has an empty category")]
    EmptyCategory,
}

/// A compiled pattern rule
#[derive(Debug, Clone)]
pub struct Rule {
    pub category: String,
    pub severity: Severity,
    /// Source pattern, as written
    pub pattern: String,
    pub description: String,
    pub recommendation: Option<String>,
    regex: Regex,
}

impl Rule {
    pub fn new(
        category: impl Into<String>,
        severity: Severity,
        pattern: &str,
        description: impl Into<String>,
        recommendation: Option<String>,
    ) -> Result<Self, RuleError> {
        let category = category.into();
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .multi_line(true)
            .build()
            .map_err(|source| RuleError::InvalidPattern {
                category: category.clone(),
                source,
            })?;

        Ok(Self {
            category,
            severity,
            pattern: pattern.to_string(),
            description: description.into(),
            recommendation,
            regex,
        })
    }

    fn from_spec(spec: &RuleSpec) -> Result<Self, RuleError> {
        Self::new(
            spec.category,
            spec.severity,
            spec.pattern,
            spec.description,
            Some(spec.recommendation.to_string()),
        )
    }

    /// Findings for every match of this rule in `content`
    fn matches(&self, artifact: &str, content: &str) -> Vec<Finding> {
        self.regex
            .find_iter(content)
            .map(|m| {
                let line = line_of(content, m.start());
                let mut finding = Finding::new(
                    RULES_DETECTOR,
                    artifact,
                    Some(line),
                    self.severity,
                    &self.category,
                    format!("{} (Line {})", self.description, line),
                )
                .with_reasoning(format!("Pattern matched: {}", self.pattern))
                .with_snippet(snippet_around(content, m.start(), m.end()));
                if let Some(rec) = &self.recommendation {
                    finding = finding.with_recommendation(rec.clone());
                }
                finding
            })
            .collect()
    }
}

/// Immutable set of rule tables, one per artifact kind
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    sql: Vec<Rule>,
    terraform: Vec<Rule>,
    yaml: Vec<Rule>,
}

impl RuleCatalog {
    /// The built-in tables
    pub fn builtin() -> Result<Self, RuleError> {
        Self::from_config(&RulesConfig::default())
    }

    /// Built-in tables adjusted by project configuration: disabled
    /// categories are dropped, severities overridden, custom rules appended
    /// after the built-ins of their kind.
    pub fn from_config(config: &RulesConfig) -> Result<Self, RuleError> {
        let disabled: HashSet<String> = config
            .disabled
            .iter()
            .map(|c| normalize_category(c))
            .collect();

        let mut overrides: HashMap<String, Severity> = HashMap::new();
        for (category, severity) in &config.severity {
            let parsed: Severity =
                severity
                    .parse()
                    .map_err(|message| RuleError::InvalidSeverity {
                        category: category.clone(),
                        message,
                    })?;
            overrides.insert(normalize_category(category), parsed);
        }

        let mut catalog = Self::default();
        let mut known: HashSet<String> = HashSet::new();

        for kind in ArtifactKind::SUPPORTED {
            for spec in builtin_rules(kind) {
                known.insert(spec.category.to_string());
                catalog.table_mut(kind).push(Rule::from_spec(spec)?);
            }
        }

        for custom in &config.custom {
            let category = normalize_category(&custom.category);
            if category.is_empty() {
                return Err(RuleError::EmptyCategory);
            }
            let kind: ArtifactKind = custom
                .kind
                .parse()
                .ok()
                .filter(ArtifactKind::is_supported)
                .ok_or_else(|| RuleError::UnknownKind {
                    category: category.clone(),
                    kind: custom.kind.clone(),
                })?;
            let severity: Severity =
                custom
                    .severity
                    .parse()
                    .map_err(|message| RuleError::InvalidSeverity {
                        category: category.clone(),
                        message,
                    })?;
            let rule = Rule::new(
                category.clone(),
                severity,
                &custom.pattern,
                custom.description.clone(),
                custom.recommendation.clone(),
            )?;
            debug!("Loaded custom {} rule {}", kind, category);
            known.insert(category);
            catalog.table_mut(kind).push(rule);
        }

        for category in disabled.iter().chain(overrides.keys()) {
            if !known.contains(category) {
                warn!("Rule configuration names unknown category '{}'", category);
            }
        }

        for kind in ArtifactKind::SUPPORTED {
            let table = catalog.table_mut(kind);
            table.retain(|rule| !disabled.contains(&rule.category));
            for rule in table.iter_mut() {
                if let Some(severity) = overrides.get(&rule.category) {
                    rule.severity = *severity;
                }
            }
        }

        Ok(catalog)
    }

    /// Ordered rules for a kind; empty for `Unknown`
    pub fn rules(&self, kind: ArtifactKind) -> &[Rule] {
        match kind {
            ArtifactKind::Sql => &self.sql,
            ArtifactKind::Terraform => &self.terraform,
            ArtifactKind::Yaml => &self.yaml,
            ArtifactKind::Unknown => &[],
        }
    }

    fn table_mut(&mut self, kind: ArtifactKind) -> &mut Vec<Rule> {
        match kind {
            ArtifactKind::Sql => &mut self.sql,
            ArtifactKind::Terraform => &mut self.terraform,
            // Unknown never reaches here: callers only pass supported kinds
            ArtifactKind::Yaml | ArtifactKind::Unknown => &mut self.yaml,
        }
    }

    /// Whether `category` names a rule of any kind
    pub fn contains(&self, category: &str) -> bool {
        ArtifactKind::SUPPORTED
            .iter()
            .any(|k| self.rules(*k).iter().any(|r| r.category == category))
    }

    pub fn len(&self) -> usize {
        self.sql.len() + self.terraform.len() + self.yaml.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every rule for `kind` over `content`, in table order
    pub fn apply_rules(&self, kind: ArtifactKind, artifact: &str, content: &str) -> Vec<Finding> {
        self.rules(kind)
            .iter()
            .flat_map(|rule| rule.matches(artifact, content))
            .collect()
    }
}

fn normalize_category(category: &str) -> String {
    category.trim().to_uppercase().replace('-', "_")
}

/// 1-based line of a byte offset
fn line_of(content: &str, offset: usize) -> u32 {
    let newlines = memchr::memchr_iter(b'\n', &content.as_bytes()[..offset]).count();
    u32::try_from(newlines + 1).unwrap_or(u32::MAX)
}

/// Up to `SNIPPET_CONTEXT` characters either side of a match, trimmed
fn snippet_around(content: &str, start: usize, end: usize) -> String {
    let from = content[..start]
        .char_indices()
        .rev()
        .nth(SNIPPET_CONTEXT - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let to = content[end..]
        .char_indices()
        .nth(SNIPPET_CONTEXT)
        .map(|(i, _)| end + i)
        .unwrap_or(content.len());
    content[from..to].trim().to_string()
}

/// Rule engine exposed as a detector
pub struct RuleDetector {
    catalog: Arc<RuleCatalog>,
}

impl RuleDetector {
    pub fn new(catalog: Arc<RuleCatalog>) -> Self {
        Self { catalog }
    }
}

impl Detector for RuleDetector {
    fn name(&self) -> &'static str {
        RULES_DETECTOR
    }

    fn description(&self) -> &'static str {
        "Matches risky operations against the rule catalog"
    }

    fn detect(&self, artifact: &Artifact) -> DetectorOutput {
        DetectorOutput::findings(self.catalog.apply_rules(
            artifact.kind,
            &artifact.name,
            &artifact.content,
        ))
    }
}
