//! Core data models for SentinAL
//!
//! These models are shared by every stage of the pipeline: artifacts as
//! they come out of ingestion, findings and dependencies as the detectors
//! produce them, and the `AnalysisRun` that accumulates both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Generate a deterministic finding ID based on content hash.
///
/// Findings get stable IDs across runs so reports can be diffed and
/// individual findings referenced from CI logs. Two findings only share an
/// ID when every hashed field is identical.
pub fn deterministic_finding_id(
    detector: &str,
    artifact: &str,
    line: Option<u32>,
    category: &str,
    description: &str,
) -> String {
    let line = line.map(|l| l.to_string()).unwrap_or_default();
    let input = format!("{detector}\n{artifact}\n{line}\n{category}\n{description}");
    let digest = Sha256::digest(input.as_bytes());
    format!("{:x}", digest)[..16].to_string()
}

/// Severity levels for findings, ordered so that `Critical` compares highest
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities, highest first
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            "info" => Ok(Severity::Info),
            other => Err(format!(
                "unknown severity '{}'. Valid values: critical, high, medium, low, info",
                other
            )),
        }
    }
}

/// Kind of deployment artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Sql,
    Terraform,
    Yaml,
    #[default]
    Unknown,
}

impl ArtifactKind {
    /// Kinds that have rule tables and a structural parser
    pub const SUPPORTED: [ArtifactKind; 3] =
        [ArtifactKind::Sql, ArtifactKind::Terraform, ArtifactKind::Yaml];

    pub fn is_supported(&self) -> bool {
        !matches!(self, ArtifactKind::Unknown)
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Sql => write!(f, "sql"),
            ArtifactKind::Terraform => write!(f, "terraform"),
            ArtifactKind::Yaml => write!(f, "yaml"),
            ArtifactKind::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sql" => Ok(ArtifactKind::Sql),
            "terraform" | "tf" | "hcl" => Ok(ArtifactKind::Terraform),
            "yaml" | "yml" | "kubernetes" | "k8s" => Ok(ArtifactKind::Yaml),
            "unknown" => Ok(ArtifactKind::Unknown),
            other => Err(format!(
                "unknown artifact kind '{}'. Valid kinds: sql, terraform, yaml",
                other
            )),
        }
    }
}

/// One submitted deployment file
///
/// Artifacts are created at ingestion and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub kind: ArtifactKind,
    #[serde(skip_serializing, default)]
    pub content: String,
    pub size_bytes: usize,
}

impl Artifact {
    pub fn new(name: impl Into<String>, kind: ArtifactKind, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            name: name.into(),
            kind,
            size_bytes: content.len(),
            content,
        }
    }
}

/// A single detected risk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Finding {
    #[serde(default)]
    pub id: String,
    /// Name of the artifact the finding belongs to
    pub artifact: String,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub severity: Severity,
    /// Category tag, e.g. `DROP_TABLE`
    pub category: String,
    pub description: String,
    /// Component that produced the finding (`rules_tool`, `parser_tool`, ...)
    pub detector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl Finding {
    /// Create a finding; the ID is derived from its content
    pub fn new(
        detector: &str,
        artifact: &str,
        line: Option<u32>,
        severity: Severity,
        category: &str,
        description: impl Into<String>,
    ) -> Self {
        let description = description.into();
        Self {
            id: deterministic_finding_id(detector, artifact, line, category, &description),
            artifact: artifact.to_string(),
            line,
            severity,
            category: category.to_string(),
            description,
            detector: detector.to_string(),
            reasoning: None,
            snippet: None,
            recommendation: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }
}

/// Summary of findings by severity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingsSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total: usize,
}

impl FindingsSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self::default();
        for f in findings {
            match f.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Info => summary.info += 1,
            }
            summary.total += 1;
        }
        summary
    }

    /// Number of findings at or above `threshold`
    pub fn at_or_above(&self, threshold: Severity) -> usize {
        Severity::ALL
            .iter()
            .filter(|s| **s >= threshold)
            .map(|s| self.count(*s))
            .sum()
    }

    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.info,
        }
    }
}

/// Named entities extracted from one artifact
///
/// SQL contributes tables grouped by role, Terraform its block addresses
/// (`aws_s3_bucket.logs`, `data.x.y`, `module.vpc`, `provider.aws`) and
/// Kubernetes manifests their object kinds. Only tables take part in
/// dependency analysis. Ordered sets keep every downstream iteration
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySet {
    pub tables_created: BTreeSet<String>,
    pub tables_dropped: BTreeSet<String>,
    pub tables_truncated: BTreeSet<String>,
    pub tables_altered: BTreeSet<String>,
    pub tables_referenced: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub resources: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub kinds: BTreeSet<String>,
}

impl EntitySet {
    /// Tables that must already exist for this artifact to run:
    /// referenced, altered and truncated tables.
    pub fn required_tables(&self) -> BTreeSet<String> {
        self.tables_referenced
            .iter()
            .chain(self.tables_altered.iter())
            .chain(self.tables_truncated.iter())
            .cloned()
            .collect()
    }

    /// Union `other` into this set
    pub fn merge(&mut self, other: &EntitySet) {
        self.tables_created.extend(other.tables_created.iter().cloned());
        self.tables_dropped.extend(other.tables_dropped.iter().cloned());
        self.tables_truncated.extend(other.tables_truncated.iter().cloned());
        self.tables_altered.extend(other.tables_altered.iter().cloned());
        self.tables_referenced.extend(other.tables_referenced.iter().cloned());
        self.resources.extend(other.resources.iter().cloned());
        self.kinds.extend(other.kinds.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.tables_created.is_empty()
            && self.tables_dropped.is_empty()
            && self.tables_truncated.is_empty()
            && self.tables_altered.is_empty()
            && self.tables_referenced.is_empty()
            && self.resources.is_empty()
            && self.kinds.is_empty()
    }
}

/// Entities of one artifact, keyed by the artifact name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntities {
    pub artifact: String,
    pub entities: EntitySet,
}

impl ArtifactEntities {
    pub fn new(artifact: impl Into<String>, entities: EntitySet) -> Self {
        Self {
            artifact: artifact.into(),
            entities,
        }
    }
}

/// Relationship kinds detected between artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    /// Source needs a table the target creates
    #[serde(rename = "TABLE_CREATION")]
    CreationDependency,
    /// Source needs a table the target drops
    #[serde(rename = "TABLE_DROP_CONFLICT")]
    DropConflict,
    /// Source runs before the target that creates a table it needs
    #[serde(rename = "EXECUTION_ORDER_VIOLATION")]
    OrderViolation,
}

impl DependencyKind {
    /// Category tag used when the dependency is mirrored into a finding
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::CreationDependency => "TABLE_CREATION",
            DependencyKind::DropConflict => "TABLE_DROP_CONFLICT",
            DependencyKind::OrderViolation => "EXECUTION_ORDER_VIOLATION",
        }
    }
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cross-artifact relationship or conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub source: String,
    pub target: String,
    pub kind: DependencyKind,
    pub severity: Severity,
    /// Table that links the two artifacts
    pub table: String,
    pub description: String,
}

/// Run-level risk bucket derived from the aggregate score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Suggested execution order with a human-readable rationale
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub order: Vec<String>,
    pub rationale: String,
}

/// Where the final report text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportSource {
    /// Produced by the external report generator
    Generated,
    /// Deterministic template, used when the generator failed or is absent
    Fallback,
    /// Reporting disabled
    #[default]
    Skipped,
}

/// One analysis of a batch of artifacts
///
/// Findings and dependencies are append-only: the run exposes push
/// operations and read-only slices, never mutable access to what was
/// already recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRun {
    artifacts: Vec<Artifact>,
    findings: Vec<Finding>,
    dependencies: Vec<Dependency>,
    /// Entities of every supported artifact, in input order
    entities: Vec<ArtifactEntities>,
    findings_summary: FindingsSummary,
    suggested_order: Option<ExecutionPlan>,
    score: u32,
    classification: RiskLevel,
    nothing_analyzed: bool,
    total_cost_usd: f64,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    report: Option<String>,
    report_source: ReportSource,
}

impl AnalysisRun {
    pub fn new(artifacts: Vec<Artifact>) -> Self {
        Self {
            artifacts,
            findings: Vec::new(),
            dependencies: Vec::new(),
            entities: Vec::new(),
            findings_summary: FindingsSummary::default(),
            suggested_order: None,
            score: 0,
            classification: RiskLevel::Low,
            nothing_analyzed: false,
            total_cost_usd: 0.0,
            started_at: Utc::now(),
            completed_at: None,
            report: None,
            report_source: ReportSource::Skipped,
        }
    }

    pub fn push_finding(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn extend_findings(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.findings.extend(findings);
    }

    pub fn push_dependency(&mut self, dependency: Dependency) {
        self.dependencies.push(dependency);
    }

    /// Add the cost of an external call; negative amounts are ignored so
    /// the counter only ever grows.
    pub fn add_cost(&mut self, usd: f64) {
        if usd.is_finite() && usd > 0.0 {
            self.total_cost_usd += usd;
        }
    }

    pub fn set_entities(&mut self, entities: Vec<ArtifactEntities>) {
        self.entities = entities;
    }

    pub fn set_suggested_order(&mut self, plan: ExecutionPlan) {
        self.suggested_order = Some(plan);
    }

    pub fn mark_nothing_analyzed(&mut self) {
        self.nothing_analyzed = true;
    }

    /// Record the aggregate score and close the analysis phase
    pub fn finalize(&mut self, score: u32, classification: RiskLevel) {
        self.findings_summary = FindingsSummary::from_findings(&self.findings);
        self.score = score;
        self.classification = classification;
        self.completed_at = Some(Utc::now());
    }

    pub fn set_report(&mut self, text: String, source: ReportSource) {
        self.report = Some(text);
        self.report_source = source;
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn entities(&self) -> &[ArtifactEntities] {
        &self.entities
    }

    pub fn findings_summary(&self) -> &FindingsSummary {
        &self.findings_summary
    }

    pub fn suggested_order(&self) -> Option<&ExecutionPlan> {
        self.suggested_order.as_ref()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn classification(&self) -> RiskLevel {
        self.classification
    }

    pub fn nothing_analyzed(&self) -> bool {
        self.nothing_analyzed
    }

    pub fn total_cost_usd(&self) -> f64 {
        self.total_cost_usd
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn report(&self) -> Option<&str> {
        self.report.as_deref()
    }

    pub fn report_source(&self) -> ReportSource {
        self.report_source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Info);
    }

    #[test]
    fn test_severity_serializes_uppercase() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"CRITICAL\"");
        assert_eq!("high".parse::<Severity>().unwrap(), Severity::High);
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn test_finding_id_is_stable() {
        let a = Finding::new("rules_tool", "a.sql", Some(1), Severity::High, "X", "desc");
        let b = Finding::new("rules_tool", "a.sql", Some(1), Severity::High, "X", "desc");
        let c = Finding::new("rules_tool", "a.sql", Some(2), Severity::High, "X", "desc");
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.id.len(), 16);
    }

    #[test]
    fn test_required_tables_union() {
        let mut entities = EntitySet::default();
        entities.tables_referenced.insert("users".into());
        entities.tables_altered.insert("orders".into());
        entities.tables_truncated.insert("users".into());
        entities.tables_created.insert("audit".into());

        let required: Vec<_> = entities.required_tables().into_iter().collect();
        assert_eq!(required, vec!["orders".to_string(), "users".to_string()]);
    }

    #[test]
    fn test_merge_and_emptiness_cover_every_entity() {
        let mut set = EntitySet::default();
        assert!(set.is_empty());

        let tf = EntitySet {
            resources: ["aws_s3_bucket.logs".to_string()].into(),
            ..Default::default()
        };
        let yaml = EntitySet {
            kinds: ["Deployment".to_string()].into(),
            ..Default::default()
        };
        set.merge(&tf);
        set.merge(&yaml);
        assert!(!set.is_empty());
        assert!(set.required_tables().is_empty());
        assert!(set.resources.contains("aws_s3_bucket.logs"));
        assert!(set.kinds.contains("Deployment"));
    }

    #[test]
    fn test_empty_entity_groups_not_serialized() {
        let json = serde_json::to_value(EntitySet::default()).unwrap();
        assert!(json.get("resources").is_none());
        assert!(json.get("kinds").is_none());
        assert!(json.get("tables_created").is_some());
    }

    #[test]
    fn test_summary_at_or_above() {
        let findings = vec![
            Finding::new("d", "f", None, Severity::Critical, "A", "a"),
            Finding::new("d", "f", None, Severity::Medium, "B", "b"),
            Finding::new("d", "f", None, Severity::Info, "C", "c"),
        ];
        let summary = FindingsSummary::from_findings(&findings);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.at_or_above(Severity::High), 1);
        assert_eq!(summary.at_or_above(Severity::Low), 2);
        assert_eq!(summary.at_or_above(Severity::Info), 3);
    }

    #[test]
    fn test_cost_counter_never_decreases() {
        let mut run = AnalysisRun::new(vec![]);
        run.add_cost(0.25);
        run.add_cost(-1.0);
        run.add_cost(f64::NAN);
        assert!((run.total_cost_usd() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_artifact_content_not_serialized() {
        let artifact = Artifact::new("a.sql", ArtifactKind::Sql, "DROP TABLE users;");
        assert_eq!(artifact.size_bytes, 17);
        let json = serde_json::to_value(&artifact).unwrap();
        assert!(json.get("content").is_none());
        assert_eq!(json["kind"], "sql");
    }
}
