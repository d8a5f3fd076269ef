//! Defense memo generation
//!
//! [`ReportGenerator`] is the seam between the deterministic core and
//! whatever writes prose. [`fallback_memo`] renders the same information
//! from a fixed template and never fails.

use crate::ai::{AiClient, AiError, AiResult, MemoPromptBuilder, Pricing, MEMO_SYSTEM_PROMPT};
use crate::models::{AnalysisRun, Finding, RiskLevel, Severity};
use crate::scoring::group_by_severity;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::debug;

/// Everything a report generator gets to see about a run
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub files: Vec<String>,
    pub score: u32,
    pub classification: RiskLevel,
    /// Every severity is present, possibly empty
    pub findings: BTreeMap<Severity, Vec<Finding>>,
    pub cost_so_far_usd: f64,
    pub analysis_date: DateTime<Utc>,
}

impl ReportRequest {
    pub fn from_run(run: &AnalysisRun) -> Self {
        let findings = group_by_severity(run.findings())
            .into_iter()
            .map(|(severity, group)| (severity, group.into_iter().cloned().collect()))
            .collect();
        Self {
            files: run.artifacts().iter().map(|a| a.name.clone()).collect(),
            score: run.score(),
            classification: run.classification(),
            findings,
            cost_so_far_usd: run.total_cost_usd(),
            analysis_date: run.completed_at().unwrap_or_else(|| run.started_at()),
        }
    }

    /// File names for headings; "Unknown" for an empty batch
    pub fn file_label(&self) -> String {
        if self.files.is_empty() {
            "Unknown".to_string()
        } else {
            self.files.join(", ")
        }
    }

    pub fn group(&self, severity: Severity) -> &[Finding] {
        self.findings.get(&severity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_findings(&self) -> usize {
        self.findings.values().map(Vec::len).sum()
    }
}

/// Report text plus what producing it cost
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedReport {
    pub text: String,
    pub cost_usd: f64,
}

pub trait ReportGenerator: Send + Sync {
    fn name(&self) -> &str;

    fn generate(&self, request: &ReportRequest) -> Result<GeneratedReport, AiError>;
}

/// Report generator backed by an LLM
pub struct LlmReportGenerator {
    client: AiClient,
    pricing: Pricing,
}

impl LlmReportGenerator {
    pub fn new(client: AiClient) -> Self {
        Self {
            client,
            pricing: Pricing::default(),
        }
    }

    /// USD per million input and output tokens; negative prices count as zero
    pub fn with_pricing(mut self, input_per_1m: f64, output_per_1m: f64) -> Self {
        self.pricing = Pricing {
            input_per_1m: input_per_1m.max(0.0),
            output_per_1m: output_per_1m.max(0.0),
        };
        self
    }
}

impl ReportGenerator for LlmReportGenerator {
    fn name(&self) -> &str {
        self.client.model()
    }

    fn generate(&self, request: &ReportRequest) -> AiResult<GeneratedReport> {
        let prompt = MemoPromptBuilder::new(request).build();
        let completion = self.client.complete(MEMO_SYSTEM_PROMPT, &prompt)?;
        if completion.text.trim().is_empty() {
            return Err(AiError::ParseError("empty memo".to_string()));
        }
        let cost_usd = completion.usage.cost_usd(self.pricing);
        debug!(
            "Memo from {:?}/{}: {} input, {} output tokens (${:.6})",
            self.client.backend(),
            self.client.model(),
            completion.usage.input_tokens,
            completion.usage.output_tokens,
            cost_usd
        );
        Ok(GeneratedReport {
            text: completion.text,
            cost_usd,
        })
    }
}

/// Deterministic memo used when no generator is available or it failed
pub fn fallback_memo(request: &ReportRequest) -> String {
    let files = request.file_label();
    let date = request.analysis_date.to_rfc3339();
    let mut memo = String::new();

    let _ = writeln!(memo, "# Defense Memo: {}\n", files);
    let _ = writeln!(memo, "## Executive Summary\n");
    let _ = writeln!(
        memo,
        "Analysis completed with {}/100 risk score ({} level).\n",
        request.score, request.classification
    );
    let _ = writeln!(memo, "## Risk Assessment\n");
    let _ = writeln!(memo, "- **Overall Risk Score:** {}/100", request.score);
    let _ = writeln!(memo, "- **Risk Classification:** {}", request.classification);
    let _ = writeln!(memo, "- **Analysis Date:** {}\n", date);

    let _ = writeln!(memo, "## Critical Issues");
    let critical = request.group(Severity::Critical);
    if critical.is_empty() {
        let _ = writeln!(memo, "\nNo critical issues detected.");
    } else {
        for finding in critical {
            let _ = writeln!(memo, "\n### {}", finding.category);
            if let Some(line) = finding.line {
                let _ = writeln!(memo, "**Location:** {} line {}", finding.artifact, line);
            } else {
                let _ = writeln!(memo, "**Location:** {}", finding.artifact);
            }
            let _ = writeln!(memo, "**Risk:** {}", finding.description);
        }
    }

    let _ = writeln!(memo, "\n## High-Priority Issues\n");
    let high = request.group(Severity::High);
    if high.is_empty() {
        let _ = writeln!(memo, "No high-priority issues detected.");
    } else {
        for finding in high {
            let _ = writeln!(memo, "- [{}] {}", finding.category, finding.description);
        }
    }

    let _ = write!(
        memo,
        "\n---\n*Analysis Cost: ${:.6} | Completed: {}*\n",
        request.cost_so_far_usd, date
    );
    memo
}
