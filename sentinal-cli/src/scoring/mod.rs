//! Risk aggregation
//!
//! Turns a run's findings into a single score and a risk level.
//!
//! # Scoring Formula
//!
//! ```text
//! Score = min(100, Σ weight(severity))
//!
//!   CRITICAL = 40
//!   HIGH     = 20
//!   MEDIUM   = 10
//!   LOW      = 5
//!   INFO     = 0
//! ```
//!
//! The sum is not normalized: one file with a few critical findings
//! saturates the score.
//!
//! # Classification
//!
//! - `>= 60` → CRITICAL
//! - `>= 40` → HIGH
//! - `>= 20` → MEDIUM
//! - otherwise LOW
//!
//! A run with no findings scores 0 and classifies LOW; callers tell "clean"
//! apart from "low risk" by looking at the findings themselves.

use crate::models::{AnalysisRun, Finding, RiskLevel, Severity};
use std::collections::BTreeMap;

/// Upper bound of the aggregate score
pub const MAX_SCORE: u32 = 100;

/// Score contribution of one finding
pub fn severity_weight(severity: Severity) -> u32 {
    match severity {
        Severity::Critical => 40,
        Severity::High => 20,
        Severity::Medium => 10,
        Severity::Low => 5,
        Severity::Info => 0,
    }
}

/// Sum of severity weights, capped at [`MAX_SCORE`]
pub fn score(findings: &[Finding]) -> u32 {
    findings
        .iter()
        .map(|f| severity_weight(f.severity))
        .fold(0u32, |acc, w| acc.saturating_add(w))
        .min(MAX_SCORE)
}

pub fn classify(score: u32) -> RiskLevel {
    match score {
        s if s >= 60 => RiskLevel::Critical,
        s if s >= 40 => RiskLevel::High,
        s if s >= 20 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

/// Findings bucketed by severity.
///
/// Every severity has an entry, even when empty. Within a bucket findings
/// keep their input order. Iteration goes from INFO up to CRITICAL.
pub fn group_by_severity(findings: &[Finding]) -> BTreeMap<Severity, Vec<&Finding>> {
    let mut groups: BTreeMap<Severity, Vec<&Finding>> =
        Severity::ALL.iter().map(|s| (*s, Vec::new())).collect();
    for finding in findings {
        groups.entry(finding.severity).or_default().push(finding);
    }
    groups
}

/// Whether a finished run should fail a CI gate at `threshold`
pub fn should_block(run: &AnalysisRun, threshold: Severity) -> bool {
    run.findings_summary().at_or_above(threshold) > 0
}
