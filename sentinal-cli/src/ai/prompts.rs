//! Prompt for the defense memo

use crate::ai::ReportRequest;
use crate::models::{Finding, Severity};
use std::fmt::Write;

pub const MEMO_SYSTEM_PROMPT: &str = "You are a technical analyst writing an objective defense memo \
for a deployment review. Explain what was found and why it is risky in production. \
State facts only: never tell the reader to approve or reject the deployment, and never \
invent findings that are not listed in the input.";

/// Builds the user message sent to the model
pub struct MemoPromptBuilder<'a> {
    request: &'a ReportRequest,
}

impl<'a> MemoPromptBuilder<'a> {
    pub fn new(request: &'a ReportRequest) -> Self {
        Self { request }
    }

    pub fn build(&self) -> String {
        let req = self.request;
        let files = req.file_label();
        let date = req.analysis_date.to_rfc3339();
        let mut out = String::new();

        let _ = writeln!(out, "## Input Data\n");
        let _ = writeln!(out, "**Files Analyzed:** {}", files);
        let _ = writeln!(out, "**Risk Score:** {}/100", req.score);
        let _ = writeln!(out, "**Risk Classification:** {}", req.classification);
        let _ = writeln!(out, "**Total Findings:** {}\n", req.total_findings());
        let _ = writeln!(out, "**Critical Findings:**\n{}", numbered(req.group(Severity::Critical), true));
        let _ = writeln!(out, "**High-Priority Findings:**\n{}", numbered(req.group(Severity::High), false));
        let _ = writeln!(out, "**All Findings Summary:**\n{}\n", severity_counts(req));

        let _ = writeln!(out, "## Task\n");
        let _ = writeln!(out, "Write the memo in this markdown layout:\n");
        let _ = writeln!(out, "# Defense Memo: {}", files);
        let _ = writeln!(out, "## Executive Summary");
        let _ = writeln!(out, "[2-3 factual sentences: what was analyzed, what was found, overall risk]");
        let _ = writeln!(out, "## Risk Assessment");
        let _ = writeln!(out, "- **Overall Risk Score:** {}/100", req.score);
        let _ = writeln!(out, "- **Risk Classification:** {}", req.classification);
        let _ = writeln!(out, "- **Analysis Date:** {}", date);
        let _ = writeln!(out, "## Critical Issues");
        let _ = writeln!(
            out,
            "[One subsection per critical finding with Location, Risk and Context. \
             If there are none, write \"No critical issues detected.\"]"
        );
        let _ = writeln!(out, "## High-Priority Issues");
        let _ = writeln!(
            out,
            "[One line per HIGH finding. If there are none, write \"No high-priority issues detected.\"]"
        );
        let _ = writeln!(out, "## Summary");
        let _ = writeln!(out, "[2-3 objective sentences on the overall deployment risk]");
        let _ = writeln!(out, "---");
        let _ = write!(
            out,
            "*Analysis Cost: ${:.6} | Completed: {}*",
            req.cost_so_far_usd, date
        );
        out
    }
}

fn numbered(findings: &[Finding], with_reasoning: bool) -> String {
    if findings.is_empty() {
        return "None".to_string();
    }
    let mut text = String::new();
    for (i, f) in findings.iter().enumerate() {
        let _ = writeln!(text, "{}. [{}] {}", i + 1, f.category, f.description);
        if with_reasoning {
            if let Some(reasoning) = &f.reasoning {
                let _ = writeln!(text, "   Reasoning: {}", reasoning);
            }
        }
    }
    text
}

fn severity_counts(req: &ReportRequest) -> String {
    let lines: Vec<String> = Severity::ALL
        .iter()
        .filter(|s| **s != Severity::Info)
        .filter_map(|s| {
            let n = req.group(*s).len();
            (n > 0).then(|| format!("- {}: {} issue(s)", s, n))
        })
        .collect();
    if lines.is_empty() {
        "No findings".to_string()
    } else {
        lines.join("\n")
    }
}
