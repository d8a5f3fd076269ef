//! Markdown reporter for GitHub-flavored Markdown output
//!
//! Meant for pull request comments on the change that carries the
//! migration or manifest.

use crate::models::{AnalysisRun, Finding, RiskLevel, Severity};
use crate::reporters::{entity_groups, location};
use anyhow::Result;

/// Maximum findings to show per severity level
const MAX_FINDINGS_PER_SEVERITY: usize = 10;

pub fn render(run: &AnalysisRun) -> Result<String> {
    let mut md = String::new();

    md.push_str(&render_header(run));
    md.push('\n');
    md.push_str(&render_summary(run));
    md.push('\n');
    md.push_str(&render_findings(run));

    if let Some(entities) = render_entities(run) {
        md.push('\n');
        md.push_str(&entities);
    }
    if !run.dependencies().is_empty() {
        md.push('\n');
        md.push_str(&render_dependencies(run));
    }
    if run.suggested_order().is_some() {
        md.push('\n');
        md.push_str(&render_order(run));
    }
    if let Some(memo) = run.report() {
        md.push_str("\n---\n\n");
        md.push_str(memo.trim_end());
        md.push('\n');
    }

    Ok(md)
}

fn render_header(run: &AnalysisRun) -> String {
    let emoji = match run.classification() {
        RiskLevel::Critical => "🛑",
        RiskLevel::High => "❌",
        RiskLevel::Medium => "⚠️",
        RiskLevel::Low => "✅",
    };
    let generated = run
        .completed_at()
        .unwrap_or_else(|| run.started_at())
        .format("%Y-%m-%d %H:%M:%S UTC");

    format!(
        "# {} Deployment Risk Report\n\n**Risk: {}** | **Score: {}/100**\n\nGenerated: {}\n",
        emoji,
        run.classification(),
        run.score(),
        generated
    )
}

fn render_summary(run: &AnalysisRun) -> String {
    let fs = run.findings_summary();
    let mut md = String::from("## Summary\n\n| Severity | Count |\n|----------|-------|\n");
    for severity in Severity::ALL {
        md.push_str(&format!("| {} {} | {} |\n", severity_emoji(severity), severity, fs.count(severity)));
    }
    md.push_str(&format!("| **Total** | **{}** |\n", fs.total));

    let artifacts: Vec<String> = run
        .artifacts()
        .iter()
        .map(|a| format!("`{}` ({})", a.name, a.kind))
        .collect();
    if !artifacts.is_empty() {
        md.push_str(&format!("\n**Artifacts:** {}\n", artifacts.join(", ")));
    }
    md
}

fn render_findings(run: &AnalysisRun) -> String {
    let mut md = String::from("## Findings\n\n");

    if run.nothing_analyzed() {
        md.push_str("No SQL, Terraform or YAML artifacts to analyze.\n");
        return md;
    }
    if run.findings().is_empty() {
        md.push_str("✅ No risky operations detected.\n");
        return md;
    }

    for severity in Severity::ALL {
        let findings: Vec<&Finding> = run
            .findings()
            .iter()
            .filter(|f| f.severity == severity)
            .collect();
        if findings.is_empty() {
            continue;
        }

        md.push_str(&format!(
            "### {} {} ({})\n\n",
            severity_emoji(severity),
            severity,
            findings.len()
        ));

        for finding in findings.iter().take(MAX_FINDINGS_PER_SEVERITY) {
            md.push_str(&render_finding(finding));
        }
        let hidden = findings.len().saturating_sub(MAX_FINDINGS_PER_SEVERITY);
        if hidden > 0 {
            md.push_str(&format!("*...and {} more {} findings*\n\n", hidden, severity));
        }
    }
    md
}

fn render_finding(finding: &Finding) -> String {
    let mut md = format!(
        "- **{}** at `{}` ({})\n  {}\n",
        finding.category,
        location(&finding.artifact, finding.line),
        finding.detector,
        finding.description
    );
    if let Some(snippet) = &finding.snippet {
        md.push_str(&format!("  `{}`\n", snippet.replace('`', "'")));
    }
    if let Some(rec) = &finding.recommendation {
        md.push_str(&format!("  > **Recommendation:** {}\n", rec));
    }
    md.push('\n');
    md
}

/// Per-artifact entity table; `None` when nothing was extracted
fn render_entities(run: &AnalysisRun) -> Option<String> {
    let rows: Vec<String> = run
        .entities()
        .iter()
        .filter_map(|e| {
            let groups = entity_groups(&e.entities);
            if groups.is_empty() {
                return None;
            }
            let cells: Vec<String> = groups
                .iter()
                .map(|(label, names)| {
                    let quoted: Vec<String> = names.iter().map(|n| format!("`{}`", n)).collect();
                    format!("{} {}", label, quoted.join(", "))
                })
                .collect();
            Some(format!("| `{}` | {} |\n", e.artifact, cells.join("; ")))
        })
        .collect();
    if rows.is_empty() {
        return None;
    }
    Some(format!(
        "## Entities\n\n| Artifact | Entities |\n|----------|----------|\n{}",
        rows.concat()
    ))
}

fn render_dependencies(run: &AnalysisRun) -> String {
    let mut md = String::from(
        "## Cross-File Dependencies\n\n| Kind | Source | Target | Table | Severity |\n|------|--------|--------|-------|----------|\n",
    );
    for dep in run.dependencies() {
        md.push_str(&format!(
            "| {} | `{}` | `{}` | `{}` | {} |\n",
            dep.kind, dep.source, dep.target, dep.table, dep.severity
        ));
    }
    md
}

fn render_order(run: &AnalysisRun) -> String {
    let mut md = String::from("## Suggested Execution Order\n\n");
    if let Some(plan) = run.suggested_order() {
        for (i, name) in plan.order.iter().enumerate() {
            md.push_str(&format!("{}. `{}`\n", i + 1, name));
        }
        md.push_str(&format!("\n{}\n", plan.rationale));
    }
    md
}

fn severity_emoji(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "🔴",
        Severity::High => "🟠",
        Severity::Medium => "🟡",
        Severity::Low => "🔵",
        Severity::Info => "ℹ️",
    }
}
