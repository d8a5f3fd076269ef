//! Text (terminal) reporter with colors and formatting

use crate::models::{AnalysisRun, Finding, RiskLevel, Severity};
use crate::reporters::{entity_groups, location};
use anyhow::Result;
use console::{style, StyledObject};

/// Findings shown before the list is cut short
const MAX_FINDINGS: usize = 25;

fn severity_tag(severity: Severity) -> StyledObject<&'static str> {
    match severity {
        Severity::Critical => style("[C]").red().bold(),
        Severity::High => style("[H]").red(),
        Severity::Medium => style("[M]").yellow(),
        Severity::Low => style("[L]").blue(),
        Severity::Info => style("[I]").dim(),
    }
}

fn risk_style(level: RiskLevel) -> StyledObject<String> {
    let s = style(level.to_string()).bold();
    match level {
        RiskLevel::Critical => s.red(),
        RiskLevel::High => s.red(),
        RiskLevel::Medium => s.yellow(),
        RiskLevel::Low => s.green(),
    }
}

/// Render a run as formatted terminal output
pub fn render(run: &AnalysisRun) -> Result<String> {
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", style("SentinAL Deployment Risk Analysis").bold()));
    out.push_str(&format!("{}\n", style("──────────────────────────────────────").dim()));
    out.push_str(&format!(
        "Risk: {}  Score: {}/100  Artifacts: {}\n\n",
        risk_style(run.classification()),
        style(run.score()).bold(),
        run.artifacts().len()
    ));

    if run.nothing_analyzed() {
        out.push_str(&format!(
            "{}\n",
            style("No SQL, Terraform or YAML artifacts to analyze.").dim()
        ));
        return Ok(out);
    }

    let fs = run.findings_summary();
    out.push_str(&format!("{} ({} total)\n", style("FINDINGS").bold(), fs.total));
    let mut parts = Vec::new();
    for severity in Severity::ALL {
        let n = fs.count(severity);
        if n > 0 {
            parts.push(format!("{} {}", n, severity.to_string().to_lowercase()));
        }
    }
    if !parts.is_empty() {
        out.push_str(&format!("  {}\n", parts.join(" | ")));
    }
    out.push('\n');

    let mut ordered: Vec<&Finding> = run.findings().iter().collect();
    ordered.sort_by(|a, b| b.severity.cmp(&a.severity));
    for finding in ordered.iter().take(MAX_FINDINGS) {
        out.push_str(&format!(
            "  {}  {:<26} {}\n",
            severity_tag(finding.severity),
            finding.category,
            style(location(&finding.artifact, finding.line)).dim()
        ));
        out.push_str(&format!("       {}\n", finding.description));
        if let Some(rec) = &finding.recommendation {
            out.push_str(&format!("       {} {}\n", style("fix:").cyan(), rec));
        }
    }
    let remaining = ordered.len().saturating_sub(MAX_FINDINGS);
    if remaining > 0 {
        out.push_str(&format!(
            "\n  {}\n",
            style(format!("...and {} more (use --format json for all)", remaining)).dim()
        ));
    }

    let described: Vec<_> = run
        .entities()
        .iter()
        .map(|e| (e.artifact.as_str(), entity_groups(&e.entities)))
        .filter(|(_, groups)| !groups.is_empty())
        .collect();
    if !described.is_empty() {
        out.push_str(&format!("\n{}\n", style("ENTITIES").bold()));
        for (artifact, groups) in described {
            let parts: Vec<String> = groups
                .iter()
                .map(|(label, names)| format!("{}: {}", label, names.join(", ")))
                .collect();
            out.push_str(&format!("  {}  {}\n", artifact, parts.join(" | ")));
        }
    }

    if !run.dependencies().is_empty() {
        out.push_str(&format!("\n{}\n", style("DEPENDENCIES").bold()));
        for dep in run.dependencies() {
            out.push_str(&format!("  {}  {}\n", severity_tag(dep.severity), dep.description));
        }
    }

    if let Some(plan) = run.suggested_order() {
        out.push_str(&format!("\n{}\n", style("SUGGESTED ORDER").bold()));
        for (i, name) in plan.order.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, name));
        }
        out.push_str(&format!("  {}\n", style(&plan.rationale).dim()));
    }

    if let Some(memo) = run.report() {
        out.push_str(&format!("\n{}\n\n{}\n", style("MEMO").bold(), memo.trim_end()));
    }

    if run.total_cost_usd() > 0.0 {
        out.push_str(&format!(
            "\n{}\n",
            style(format!("Report cost: ${:.6}", run.total_cost_usd())).dim()
        ));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisRun;
    use crate::reporters::tests::test_run;

    #[test]
    fn test_text_render_sections() {
        let out = render(&test_run()).unwrap();
        assert!(out.contains("DROP_TABLE"));
        assert!(out.contains("Drops table (Line 1)"));
        assert!(out.contains("a.sql:1"));
        assert!(out.contains("2 critical"));
        assert!(out.contains("DEPENDENCIES"));
        assert!(out.contains("ENTITIES"));
        assert!(out.contains("a.sql  drops: users"));
        assert!(out.contains("b.sql  references: users"));
        assert!(out.contains("1. a.sql"));
        assert!(out.contains("# Defense Memo: a.sql, b.sql"));
    }

    #[test]
    fn test_text_nothing_analyzed() {
        let mut run = AnalysisRun::new(vec![]);
        run.mark_nothing_analyzed();
        run.finalize(0, RiskLevel::Low);
        let out = render(&run).unwrap();
        assert!(out.contains("No SQL, Terraform or YAML artifacts to analyze."));
        assert!(!out.contains("FINDINGS"));
    }
}
