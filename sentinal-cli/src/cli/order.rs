//! Order command: check the given execution order and suggest one

use super::build_catalog;
use anyhow::{Context, Result};
use console::style;
use sentinal::config::ProjectConfig;
use sentinal::ingest::load_artifacts;
use sentinal::models::{Dependency, DependencyKind};
use sentinal::pipeline::Pipeline;
use std::path::PathBuf;

pub(super) fn run(paths: &[PathBuf], format: &str, config: &ProjectConfig, workers: usize) -> Result<()> {
    let artifacts = load_artifacts(paths, &config.limits).context("Failed to load artifacts")?;
    let order: Vec<String> = artifacts.iter().map(|a| a.name.clone()).collect();

    let run = Pipeline::new(build_catalog(config)?)
        .with_workers(workers)
        .with_execution_order(order.clone())
        .without_report()
        .analyze(artifacts);

    let violations: Vec<&Dependency> = run
        .dependencies()
        .iter()
        .filter(|d| d.kind == DependencyKind::OrderViolation)
        .collect();

    if format == "json" {
        let out = serde_json::json!({
            "given_order": order,
            "suggested_order": run.suggested_order(),
            "violations": violations,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_text(&order, &violations, &run);
    }

    if !violations.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_text(order: &[String], violations: &[&Dependency], run: &sentinal::models::AnalysisRun) {
    let Some(plan) = run.suggested_order() else {
        println!(
            "{}",
            style("Fewer than two SQL, Terraform or YAML artifacts; nothing to order.").dim()
        );
        return;
    };

    println!("\n{}", style("GIVEN ORDER").bold());
    for (i, name) in order.iter().enumerate() {
        println!("  {}. {}", i + 1, name);
    }

    if violations.is_empty() {
        println!("\n{} No execution order violations", style("✓").green());
    } else {
        println!("\n{} ({})", style("VIOLATIONS").bold().red(), violations.len());
        for v in violations {
            println!("  {} {}", style("✗").red(), v.description);
        }
    }

    println!("\n{}", style("SUGGESTED ORDER").bold());
    for (i, name) in plan.order.iter().enumerate() {
        println!("  {}. {}", i + 1, name);
    }
    println!("  {}", style(&plan.rationale).dim());
}
