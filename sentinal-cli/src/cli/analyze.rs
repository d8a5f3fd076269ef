//! Analyze command: ingest, run the pipeline, render, gate

use super::{build_catalog, build_generator};
use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use sentinal::config::{LimitsConfig, ProjectConfig};
use sentinal::ingest::load_artifacts;
use sentinal::models::{AnalysisRun, Severity};
use sentinal::pipeline::Pipeline;
use sentinal::reporters;
use sentinal::scoring::should_block;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

pub(super) struct AnalyzeArgs {
    pub paths: Vec<PathBuf>,
    pub format: String,
    pub output: Option<PathBuf>,
    pub validate_order: bool,
    pub fail_on: Option<Severity>,
    pub report: bool,
    pub limits: LimitsConfig,
    pub workers: usize,
    pub config: ProjectConfig,
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .expect("valid template")
}

pub(super) fn run(args: AnalyzeArgs) -> Result<()> {
    let artifacts = load_artifacts(&args.paths, &args.limits).context("Failed to load artifacts")?;
    debug!("Loaded {} artifact(s)", artifacts.len());

    let mut pipeline = Pipeline::new(build_catalog(&args.config)?).with_workers(args.workers);
    if args.validate_order {
        pipeline = pipeline.with_execution_order(artifacts.iter().map(|a| a.name.clone()).collect());
    }
    if !args.report {
        pipeline = pipeline.without_report();
    } else if let Some(generator) = build_generator(&args.config.report) {
        pipeline = pipeline.with_generator(generator);
    }

    let mut run = pipeline.analyze(artifacts);
    write_report(&pipeline, &mut run);

    let rendered = reporters::report(&run, &args.format)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} Report written to {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
        None => println!("{}", rendered.trim_end()),
    }

    check_fail_threshold(args.fail_on, &run);
    Ok(())
}

/// Memo step, with a spinner while a remote generator works
fn write_report(pipeline: &Pipeline, run: &mut AnalysisRun) {
    if !pipeline.has_generator() {
        pipeline.report(run);
        return;
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style());
    spinner.set_message("Writing defense memo...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    pipeline.report(run);
    spinner.finish_and_clear();
}

/// Exit with code 1 when findings at or above the threshold exist
fn check_fail_threshold(fail_on: Option<Severity>, run: &AnalysisRun) {
    if let Some(threshold) = fail_on {
        if should_block(run, threshold) {
            let _ = std::io::stdout().flush();
            eprintln!("Failing due to --fail-on={} threshold", threshold.to_string().to_lowercase());
            std::process::exit(1);
        }
    }
}
