//! CLI command definitions and handlers

mod analyze;
mod init;
mod order;
mod rules;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sentinal::ai::{AiClient, AiConfig, LlmBackend, LlmReportGenerator, ReportGenerator};
use sentinal::config::{load_config_file, load_project_config, LimitsConfig, ProjectConfig, ReportConfig};
use sentinal::detectors::RuleCatalog;
use sentinal::models::Severity;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// SentinAL - deployment risk analysis for SQL, Terraform and Kubernetes YAML
#[derive(Parser, Debug)]
#[command(name = "sentinal")]
#[command(
    version,
    about = "Deterministic risk analysis for SQL migrations, Terraform and Kubernetes manifests",
    after_help = "\
Examples:
  sentinal analyze migrations/                   Analyze every artifact in a directory
  sentinal analyze a.sql b.sql --validate-order  Also check that a.sql can run before b.sql
  sentinal analyze deploy/ --format json         JSON output for scripting
  sentinal analyze deploy/ --fail-on high        Exit code 1 on high+ findings (CI mode)
  sentinal order 001.sql 002.sql 003.sql         Check and suggest an execution order
  sentinal rules --kind sql                      List the SQL rules"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel workers (1-64, default: auto)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Config file (default: sentinal.toml or .sentinalrc.json in the working directory)
    #[arg(long, global = true, env = "SENTINAL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze deployment artifacts and write a risk report
    Analyze {
        /// Files or directories to analyze
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format: text, json, markdown (or md)
        #[arg(long, short = 'f', value_parser = ["text", "json", "markdown", "md"])]
        format: Option<String>,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Treat the order of the inputs as the intended execution order and
        /// report violations
        #[arg(long)]
        validate_order: bool,

        /// Exit with code 1 if findings at this severity or higher exist
        #[arg(long, value_parser = ["critical", "high", "medium", "low", "info"])]
        fail_on: Option<String>,

        /// Skip the defense memo
        #[arg(long)]
        no_report: bool,

        /// Maximum number of artifacts
        #[arg(long, env = "SENTINAL_MAX_FILES")]
        max_files: Option<usize>,

        /// Maximum artifact size in bytes
        #[arg(long, env = "SENTINAL_MAX_FILE_SIZE")]
        max_file_size: Option<u64>,
    },

    /// Check an execution order and suggest one
    ///
    /// Inputs are taken in the order given. Exits with code 1 when that
    /// order has violations.
    Order {
        /// Files in intended execution order (directories expand sorted)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format: text or json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// List the rule catalog (after config adjustments)
    Rules {
        /// Only rules for this kind: sql, terraform, yaml
        #[arg(long)]
        kind: Option<String>,
    },

    /// Write an example sentinal.toml
    Init {
        /// Directory to write into
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { path, force } => init::run(&path, force),

        Commands::Rules { kind } => {
            let config = load_config(cli.config.as_deref())?;
            rules::run(&config, kind.as_deref())
        }

        Commands::Order { paths, format } => {
            let config = load_config(cli.config.as_deref())?;
            let workers = effective_workers(cli.workers, &config);
            order::run(&paths, &format, &config, workers)
        }

        Commands::Analyze {
            paths,
            format,
            output,
            validate_order,
            fail_on,
            no_report,
            max_files,
            max_file_size,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let workers = effective_workers(cli.workers, &config);
            let limits = LimitsConfig {
                max_files: max_files.unwrap_or(config.limits.max_files),
                max_file_size: max_file_size.unwrap_or(config.limits.max_file_size),
            };
            let format = format
                .or_else(|| config.defaults.format.clone())
                .unwrap_or_else(|| "text".to_string());
            let fail_on = fail_on
                .or_else(|| config.defaults.fail_on.clone())
                .map(|s| parse_severity(&s))
                .transpose()?;

            analyze::run(analyze::AnalyzeArgs {
                paths,
                format,
                output,
                validate_order,
                fail_on,
                report: !no_report && config.report.enabled,
                limits,
                workers,
                config,
            })
        }
    }
}

/// Explicit `--config` must load; the implicit lookup falls back to defaults
fn load_config(explicit: Option<&Path>) -> Result<ProjectConfig> {
    match explicit {
        Some(path) => load_config_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("Failed to read working directory")?;
            Ok(load_project_config(&cwd))
        }
    }
}

fn effective_workers(flag: Option<usize>, config: &ProjectConfig) -> usize {
    flag.or(config.defaults.workers).unwrap_or(0)
}

fn parse_severity(s: &str) -> Result<Severity> {
    s.parse::<Severity>()
        .map_err(|e| anyhow::anyhow!("Invalid severity '{}': {}", s, e))
}

pub(crate) fn build_catalog(config: &ProjectConfig) -> Result<Arc<RuleCatalog>> {
    let catalog = RuleCatalog::from_config(&config.rules).context("Invalid rule configuration")?;
    debug!("Rule catalog: {} rules", catalog.len());
    Ok(Arc::new(catalog))
}

/// LLM generator from `[report]`, or None to use the fallback memo.
///
/// A backend that cannot be set up (unknown name, missing key) is logged
/// and skipped rather than failing the run.
pub(crate) fn build_generator(report: &ReportConfig) -> Option<Box<dyn ReportGenerator>> {
    let backend: LlmBackend = match report.backend.as_deref()?.parse() {
        Ok(backend) => backend,
        Err(e) => {
            warn!("{}; using the fallback memo", e);
            return None;
        }
    };
    let ai_config = AiConfig {
        backend,
        model: report.model.clone(),
        max_tokens: report.max_tokens,
        temperature: report.temperature,
        timeout: Duration::from_secs(report.timeout_secs),
    };
    match AiClient::from_env(ai_config) {
        Ok(client) => Some(Box::new(
            LlmReportGenerator::new(client)
                .with_pricing(report.cost_per_1m_input_tokens, report.cost_per_1m_output_tokens),
        )),
        Err(e) => {
            warn!("{}; using the fallback memo", e);
            None
        }
    }
}
