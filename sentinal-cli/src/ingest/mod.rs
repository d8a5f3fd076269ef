//! Artifact ingestion
//!
//! Turns paths on disk into [`Artifact`]s: walks directories (gitignore
//! aware), enforces the batch limits, decodes content and resolves each
//! artifact's kind.

use crate::config::LimitsConfig;
use crate::models::{Artifact, ArtifactKind};
use ignore::WalkBuilder;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

/// Extensions picked up when walking a directory
pub const KNOWN_EXTENSIONS: &[&str] = &["sql", "tf", "tfvars", "yaml", "yml"];

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Path not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Too many files: {count} (max {max})")]
    TooManyFiles { count: usize, max: usize },

    #[error("File too large: {} is {size} bytes (max {max})", path.display())]
    FileTooLarge { path: PathBuf, size: u64, max: u64 },
}

fn sql_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(SELECT|INSERT|UPDATE|DELETE|CREATE|DROP|ALTER)\b")
            .expect("valid regex")
    })
}

fn terraform_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(resource|provider|variable|output|module)\s+""#).expect("valid regex")
    })
}

fn yaml_key_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*\w+:\s*$").expect("valid regex"))
}

/// Resolve an artifact's kind from its name, then its content.
///
/// Extension wins. Without a known extension the content is sniffed for
/// SQL keywords, then Terraform block headers, then a bare `key:` line.
pub fn detect_kind(name: &str, content: &str) -> ArtifactKind {
    let lower = name.to_lowercase();
    if lower.ends_with(".sql") {
        return ArtifactKind::Sql;
    }
    if lower.ends_with(".tf") || lower.ends_with(".tfvars") {
        return ArtifactKind::Terraform;
    }
    if lower.ends_with(".yaml") || lower.ends_with(".yml") {
        return ArtifactKind::Yaml;
    }

    if sql_keyword().is_match(content) {
        ArtifactKind::Sql
    } else if terraform_block().is_match(content) {
        ArtifactKind::Terraform
    } else if yaml_key_line().is_match(content) {
        ArtifactKind::Yaml
    } else {
        ArtifactKind::Unknown
    }
}

/// Build an artifact from raw bytes; invalid UTF-8 is replaced, not rejected
pub fn artifact_from_bytes(name: impl Into<String>, bytes: &[u8]) -> Artifact {
    let name = name.into();
    let content = String::from_utf8_lossy(bytes).into_owned();
    let kind = detect_kind(&name, &content);
    let mut artifact = Artifact::new(name, kind, content);
    artifact.size_bytes = bytes.len();
    artifact
}

fn has_known_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| KNOWN_EXTENSIONS.iter().any(|k| k.eq_ignore_ascii_case(ext)))
}

/// Expand inputs into files.
///
/// Explicit files are always taken, in the order given. Directories
/// contribute their files with a known extension, sorted by path.
/// Duplicates keep their first position.
pub fn collect_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, IngestError> {
    let mut files: Vec<PathBuf> = Vec::new();

    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
            continue;
        }
        if !input.is_dir() {
            return Err(IngestError::NotFound { path: input.clone() });
        }

        let mut found = Vec::new();
        let walker = WalkBuilder::new(input)
            .hidden(true)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .require_git(false)
            .add_custom_ignore_filename(".sentinalignore")
            .build();
        for entry in walker.flatten() {
            let path = entry.path();
            if path.is_file() && has_known_extension(path) {
                found.push(path.to_path_buf());
            }
        }
        found.sort();
        debug!("Found {} artifacts under {}", found.len(), input.display());
        files.extend(found);
    }

    let mut seen = std::collections::HashSet::new();
    files.retain(|p| seen.insert(p.clone()));
    Ok(files)
}

/// Load artifacts from files and directories, enforcing `limits`
pub fn load_artifacts(inputs: &[PathBuf], limits: &LimitsConfig) -> Result<Vec<Artifact>, IngestError> {
    let paths = collect_paths(inputs)?;
    if paths.len() > limits.max_files {
        return Err(IngestError::TooManyFiles {
            count: paths.len(),
            max: limits.max_files,
        });
    }

    let mut artifacts = Vec::with_capacity(paths.len());
    for path in paths {
        let size = std::fs::metadata(&path)
            .map_err(|source| IngestError::Read {
                path: path.clone(),
                source,
            })?
            .len();
        if size > limits.max_file_size {
            return Err(IngestError::FileTooLarge {
                path,
                size,
                max: limits.max_file_size,
            });
        }

        let bytes = std::fs::read(&path).map_err(|source| IngestError::Read {
            path: path.clone(),
            source,
        })?;
        let artifact = artifact_from_bytes(path.display().to_string(), &bytes);
        debug!("Loaded {} ({}, {} bytes)", artifact.name, artifact.kind, artifact.size_bytes);
        artifacts.push(artifact);
    }

    Ok(artifacts)
}
