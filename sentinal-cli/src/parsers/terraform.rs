//! Shallow Terraform (HCL) scanner
//!
//! Walks the file once, tracking brace depth while skipping strings,
//! comments and heredocs, and records the header of every top-level block.
//! Only the block forms the analyzer cares about are kept.

use crate::models::{EntitySet, Finding, Severity};
use regex::Regex;
use std::sync::OnceLock;

pub const TERRAFORM_DETECTOR: &str = "terraform_parser_tool";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Resource,
    Data,
    Module,
    Provider,
}

/// A top-level block header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    /// Resource or data source type; `None` for modules and providers
    pub type_name: Option<String>,
    pub name: String,
    pub line: u32,
}

impl Block {
    /// Terraform-style address: `type.name`, `data.type.name`,
    /// `module.name` or `provider.name`
    pub fn address(&self) -> String {
        match (self.kind, &self.type_name) {
            (BlockKind::Resource, Some(t)) => format!("{}.{}", t, self.name),
            (BlockKind::Data, Some(t)) => format!("data.{}.{}", t, self.name),
            (BlockKind::Module, _) => format!("module.{}", self.name),
            (BlockKind::Provider, _) => format!("provider.{}", self.name),
            (_, None) => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TerraformAnalysis {
    pub blocks: Vec<Block>,
    /// A `lifecycle { ... }` block exists at any depth
    pub has_lifecycle: bool,
}

impl TerraformAnalysis {
    pub fn resources(&self) -> impl Iterator<Item = &Block> {
        self.of_kind(BlockKind::Resource)
    }

    pub fn of_kind(&self, kind: BlockKind) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(move |b| b.kind == kind)
    }

    /// Every block address as an entity set
    pub fn entities(&self) -> EntitySet {
        EntitySet {
            resources: self.blocks.iter().map(Block::address).collect(),
            ..Default::default()
        }
    }
}

static LABELED: OnceLock<Regex> = OnceLock::new();
static SINGLE: OnceLock<Regex> = OnceLock::new();
static HEREDOC: OnceLock<Regex> = OnceLock::new();

fn labeled_header() -> &'static Regex {
    LABELED.get_or_init(|| {
        Regex::new(r#"^(resource|data)\s+"([^"]*)"\s+"([^"]*)"$"#).expect("static HCL pattern")
    })
}

fn single_header() -> &'static Regex {
    SINGLE.get_or_init(|| {
        Regex::new(r#"^(module|provider)\s+"([^"]*)"$"#).expect("static HCL pattern")
    })
}

fn heredoc_marker() -> &'static Regex {
    HEREDOC.get_or_init(|| Regex::new(r"^<<-?([A-Za-z_][A-Za-z0-9_]*)").expect("static HCL pattern"))
}

fn header_block(header: &str, line: u32) -> Option<Block> {
    let header = header.trim();
    if let Some(caps) = labeled_header().captures(header) {
        let kind = if &caps[1] == "resource" {
            BlockKind::Resource
        } else {
            BlockKind::Data
        };
        return Some(Block {
            kind,
            type_name: Some(caps[2].to_string()),
            name: caps[3].to_string(),
            line,
        });
    }
    single_header().captures(header).map(|caps| Block {
        kind: if &caps[1] == "module" {
            BlockKind::Module
        } else {
            BlockKind::Provider
        },
        type_name: None,
        name: caps[2].to_string(),
        line,
    })
}

/// Scan HCL text for block headers and lifecycle blocks
pub fn analyze(content: &str) -> TerraformAnalysis {
    let mut analysis = TerraformAnalysis::default();
    let chars: Vec<char> = content.chars().collect();

    let mut depth: usize = 0;
    let mut header = String::new();
    let mut header_line: u32 = 1;
    let mut line: u32 = 1;
    let mut pending_heredoc: Option<String> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '\n' => {
                line += 1;
                header.clear();
                i += 1;
                if let Some(tag) = pending_heredoc.take() {
                    // Skip body lines up to and including the terminator
                    while i < chars.len() {
                        let end = chars[i..]
                            .iter()
                            .position(|&ch| ch == '\n')
                            .map(|p| i + p)
                            .unwrap_or(chars.len());
                        let body_line: String = chars[i..end].iter().collect();
                        i = end + 1;
                        line += 1;
                        if body_line.trim() == tag {
                            break;
                        }
                    }
                }
                continue;
            }
            '#' => {
                i = skip_to_eol(&chars, i);
                continue;
            }
            '/' if next == Some('/') => {
                i = skip_to_eol(&chars, i);
                continue;
            }
            '/' if next == Some('*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    if chars[i] == '\n' {
                        line += 1;
                    }
                    i += 1;
                }
                i += 2;
                continue;
            }
            '"' => {
                let end = skip_string(&chars, i, &mut line);
                header.extend(&chars[i..end.min(chars.len())]);
                i = end;
                continue;
            }
            '<' if next == Some('<') => {
                let rest: String = chars[i..chars.len().min(i + 128)].iter().collect();
                if let Some(caps) = heredoc_marker().captures(&rest) {
                    pending_heredoc = Some(caps[1].to_string());
                    i += caps[0].chars().count();
                    continue;
                }
                header.push(c);
            }
            '{' => {
                let trimmed = header.trim();
                if trimmed == "lifecycle" {
                    analysis.has_lifecycle = true;
                }
                if depth == 0 {
                    if let Some(block) = header_block(trimmed, header_line) {
                        analysis.blocks.push(block);
                    }
                }
                depth += 1;
                header.clear();
            }
            '}' => {
                depth = depth.saturating_sub(1);
                header.clear();
            }
            _ => {
                if header.trim().is_empty() && !c.is_whitespace() {
                    header_line = line;
                }
                header.push(c);
            }
        }
        i += 1;
    }

    analysis
}

fn skip_to_eol(chars: &[char], i: usize) -> usize {
    chars[i..]
        .iter()
        .position(|&c| c == '\n')
        .map(|p| i + p)
        .unwrap_or(chars.len())
}

/// Index just past the string starting at `start`. Interpolations
/// (`${...}`) are skipped by brace counting.
fn skip_string(chars: &[char], start: usize, line: &mut u32) -> usize {
    let mut i = start + 1;
    let mut interp: usize = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '\n' => *line += 1,
            '$' if chars.get(i + 1) == Some(&'{') => {
                interp += 1;
                i += 1;
            }
            '}' if interp > 0 => interp -= 1,
            '"' if interp == 0 => return i + 1,
            _ => {}
        }
        i += 1;
    }
    chars.len()
}

/// Entities and structural findings for a Terraform artifact
pub fn parse(artifact: &str, content: &str) -> (EntitySet, Vec<Finding>) {
    let analysis = analyze(content);
    let mut findings = Vec::new();

    let resources: Vec<&Block> = analysis.resources().collect();
    if let (Some(first), false) = (resources.first(), analysis.has_lifecycle) {
        let addresses: Vec<String> = resources.iter().map(|b| b.address()).collect();
        findings.push(
            Finding::new(
                TERRAFORM_DETECTOR,
                artifact,
                Some(first.line),
                Severity::Medium,
                "MISSING_LIFECYCLE",
                "No lifecycle blocks found, consider prevent_destroy for critical resources",
            )
            .with_reasoning(format!(
                "Declared without any lifecycle block: {}",
                addresses.join(", ")
            ))
            .with_recommendation("Add lifecycle { prevent_destroy = true } to critical resources"),
        );
    }

    (analysis.entities(), findings)
}
