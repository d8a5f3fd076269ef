//! Structural parsers for deployment artifacts
//!
//! Each parser is shallow: it extracts the entities the dependency stage
//! needs and flags structural hazards, and degrades to fewer results on
//! input it does not understand.

pub mod sql;
pub mod terraform;
pub mod yaml;

use crate::detectors::base::{Detector, DetectorOutput};
use crate::models::{Artifact, ArtifactKind, EntitySet, Finding};

/// Entities and structural findings for one artifact
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub entities: EntitySet,
    pub findings: Vec<Finding>,
}

/// Parse an artifact according to its kind. `Unknown` yields nothing.
///
/// SQL contributes tables, Terraform block addresses, YAML manifest kinds.
pub fn parse(artifact: &Artifact) -> ParseOutput {
    let (entities, findings) = match artifact.kind {
        ArtifactKind::Sql => sql::parse(&artifact.name, &artifact.content),
        ArtifactKind::Terraform => terraform::parse(&artifact.name, &artifact.content),
        ArtifactKind::Yaml => yaml::parse(&artifact.name, &artifact.content),
        ArtifactKind::Unknown => return ParseOutput::default(),
    };
    ParseOutput { entities, findings }
}

/// Structural parsers exposed as a detector
pub struct StructuralDetector;

impl Detector for StructuralDetector {
    fn name(&self) -> &'static str {
        "structural_parser"
    }

    fn description(&self) -> &'static str {
        "Extracts entities and structural hazards per artifact kind"
    }

    fn detect(&self, artifact: &Artifact) -> DetectorOutput {
        let output = parse(artifact);
        DetectorOutput::with_entities(output.findings, output.entities)
    }
}
