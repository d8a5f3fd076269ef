//! Base detector trait and types
//!
//! This module defines the core abstractions for artifact analysis:
//! - `Detector` trait that the rule engine and structural parsers implement
//! - `DetectorResult` for capturing one detector's run over one artifact
//! - `DetectionSummary` for per-run statistics

use crate::models::{Artifact, ArtifactKind, EntitySet, Finding};

/// What a detector produced for one artifact
#[derive(Debug, Clone, Default)]
pub struct DetectorOutput {
    pub findings: Vec<Finding>,
    /// Entities extracted from the artifact, if the detector extracts any
    pub entities: Option<EntitySet>,
}

impl DetectorOutput {
    pub fn findings(findings: Vec<Finding>) -> Self {
        Self {
            findings,
            entities: None,
        }
    }

    pub fn with_entities(findings: Vec<Finding>, entities: EntitySet) -> Self {
        Self {
            findings,
            entities: Some(entities),
        }
    }
}

/// Result from running a single detector over a single artifact
#[derive(Debug, Clone)]
pub struct DetectorResult {
    /// Name of the detector that produced these results
    pub detector_name: String,
    /// Artifact the detector ran on
    pub artifact: String,
    /// Findings produced by the detector
    pub findings: Vec<Finding>,
    pub entities: Option<EntitySet>,
    /// Execution time in milliseconds
    pub duration_ms: u64,
}

impl DetectorResult {
    pub fn new(detector_name: &str, artifact: &str, output: DetectorOutput, duration_ms: u64) -> Self {
        Self {
            detector_name: detector_name.to_string(),
            artifact: artifact.to_string(),
            findings: output.findings,
            entities: output.entities,
            duration_ms,
        }
    }
}

/// Trait for all artifact detectors
///
/// Detectors are total over their input: malformed content yields fewer
/// findings and entities, never an error or a panic. They hold no mutable
/// state, so one instance can run on many artifacts in parallel.
///
/// # Example Implementation
///
/// ```ignore
/// pub struct MyDetector;
///
/// impl Detector for MyDetector {
///     fn name(&self) -> &'static str {
///         "my_tool"
///     }
///
///     fn description(&self) -> &'static str {
///         "Detects my specific deployment hazard"
///     }
///
///     fn detect(&self, artifact: &Artifact) -> DetectorOutput {
///         DetectorOutput::default()
///     }
/// }
/// ```
pub trait Detector: Send + Sync {
    /// Detector id recorded on every finding it emits (e.g. `rules_tool`)
    fn name(&self) -> &'static str;

    /// Human-readable description of what this detector finds
    fn description(&self) -> &'static str;

    /// Whether the detector has anything to say about this kind.
    ///
    /// Default: every supported kind, never `Unknown`.
    fn applies_to(&self, kind: ArtifactKind) -> bool {
        kind.is_supported()
    }

    /// Analyze one artifact
    fn detect(&self, artifact: &Artifact) -> DetectorOutput;
}

/// Summary statistics from running all detectors over a batch
#[derive(Debug, Clone, Default)]
pub struct DetectionSummary {
    /// Detector invocations (detector × artifact)
    pub detector_runs: usize,
    /// Total findings across all detectors
    pub total_findings: usize,
    /// Summed detector time in milliseconds
    pub total_duration_ms: u64,
}

impl DetectionSummary {
    /// Update summary with a detector result
    pub fn add_result(&mut self, result: &DetectorResult) {
        self.detector_runs += 1;
        self.total_duration_ms += result.duration_ms;
        self.total_findings += result.findings.len();
    }
}
