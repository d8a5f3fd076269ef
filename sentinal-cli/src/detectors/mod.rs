//! Artifact detectors
//!
//! - `rules`: pattern rule engine over raw text, driven by a `RuleCatalog`
//! - `catalog`: the built-in rule tables
//! - `engine`: parallel per-artifact execution
//!
//! The structural parsers live in `crate::parsers` and plug in through the
//! same `Detector` trait.

pub mod base;
pub mod catalog;
pub mod engine;
pub mod rules;

pub use base::{DetectionSummary, Detector, DetectorOutput, DetectorResult};
pub use engine::{ArtifactAnalysis, DetectorEngine};
pub use rules::{Rule, RuleCatalog, RuleDetector, RuleError, RULES_DETECTOR};
