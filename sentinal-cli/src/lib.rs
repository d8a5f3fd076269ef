//! SentinAL - deployment risk analysis
//!
//! Deterministic checks for SQL migrations, Terraform and Kubernetes YAML:
//! pattern rules, shallow structural parsing, cross-file dependency
//! analysis and a capped severity score. A report generator (an LLM, or a
//! fixed template) turns the results into a defense memo.
//!
//! ```rust,ignore
//! use sentinal::detectors::RuleCatalog;
//! use sentinal::models::{Artifact, ArtifactKind};
//! use sentinal::pipeline::Pipeline;
//! use std::sync::Arc;
//!
//! let pipeline = Pipeline::new(Arc::new(RuleCatalog::builtin()?));
//! let run = pipeline.run(vec![Artifact::new("m.sql", ArtifactKind::Sql, "DROP TABLE users;")]);
//! assert_eq!(run.score(), 40);
//! ```

pub mod ai;
pub mod config;
pub mod detectors;
pub mod graph;
pub mod ingest;
pub mod models;
pub mod parsers;
pub mod pipeline;
pub mod reporters;
pub mod scoring;
