//! Detector execution engine with parallel support
//!
//! The DetectorEngine runs every registered detector over every artifact:
//! - One rayon task per artifact; detectors for that artifact run in
//!   registration order inside the task
//! - Tasks share nothing mutable; each returns its own `ArtifactAnalysis`
//! - Results come back in input order, whatever order tasks finished in
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    DetectorEngine                       │
//! ├─────────────────────────────────────────────────────────┤
//! │  1. Register detectors (rules, then structural parser)  │
//! │  2. Fan out one task per artifact (rayon)               │
//! │  3. Per task: run applicable detectors, merge entities  │
//! │  4. Join in input order and return                      │
//! └─────────────────────────────────────────────────────────┘
//! ```

use crate::detectors::base::{DetectionSummary, Detector, DetectorResult};
use crate::detectors::rules::{RuleCatalog, RuleDetector};
use crate::models::{Artifact, ArtifactKind, EntitySet, Finding};
use crate::parsers::StructuralDetector;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Combined output of all detectors for one artifact
#[derive(Debug, Clone, Default)]
pub struct ArtifactAnalysis {
    pub artifact: String,
    pub kind: ArtifactKind,
    pub findings: Vec<Finding>,
    pub entities: EntitySet,
    pub results: Vec<DetectorResult>,
}

/// Runs detectors over a batch of artifacts
pub struct DetectorEngine {
    detectors: Vec<Arc<dyn Detector>>,
    /// Number of worker threads for parallel execution
    workers: usize,
    /// `None` when the pool could not be built; runs are then sequential
    pool: Option<rayon::ThreadPool>,
}

impl DetectorEngine {
    /// Create a new detector engine
    ///
    /// # Arguments
    /// * `workers` - Number of worker threads (0 = auto-detect)
    pub fn new(workers: usize) -> Self {
        let actual_workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
                .min(16)
        } else {
            workers
        };

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(actual_workers)
            .thread_name(|i| format!("sentinal-worker-{}", i))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!("Failed to build worker pool ({}), analyzing sequentially", e);
                None
            }
        };

        Self {
            detectors: Vec::new(),
            workers: actual_workers,
            pool,
        }
    }

    /// Engine with the rule engine and the structural parsers registered
    pub fn with_defaults(workers: usize, catalog: Arc<RuleCatalog>) -> Self {
        let mut engine = Self::new(workers);
        engine.register(Arc::new(RuleDetector::new(catalog)));
        engine.register(Arc::new(StructuralDetector));
        engine
    }

    /// Register a detector; detectors run in registration order
    pub fn register(&mut self, detector: Arc<dyn Detector>) {
        self.detectors.push(detector);
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn detector_count(&self) -> usize {
        self.detectors.len()
    }

    /// Analyze every artifact. Output order matches input order.
    pub fn run(&self, artifacts: &[Artifact]) -> Vec<ArtifactAnalysis> {
        let start = Instant::now();
        info!(
            "Analyzing {} artifact(s) with {} detectors on {} workers",
            artifacts.len(),
            self.detectors.len(),
            self.workers
        );

        let analyses: Vec<ArtifactAnalysis> = match &self.pool {
            Some(pool) => pool.install(|| {
                artifacts
                    .par_iter()
                    .map(|artifact| self.analyze_artifact(artifact))
                    .collect()
            }),
            None => artifacts
                .iter()
                .map(|artifact| self.analyze_artifact(artifact))
                .collect(),
        };

        let mut summary = DetectionSummary::default();
        for result in analyses.iter().flat_map(|a| a.results.iter()) {
            summary.add_result(result);
        }
        debug!(
            "Detection finished: {} detector runs, {} findings, {}ms in detectors, {:?} wall",
            summary.detector_runs,
            summary.total_findings,
            summary.total_duration_ms,
            start.elapsed()
        );

        analyses
    }

    fn analyze_artifact(&self, artifact: &Artifact) -> ArtifactAnalysis {
        let mut analysis = ArtifactAnalysis {
            artifact: artifact.name.clone(),
            kind: artifact.kind,
            ..Default::default()
        };

        for detector in self
            .detectors
            .iter()
            .filter(|d| d.applies_to(artifact.kind))
        {
            let started = Instant::now();
            let output = detector.detect(artifact);
            let result = DetectorResult::new(
                detector.name(),
                &artifact.name,
                output,
                started.elapsed().as_millis() as u64,
            );

            debug!(
                "{} on {}: {} findings",
                result.detector_name,
                artifact.name,
                result.findings.len()
            );

            analysis.findings.extend(result.findings.iter().cloned());
            if let Some(entities) = &result.entities {
                analysis.entities.merge(entities);
            }
            analysis.results.push(result);
        }

        analysis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::base::DetectorOutput;
    use crate::models::Severity;

    struct CountingDetector;

    impl Detector for CountingDetector {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn description(&self) -> &'static str {
            "Reports one finding per artifact"
        }

        fn applies_to(&self, kind: ArtifactKind) -> bool {
            kind == ArtifactKind::Yaml
        }

        fn detect(&self, artifact: &Artifact) -> DetectorOutput {
            DetectorOutput::findings(vec![Finding::new(
                "counting",
                &artifact.name,
                None,
                Severity::Low,
                "COUNT",
                "counted",
            )])
        }
    }

    fn engine() -> DetectorEngine {
        DetectorEngine::with_defaults(2, Arc::new(RuleCatalog::builtin().unwrap()))
    }

    #[test]
    fn test_auto_workers() {
        let engine = DetectorEngine::new(0);
        assert!(engine.workers() >= 1 && engine.workers() <= 16);
    }

    #[test]
    fn test_results_in_input_order() {
        let artifacts: Vec<_> = (0..20)
            .map(|i| Artifact::new(format!("{i:02}.sql"), ArtifactKind::Sql, "DROP TABLE t;"))
            .collect();
        let analyses = engine().run(&artifacts);
        let names: Vec<_> = analyses.iter().map(|a| a.artifact.clone()).collect();
        let expected: Vec<_> = artifacts.iter().map(|a| a.name.clone()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_rules_then_parser_findings() {
        let artifacts = vec![Artifact::new("d.sql", ArtifactKind::Sql, "DELETE FROM users;")];
        let analyses = engine().run(&artifacts);
        let detectors: Vec<_> = analyses[0]
            .findings
            .iter()
            .map(|f| (f.detector.as_str(), f.category.as_str()))
            .collect();
        assert_eq!(
            detectors,
            vec![("rules_tool", "UNFILTERED_DELETE"), ("parser_tool", "UNFILTERED_DML")]
        );
        assert!(analyses[0].entities.tables_referenced.contains("users"));
    }

    /// Records every thread it runs on
    #[derive(Default)]
    struct ThreadRecorder {
        threads: std::sync::Mutex<Vec<(std::thread::ThreadId, Option<String>)>>,
    }

    impl Detector for ThreadRecorder {
        fn name(&self) -> &'static str {
            "thread_recorder"
        }

        fn description(&self) -> &'static str {
            "Records worker threads"
        }

        fn detect(&self, _artifact: &Artifact) -> DetectorOutput {
            let current = std::thread::current();
            self.threads
                .lock()
                .unwrap()
                .push((current.id(), current.name().map(str::to_string)));
            DetectorOutput::default()
        }
    }

    #[test]
    fn test_pool_reused_across_runs() {
        let recorder = Arc::new(ThreadRecorder::default());
        let mut engine = DetectorEngine::new(1);
        engine.register(recorder.clone());

        let artifacts = vec![Artifact::new("a.sql", ArtifactKind::Sql, "SELECT 1;")];
        engine.run(&artifacts);
        engine.run(&artifacts);

        let threads = recorder.threads.lock().unwrap().clone();
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].0, threads[1].0);
        assert_eq!(threads[0].1.as_deref(), Some("sentinal-worker-0"));
    }

    #[test]
    fn test_unknown_kind_skipped() {
        let artifacts = vec![Artifact::new("notes.txt", ArtifactKind::Unknown, "DROP TABLE x;")];
        let analyses = engine().run(&artifacts);
        assert!(analyses[0].findings.is_empty());
        assert!(analyses[0].results.is_empty());
    }

    #[test]
    fn test_custom_detector_applies_by_kind() {
        let mut engine = DetectorEngine::new(1);
        engine.register(Arc::new(CountingDetector));
        let artifacts = vec![
            Artifact::new("a.yaml", ArtifactKind::Yaml, "kind: Service"),
            Artifact::new("b.sql", ArtifactKind::Sql, "SELECT 1;"),
        ];
        let analyses = engine.run(&artifacts);
        assert_eq!(analyses[0].findings.len(), 1);
        assert!(analyses[1].findings.is_empty());
    }
}
