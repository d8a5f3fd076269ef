//! Analysis pipeline
//!
//! Orchestrates one run over a batch of artifacts:
//! 1. Run the rule engine and structural parser on every artifact (parallel)
//! 2. Merge findings and entities in input order
//! 3. Cross-artifact dependency analysis (two or more supported artifacts)
//! 4. Score and classify
//! 5. Hand the finalized run to the report generator, or the fallback memo

use crate::ai::{fallback_memo, ReportGenerator, ReportRequest};
use crate::detectors::{DetectorEngine, RuleCatalog};
use crate::graph::{build_graph, dependency_finding, detect_dependencies, suggest_order, validate_order};
use crate::models::{AnalysisRun, Artifact, ArtifactEntities, Dependency, ReportSource};
use crate::scoring;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Full analysis pipeline.
pub struct Pipeline {
    catalog: Arc<RuleCatalog>,
    /// Worker threads for per-artifact analysis (0 = auto)
    workers: usize,
    generator: Option<Box<dyn ReportGenerator>>,
    report_enabled: bool,
    /// Intended execution order to check, by artifact name
    execution_order: Option<Vec<String>>,
    /// Built on first use, then reused by every run
    engine: OnceLock<DetectorEngine>,
}

impl Pipeline {
    pub fn new(catalog: Arc<RuleCatalog>) -> Self {
        Self {
            catalog,
            workers: 0,
            generator: None,
            report_enabled: true,
            execution_order: None,
            engine: OnceLock::new(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self.engine = OnceLock::new();
        self
    }

    /// Use an external generator for the memo.
    pub fn with_generator(mut self, generator: Box<dyn ReportGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Skip the memo entirely.
    pub fn without_report(mut self) -> Self {
        self.report_enabled = false;
        self
    }

    /// Check this execution order for violations.
    pub fn with_execution_order(mut self, order: Vec<String>) -> Self {
        self.execution_order = Some(order);
        self
    }

    fn engine(&self) -> &DetectorEngine {
        self.engine
            .get_or_init(|| DetectorEngine::with_defaults(self.workers, Arc::clone(&self.catalog)))
    }

    pub fn has_generator(&self) -> bool {
        self.report_enabled && self.generator.is_some()
    }

    /// Analyze and report.
    pub fn run(&self, artifacts: Vec<Artifact>) -> AnalysisRun {
        let mut run = self.analyze(artifacts);
        self.report(&mut run);
        run
    }

    /// Everything up to and including scoring; the run comes back
    /// finalized but without a report.
    pub fn analyze(&self, artifacts: Vec<Artifact>) -> AnalysisRun {
        let start = Instant::now();
        let analyses = self.engine().run(&artifacts);
        let mut run = AnalysisRun::new(artifacts);

        let supported: Vec<ArtifactEntities> = analyses
            .iter()
            .filter(|a| a.kind.is_supported())
            .map(|a| ArtifactEntities::new(a.artifact.clone(), a.entities.clone()))
            .collect();

        for analysis in analyses {
            run.extend_findings(analysis.findings);
        }

        if supported.is_empty() {
            debug!("No artifact of a supported kind, nothing analyzed");
            run.mark_nothing_analyzed();
        } else if supported.len() >= 2 {
            self.analyze_dependencies(&mut run, &supported);
        }
        run.set_entities(supported);

        let score = scoring::score(run.findings());
        run.finalize(score, scoring::classify(score));

        info!(
            "Analyzed {} artifact(s): {} findings, {} dependencies, score {} ({}) in {:?}",
            run.artifacts().len(),
            run.findings().len(),
            run.dependencies().len(),
            run.score(),
            run.classification(),
            start.elapsed()
        );
        run
    }

    fn analyze_dependencies(&self, run: &mut AnalysisRun, entities: &[ArtifactEntities]) {
        let mut dependencies = detect_dependencies(entities);
        if let Some(order) = &self.execution_order {
            dependencies.extend(validate_order(order, entities));
        }

        for dependency in dependencies {
            record_dependency(run, dependency);
        }

        let cycles = build_graph(entities).cycles();
        if !cycles.is_empty() {
            debug!("{} dependency cycle(s) between artifacts", cycles.len());
        }
        run.set_suggested_order(suggest_order(entities, &cycles));
    }

    /// Attach the memo to a finalized run.
    ///
    /// Generator errors are logged and replaced by the fallback memo.
    pub fn report(&self, run: &mut AnalysisRun) {
        if !self.report_enabled {
            return;
        }

        let request = ReportRequest::from_run(run);
        let Some(generator) = &self.generator else {
            run.set_report(fallback_memo(&request), ReportSource::Fallback);
            return;
        };

        match generator.generate(&request) {
            Ok(report) => {
                run.add_cost(report.cost_usd);
                run.set_report(report.text, ReportSource::Generated);
            }
            Err(e) => {
                warn!("Report generation via {} failed, using fallback memo: {}", generator.name(), e);
                run.set_report(fallback_memo(&request), ReportSource::Fallback);
            }
        }
    }
}

fn record_dependency(run: &mut AnalysisRun, dependency: Dependency) {
    run.push_finding(dependency_finding(&dependency));
    run.push_dependency(dependency);
}
