//! Cross-artifact dependency graph
//!
//! Each artifact *requires* the tables it references, alters or truncates.
//! Matching those requirements against what other artifacts create or drop
//! yields creation dependencies and drop conflicts. The creation edges are
//! also kept as a petgraph `DiGraph` so cycles between artifacts can be
//! found with Tarjan's SCC algorithm.
//!
//! Iteration is deterministic: artifacts in input order, tables in sorted
//! order.

mod order;

pub use order::{suggest_order, validate_order};

use crate::models::{ArtifactEntities, Dependency, DependencyKind, Finding, Severity};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::BTreeSet;
use tracing::debug;

/// Detector id recorded on findings mirrored from dependencies
pub const DEPENDENCY_DETECTOR: &str = "dependency_tool";

/// Requires-graph over a batch of artifacts
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    artifacts: Vec<String>,
    requires: Vec<BTreeSet<String>>,
    /// Creation edges: requiring artifact → creating artifact, labelled
    /// with the table
    graph: DiGraph<usize, String>,
    nodes: Vec<NodeIndex>,
}

impl DependencyGraph {
    pub fn artifacts(&self) -> &[String] {
        &self.artifacts
    }

    /// Tables an artifact needs to exist before it runs
    pub fn requires(&self, artifact: &str) -> Option<&BTreeSet<String>> {
        self.artifacts
            .iter()
            .position(|a| a == artifact)
            .map(|i| &self.requires[i])
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Creation edges as (requiring artifact, table, creating artifact)
    pub fn edges(&self) -> Vec<(&str, &str, &str)> {
        self.graph
            .edge_indices()
            .filter_map(|e| {
                let (from, to) = self.graph.edge_endpoints(e)?;
                Some((
                    self.artifacts[self.graph[from]].as_str(),
                    self.graph[e].as_str(),
                    self.artifacts[self.graph[to]].as_str(),
                ))
            })
            .collect()
    }

    /// Groups of artifacts that need tables from each other.
    ///
    /// Each group lists its members in input order; groups are ordered by
    /// their first member.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut groups: Vec<Vec<usize>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut members: Vec<usize> = scc.into_iter().map(|n| self.graph[n]).collect();
                members.sort_unstable();
                members
            })
            .collect();
        groups.sort();
        groups
            .into_iter()
            .map(|g| g.into_iter().map(|i| self.artifacts[i].clone()).collect())
            .collect()
    }

    fn node(&self, index: usize) -> NodeIndex {
        self.nodes[index]
    }
}

/// Build the requires-graph: requires(A) = referenced ∪ altered ∪ truncated
pub fn build_graph(entities: &[ArtifactEntities]) -> DependencyGraph {
    let mut graph = DependencyGraph {
        artifacts: entities.iter().map(|e| e.artifact.clone()).collect(),
        requires: entities.iter().map(|e| e.entities.required_tables()).collect(),
        graph: DiGraph::new(),
        nodes: Vec::with_capacity(entities.len()),
    };

    for index in 0..entities.len() {
        let node = graph.graph.add_node(index);
        graph.nodes.push(node);
    }

    for (a, required) in graph.requires.clone().iter().enumerate() {
        for table in required {
            for (b, other) in entities.iter().enumerate() {
                if a != b && other.entities.tables_created.contains(table) {
                    let (from, to) = (graph.node(a), graph.node(b));
                    graph.graph.add_edge(from, to, table.clone());
                }
            }
        }
    }

    debug!(
        "Dependency graph: {} artifacts, {} creation edges",
        graph.artifacts.len(),
        graph.edge_count()
    );
    graph
}

/// Creation dependencies and drop conflicts between artifacts.
///
/// Order-agnostic: a conflict is reported whether the dropping artifact
/// runs before or after the one that needs the table.
pub fn detect_dependencies(entities: &[ArtifactEntities]) -> Vec<Dependency> {
    let graph = build_graph(entities);
    let mut dependencies = Vec::new();

    for (a, source) in entities.iter().enumerate() {
        for table in &graph.requires[a] {
            for (b, target) in entities.iter().enumerate() {
                if a == b {
                    continue;
                }
                if target.entities.tables_created.contains(table) {
                    dependencies.push(Dependency {
                        source: source.artifact.clone(),
                        target: target.artifact.clone(),
                        kind: DependencyKind::CreationDependency,
                        severity: Severity::Info,
                        table: table.clone(),
                        description: format!(
                            "'{}' depends on table '{}' created in '{}'",
                            source.artifact, table, target.artifact
                        ),
                    });
                }
                if target.entities.tables_dropped.contains(table) {
                    dependencies.push(Dependency {
                        source: source.artifact.clone(),
                        target: target.artifact.clone(),
                        kind: DependencyKind::DropConflict,
                        severity: Severity::Critical,
                        table: table.clone(),
                        description: format!(
                            "CONFLICT: '{}' references table '{}' but '{}' drops it",
                            source.artifact, table, target.artifact
                        ),
                    });
                }
            }
        }
    }

    dependencies
}

/// Mirror a dependency into a finding on its source artifact
pub fn dependency_finding(dependency: &Dependency) -> Finding {
    let finding = Finding::new(
        DEPENDENCY_DETECTOR,
        &dependency.source,
        None,
        dependency.severity,
        dependency.kind.as_str(),
        dependency.description.clone(),
    )
    .with_reasoning(format!(
        "Table '{}' links '{}' to '{}'",
        dependency.table, dependency.source, dependency.target
    ));

    match dependency.kind {
        DependencyKind::CreationDependency => finding,
        DependencyKind::DropConflict => finding.with_recommendation(format!(
            "Make sure '{}' no longer needs '{}' before '{}' drops it",
            dependency.source, dependency.table, dependency.target
        )),
        DependencyKind::OrderViolation => finding.with_recommendation(format!(
            "Run '{}' before '{}'",
            dependency.target, dependency.source
        )),
    }
}
