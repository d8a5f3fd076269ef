//! Execution order validation and suggestion

use crate::models::{ArtifactEntities, Dependency, DependencyKind, EntitySet, ExecutionPlan, Severity};
use std::collections::{BTreeSet, HashMap};

fn lookup(entities: &[ArtifactEntities]) -> HashMap<&str, &EntitySet> {
    let mut map = HashMap::with_capacity(entities.len());
    for e in entities {
        map.entry(e.artifact.as_str()).or_insert(&e.entities);
    }
    map
}

/// Check a proposed execution order by simulating it.
///
/// Walks `order` keeping the set of tables that exist so far. When an
/// artifact needs a table that does not exist yet and a later artifact
/// creates it, one violation is reported against the first such creator.
/// After each artifact its created tables are added, then its dropped
/// tables removed. Names with no entities count as empty.
pub fn validate_order(order: &[String], entities: &[ArtifactEntities]) -> Vec<Dependency> {
    let by_name = lookup(entities);
    let empty = EntitySet::default();
    let resolved: Vec<&EntitySet> = order
        .iter()
        .map(|name| by_name.get(name.as_str()).copied().unwrap_or(&empty))
        .collect();

    let mut existing: BTreeSet<String> = BTreeSet::new();
    let mut violations = Vec::new();

    for (i, name) in order.iter().enumerate() {
        let current = resolved[i];

        for table in current.required_tables() {
            if existing.contains(&table) {
                continue;
            }
            let later_creator = order
                .iter()
                .enumerate()
                .skip(i + 1)
                .find(|(j, _)| resolved[*j].tables_created.contains(&table));

            if let Some((j, creator)) = later_creator {
                violations.push(Dependency {
                    source: name.clone(),
                    target: creator.clone(),
                    kind: DependencyKind::OrderViolation,
                    severity: Severity::High,
                    description: format!(
                        "'{}' (position {}) references table '{}' created later in '{}' (position {})",
                        name,
                        i + 1,
                        table,
                        creator,
                        j + 1
                    ),
                    table,
                });
            }
        }

        existing.extend(current.tables_created.iter().cloned());
        for dropped in &current.tables_dropped {
            existing.remove(dropped);
        }
    }

    violations
}

/// Suggest an execution order by bucketing artifacts.
///
/// Creators (create tables, reference none) run first, then mixed
/// artifacts, then reference-only ones; input order is kept within each
/// bucket. This is a heuristic, not a topological sort, so artifacts in
/// the mixed bucket that depend on each other may still come out in the
/// wrong order. `cycles` lists groups known to depend on each other and is
/// mentioned in the rationale.
pub fn suggest_order(entities: &[ArtifactEntities], cycles: &[Vec<String>]) -> ExecutionPlan {
    let mut creators = Vec::new();
    let mut mixed = Vec::new();
    let mut readers = Vec::new();

    for e in entities {
        let creates = !e.entities.tables_created.is_empty();
        let references = !e.entities.tables_referenced.is_empty();
        match (creates, references) {
            (true, false) => creators.push(e.artifact.clone()),
            (false, true) => readers.push(e.artifact.clone()),
            _ => mixed.push(e.artifact.clone()),
        }
    }

    let mut rationale = format!(
        "Suggested order prioritizes table creation ({} files), then mixed operations ({} files), then reference-only operations ({} files)",
        creators.len(),
        mixed.len(),
        readers.len()
    );
    for group in cycles {
        rationale.push_str(&format!(
            ". Artifacts {} need tables from each other, so no order satisfies all of them",
            group
                .iter()
                .map(|a| format!("'{}'", a))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    let mut order = creators;
    order.extend(mixed);
    order.extend(readers);

    ExecutionPlan { order, rationale }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::entities;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_order_violation_first_later_creator() {
        let batch = vec![
            entities("query.sql", &[], &[], &["users"]),
            entities("create1.sql", &["users"], &[], &[]),
            entities("create2.sql", &["users"], &[], &[]),
        ];
        let order = names(&["query.sql", "create1.sql", "create2.sql"]);
        let violations = validate_order(&order, &batch);
        assert_eq!(violations.len(), 1);
        let v = &violations[0];
        assert_eq!(v.kind, DependencyKind::OrderViolation);
        assert_eq!(v.severity, Severity::High);
        assert_eq!(v.target, "create1.sql");
        assert_eq!(
            v.description,
            "'query.sql' (position 1) references table 'users' created later in 'create1.sql' (position 2)"
        );
    }

    #[test]
    fn test_correct_order_is_clean() {
        let batch = vec![
            entities("create.sql", &["users"], &[], &[]),
            entities("query.sql", &[], &[], &["users"]),
        ];
        let order = names(&["create.sql", "query.sql"]);
        assert!(validate_order(&order, &batch).is_empty());
    }

    #[test]
    fn test_drop_then_recreate_later_is_violation() {
        let batch = vec![
            entities("create.sql", &["users"], &[], &[]),
            entities("drop.sql", &[], &["users"], &[]),
            entities("query.sql", &[], &[], &["users"]),
            entities("recreate.sql", &["users"], &[], &[]),
        ];
        let order = names(&["create.sql", "drop.sql", "query.sql", "recreate.sql"]);
        let violations = validate_order(&order, &batch);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].source, "query.sql");
        assert_eq!(violations[0].target, "recreate.sql");
    }

    #[test]
    fn test_unknown_names_are_empty() {
        let batch = vec![entities("create.sql", &["users"], &[], &[])];
        let order = names(&["ghost.sql", "create.sql"]);
        assert!(validate_order(&order, &batch).is_empty());
    }

    #[test]
    fn test_missing_table_never_created_is_not_violation() {
        let batch = vec![entities("query.sql", &[], &[], &["external"])];
        let order = names(&["query.sql"]);
        assert!(validate_order(&order, &batch).is_empty());
    }

    #[test]
    fn test_suggest_order_buckets() {
        let batch = vec![
            entities("reader.sql", &[], &[], &["users"]),
            entities("noop.sql", &[], &[], &[]),
            entities("creator.sql", &["users"], &[], &[]),
            entities("both.sql", &["orders"], &[], &["users"]),
        ];
        let plan = suggest_order(&batch, &[]);
        assert_eq!(
            plan.order,
            names(&["creator.sql", "noop.sql", "both.sql", "reader.sql"])
        );
        assert_eq!(
            plan.rationale,
            "Suggested order prioritizes table creation (1 files), then mixed operations (2 files), then reference-only operations (1 files)"
        );
    }

    #[test]
    fn test_suggest_order_independent_of_input_order() {
        let forward = vec![
            entities("creator.sql", &["users"], &[], &[]),
            entities("reader.sql", &[], &[], &["users"]),
        ];
        let reversed: Vec<_> = forward.iter().rev().cloned().collect();
        assert_eq!(suggest_order(&forward, &[]).order, suggest_order(&reversed, &[]).order);
    }

    #[test]
    fn test_suggest_order_notes_cycles() {
        let batch = vec![
            entities("a.sql", &["a_t"], &[], &["b_t"]),
            entities("b.sql", &["b_t"], &[], &["a_t"]),
        ];
        let cycles = vec![names(&["a.sql", "b.sql"])];
        let plan = suggest_order(&batch, &cycles);
        assert!(plan.rationale.contains("'a.sql', 'b.sql' need tables from each other"));
    }
}
