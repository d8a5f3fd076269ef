//! Built-in rule tables
//!
//! One ordered table per artifact kind. Order is significant: findings for
//! a piece of content are emitted rule by rule, in table order.

use crate::models::{ArtifactKind, Severity};

/// Static definition of a pattern rule
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    pub category: &'static str,
    pub severity: Severity,
    pub pattern: &'static str,
    pub description: &'static str,
    pub recommendation: &'static str,
}

const fn rule(
    category: &'static str,
    severity: Severity,
    pattern: &'static str,
    description: &'static str,
    recommendation: &'static str,
) -> RuleSpec {
    RuleSpec {
        category,
        severity,
        pattern,
        description,
        recommendation,
    }
}

pub const SQL_RULES: &[RuleSpec] = &[
    rule(
        "DROP_DATABASE",
        Severity::Critical,
        r"DROP\s+DATABASE",
        "Dropping entire database",
        "Never drop databases in production. Use schema migrations.",
    ),
    rule(
        "DROP_TABLE",
        Severity::Critical,
        r"DROP\s+TABLE",
        "Dropping table causes permanent data loss",
        "Verify no downstream dependencies. Consider soft delete.",
    ),
    rule(
        "TRUNCATE_TABLE",
        Severity::Critical,
        r"TRUNCATE\s+TABLE",
        "Truncating table removes every row",
        "Use DELETE with WHERE clause for selective removal.",
    ),
    rule(
        "UNFILTERED_DELETE",
        Severity::High,
        r"DELETE\s+FROM\s+\w+\s*;",
        "DELETE without WHERE clause deletes all rows",
        "Add WHERE clause to limit deletion scope.",
    ),
    rule(
        "COMMENTED_ROLLBACK",
        Severity::Medium,
        r"--\s*ROLLBACK",
        "Rollback logic is commented out",
        "Uncomment rollback for migration safety.",
    ),
    rule(
        "DROP_COLUMN",
        Severity::Critical,
        r#"ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?[\w."`\[\]]+\s+DROP\s+COLUMN\b"#,
        "Dropping column destroys its data",
        "Stop reading the column first, then drop it in a later release.",
    ),
    rule(
        "DROP_CONSTRAINT",
        Severity::Critical,
        r#"ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?[\w."`\[\]]+\s+DROP\s+CONSTRAINT\b"#,
        "Dropping constraint removes a data integrity guarantee",
        "Confirm nothing relies on the constraint and keep a script to restore it.",
    ),
    rule(
        "RENAME_COLUMN",
        Severity::High,
        r#"ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?[\w."`\[\]]+\s+RENAME\s+COLUMN\b"#,
        "Renaming column breaks queries that use the old name",
        "Add the new column, backfill, migrate readers, then remove the old one.",
    ),
    rule(
        "ALTER_COLUMN_TYPE",
        Severity::High,
        r#"ALTER\s+COLUMN\s+[\w."`\[\]]+\s+(?:SET\s+DATA\s+)?TYPE\b"#,
        "Changing column type may rewrite the table or truncate values",
        "Check value compatibility and expected lock time on large tables.",
    ),
    rule(
        "SEQUENCE_RESTART",
        Severity::High,
        r#"ALTER\s+SEQUENCE\s+[\w."`\[\]]+\s+RESTART\b"#,
        "Restarting sequence can produce duplicate keys",
        "Restart above the current maximum key value.",
    ),
    rule(
        "ADD_CONSTRAINT",
        Severity::Medium,
        r"ADD\s+CONSTRAINT\b",
        "Adding constraint validates existing rows and can fail or lock",
        "Add the constraint as NOT VALID and validate it separately.",
    ),
    rule(
        "SET_NOT_NULL",
        Severity::Medium,
        r"SET\s+NOT\s+NULL\b",
        "Setting NOT NULL fails when existing rows contain NULL",
        "Backfill NULL values before applying the constraint.",
    ),
];

pub const TERRAFORM_RULES: &[RuleSpec] = &[
    rule(
        "FORCE_DESTROY",
        Severity::Critical,
        r"force_destroy\s*=\s*true",
        "force_destroy=true allows data loss",
        "Remove force_destroy unless intentional data deletion.",
    ),
    rule(
        "PREVENT_DESTROY_DISABLED",
        Severity::High,
        r"prevent_destroy\s*=\s*false",
        "prevent_destroy disabled, allows accidental deletion",
        "Enable prevent_destroy for critical resources.",
    ),
    rule(
        "TERRAFORM_DESTROY",
        Severity::Critical,
        r"terraform\s+destroy",
        "Terraform destroy command removes infrastructure",
        "Verify this is intentional. Use targeted destroy if possible.",
    ),
    rule(
        "RESOURCE_COUNT_ZERO",
        Severity::High,
        r"count\s*=\s*0",
        "Resource count set to 0 removes infrastructure",
        "Ensure intentional resource removal.",
    ),
];

pub const YAML_RULES: &[RuleSpec] = &[
    rule(
        "ZERO_REPLICAS",
        Severity::High,
        r"replicas:\s*0",
        "Deployment scaled to 0 replicas causes service downtime",
        "Verify intentional scaling to zero.",
    ),
    rule(
        "PRIVILEGED_CONTAINER",
        Severity::Critical,
        r"privileged:\s*true",
        "Container runs in privileged mode",
        "Remove privileged mode unless absolutely required. Use capabilities instead.",
    ),
    rule(
        "HOST_NETWORK",
        Severity::Critical,
        r"hostNetwork:\s*true",
        "Pod uses the host network namespace",
        "Remove hostNetwork unless required for network appliances.",
    ),
    rule(
        "ALWAYS_PULL_IMAGE",
        Severity::Medium,
        r"imagePullPolicy:\s*Always",
        "Always pulling images can cause downtime if the registry is unavailable",
        "Use IfNotPresent for production stability.",
    ),
];

/// Built-in table for a kind; `Unknown` has none
pub fn builtin_rules(kind: ArtifactKind) -> &'static [RuleSpec] {
    match kind {
        ArtifactKind::Sql => SQL_RULES,
        ArtifactKind::Terraform => TERRAFORM_RULES,
        ArtifactKind::Yaml => YAML_RULES,
        ArtifactKind::Unknown => &[],
    }
}
