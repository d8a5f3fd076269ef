//! Shallow SQL parser
//!
//! Splits a migration into statements, classifies each statement's
//! operation and pulls out the tables it touches. This is not a SQL
//! grammar: anything it cannot classify becomes `Operation::Unknown` and
//! contributes nothing.
//!
//! Statement splitting respects single-quoted strings (with `''`
//! escapes), double-quoted and back-quoted identifiers, `--` and `/* */`
//! comments and `$tag$` dollar-quoted bodies. Each statement carries two
//! texts: the raw slice for display, and a "code" view with comments
//! removed and string contents blanked, which is what classification and
//! extraction look at.

use crate::models::{EntitySet, Finding, Severity};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Detector id recorded on structural findings
pub const PARSER_DETECTOR: &str = "parser_tool";

/// Characters of statement text kept as a finding snippet
const SNIPPET_CHARS: usize = 100;

/// One statement of a SQL artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Statement text as written, trimmed, including its terminator
    pub raw: String,
    /// Same text with comments removed and string contents blanked
    pub code: String,
    /// 1-based line of the statement's first token
    pub line: u32,
}

/// Operation a statement performs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateTable,
    DropTable,
    AlterTable,
    TruncateTable,
    Select,
    Insert,
    Update,
    Delete,
    /// Recognized DDL/DML keyword without table extraction
    Other(String),
    Unknown,
}

impl Operation {
    pub fn is_table_ddl(&self) -> bool {
        matches!(
            self,
            Operation::CreateTable
                | Operation::DropTable
                | Operation::AlterTable
                | Operation::TruncateTable
        )
    }

    pub fn is_dml(&self) -> bool {
        matches!(
            self,
            Operation::Select | Operation::Insert | Operation::Update | Operation::Delete
        )
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::CreateTable => write!(f, "CREATE TABLE"),
            Operation::DropTable => write!(f, "DROP TABLE"),
            Operation::AlterTable => write!(f, "ALTER TABLE"),
            Operation::TruncateTable => write!(f, "TRUNCATE TABLE"),
            Operation::Select => write!(f, "SELECT"),
            Operation::Insert => write!(f, "INSERT"),
            Operation::Update => write!(f, "UPDATE"),
            Operation::Delete => write!(f, "DELETE"),
            Operation::Other(keyword) => write!(f, "{}", keyword),
            Operation::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A classified statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStatement {
    pub operation: Operation,
    pub tables: Vec<String>,
    pub has_where: bool,
    pub line: u32,
    pub raw: String,
}

/// Everything the parser learned about one SQL artifact
#[derive(Debug, Clone, Default)]
pub struct SqlAnalysis {
    pub statements: Vec<ParsedStatement>,
    pub entities: EntitySet,
    pub has_ddl: bool,
    pub has_dml: bool,
}

/// Keywords that open a DDL or DML statement
const STATEMENT_KEYWORDS: &[&str] = &[
    "CREATE", "DROP", "ALTER", "TRUNCATE", "RENAME", "COMMENT", "SELECT", "INSERT", "UPDATE",
    "DELETE", "MERGE", "UPSERT", "REPLACE",
];

// Bare, quoted or bracketed identifier, optionally schema-qualified
const QNAME: &str = r#"(?:"[^"]+"|`[^`]+`|\[[^\]]+\]|[A-Za-z_][A-Za-z0-9_$]*)(?:\s*\.\s*(?:"[^"]+"|`[^`]+`|\[[^\]]+\]|[A-Za-z_][A-Za-z0-9_$]*))*"#;

static CREATE_TABLE: OnceLock<Regex> = OnceLock::new();
static DROP_TABLE: OnceLock<Regex> = OnceLock::new();
static ALTER_TABLE: OnceLock<Regex> = OnceLock::new();
static TRUNCATE_TABLE: OnceLock<Regex> = OnceLock::new();
static FROM_JOIN: OnceLock<Regex> = OnceLock::new();
static INSERT_INTO: OnceLock<Regex> = OnceLock::new();
static UPDATE_TARGET: OnceLock<Regex> = OnceLock::new();
static DELETE_FROM: OnceLock<Regex> = OnceLock::new();
static NAME_PART: OnceLock<Regex> = OnceLock::new();

fn compile(pattern: String) -> Regex {
    Regex::new(&pattern).expect("static SQL pattern")
}

fn create_table() -> &'static Regex {
    CREATE_TABLE.get_or_init(|| {
        compile(format!(
            r"(?i)\bCREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?({QNAME})"
        ))
    })
}

fn drop_table() -> &'static Regex {
    DROP_TABLE.get_or_init(|| {
        compile(format!(
            r"(?i)\bDROP\s+TABLE\s+(?:IF\s+EXISTS\s+)?({QNAME}(?:\s*,\s*{QNAME})*)"
        ))
    })
}

fn alter_table() -> &'static Regex {
    ALTER_TABLE.get_or_init(|| {
        compile(format!(
            r"(?i)\bALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?({QNAME})"
        ))
    })
}

fn truncate_table() -> &'static Regex {
    TRUNCATE_TABLE.get_or_init(|| {
        compile(format!(
            r"(?i)\bTRUNCATE\s+TABLE\s+(?:ONLY\s+)?({QNAME}(?:\s*,\s*{QNAME})*)"
        ))
    })
}

fn from_join() -> &'static Regex {
    FROM_JOIN.get_or_init(|| compile(format!(r"(?i)\b(?:FROM|JOIN)\s+({QNAME})")))
}

fn insert_into() -> &'static Regex {
    INSERT_INTO.get_or_init(|| compile(format!(r"(?i)\bINSERT\s+INTO\s+({QNAME})")))
}

fn update_target() -> &'static Regex {
    UPDATE_TARGET.get_or_init(|| compile(format!(r"(?i)\bUPDATE\s+(?:ONLY\s+)?({QNAME})")))
}

fn delete_from() -> &'static Regex {
    DELETE_FROM.get_or_init(|| {
        compile(format!(r"(?i)\bDELETE\s+FROM\s+(?:ONLY\s+)?({QNAME})"))
    })
}

fn name_part() -> &'static Regex {
    NAME_PART.get_or_init(|| {
        compile(r#""([^"]+)"|`([^`]+)`|\[([^\]]+)\]|([A-Za-z_][A-Za-z0-9_$]*)"#.to_string())
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ScanState {
    Normal,
    SingleQuote,
    DoubleQuote,
    Backtick,
    LineComment,
    BlockComment,
    Dollar(String),
}

/// Accumulates the statement currently being scanned
#[derive(Default)]
struct StatementBuf {
    raw: String,
    code: String,
    line: Option<u32>,
}

impl StatementBuf {
    fn push(&mut self, raw: char, code: char, line: u32) {
        self.raw.push(raw);
        self.code.push(code);
        if self.line.is_none() && !code.is_whitespace() {
            self.line = Some(line);
        }
    }

    /// Raw text kept, code view blanked (newlines survive)
    fn push_hidden(&mut self, c: char) {
        self.raw.push(c);
        self.code.push(if c == '\n' { '\n' } else { ' ' });
    }

    fn finish(&mut self, current_line: u32, out: &mut Vec<Statement>) {
        let buf = std::mem::take(self);
        if buf.code.trim().trim_end_matches(';').trim().is_empty() {
            return;
        }
        out.push(Statement {
            raw: buf.raw.trim().to_string(),
            code: buf.code,
            line: buf.line.unwrap_or(current_line),
        });
    }
}

/// `$tag$` opener starting at `i`, if any. Tags follow identifier rules,
/// so positional parameters like `$1` are not mistaken for one.
fn dollar_tag(chars: &[char], i: usize) -> Option<String> {
    let mut j = i + 1;
    while j < chars.len() {
        let c = chars[j];
        if c == '$' {
            return Some(chars[i..=j].iter().collect());
        }
        let valid = c == '_' || c.is_alphabetic() || (j > i + 1 && c.is_ascii_digit());
        if !valid {
            return None;
        }
        j += 1;
    }
    None
}

fn starts_with_at(chars: &[char], i: usize, tag: &str) -> bool {
    let mut k = i;
    for t in tag.chars() {
        if chars.get(k) != Some(&t) {
            return false;
        }
        k += 1;
    }
    true
}

/// Split SQL text into statements on top-level semicolons
pub fn split_statements(content: &str) -> Vec<Statement> {
    let chars: Vec<char> = content.chars().collect();
    let mut out = Vec::new();
    let mut buf = StatementBuf::default();
    let mut state = ScanState::Normal;
    let mut line: u32 = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match &state {
            ScanState::Normal => match c {
                ';' => {
                    buf.push(c, c, line);
                    buf.finish(line, &mut out);
                }
                '\'' => {
                    buf.push(c, c, line);
                    state = ScanState::SingleQuote;
                }
                '"' => {
                    buf.push(c, c, line);
                    state = ScanState::DoubleQuote;
                }
                '`' => {
                    buf.push(c, c, line);
                    state = ScanState::Backtick;
                }
                '-' if next == Some('-') => {
                    buf.push_hidden('-');
                    buf.push_hidden('-');
                    state = ScanState::LineComment;
                    i += 2;
                    continue;
                }
                '/' if next == Some('*') => {
                    buf.push_hidden('/');
                    buf.push_hidden('*');
                    state = ScanState::BlockComment;
                    i += 2;
                    continue;
                }
                '$' => match dollar_tag(&chars, i) {
                    Some(tag) => {
                        // The opening tag belongs to the statement's code
                        for t in tag.chars() {
                            buf.push(t, t, line);
                        }
                        i += tag.chars().count();
                        state = ScanState::Dollar(tag);
                        continue;
                    }
                    None => buf.push(c, c, line),
                },
                _ => buf.push(c, c, line),
            },
            ScanState::SingleQuote => {
                // MySQL-style escapes: `\'` and `\\` never close the literal
                if let ('\\', Some(escaped)) = (c, next) {
                    buf.push_hidden(c);
                    buf.push_hidden(escaped);
                    if escaped == '\n' {
                        line += 1;
                    }
                    i += 2;
                    continue;
                }
                if c == '\'' && next == Some('\'') {
                    buf.push_hidden('\'');
                    buf.push_hidden('\'');
                    i += 2;
                    continue;
                }
                if c == '\'' {
                    buf.push(c, c, line);
                    state = ScanState::Normal;
                } else {
                    buf.push_hidden(c);
                }
            }
            ScanState::DoubleQuote => {
                buf.push(c, c, line);
                if c == '"' {
                    state = ScanState::Normal;
                }
            }
            ScanState::Backtick => {
                buf.push(c, c, line);
                if c == '`' {
                    state = ScanState::Normal;
                }
            }
            ScanState::LineComment => {
                buf.push_hidden(c);
                if c == '\n' {
                    state = ScanState::Normal;
                }
            }
            ScanState::BlockComment => {
                if c == '*' && next == Some('/') {
                    buf.push_hidden('*');
                    buf.push_hidden('/');
                    state = ScanState::Normal;
                    i += 2;
                    continue;
                }
                buf.push_hidden(c);
            }
            ScanState::Dollar(tag) => {
                if starts_with_at(&chars, i, tag) {
                    let tag = tag.clone();
                    for t in tag.chars() {
                        buf.push(t, t, line);
                    }
                    i += tag.chars().count();
                    state = ScanState::Normal;
                    continue;
                }
                buf.push_hidden(c);
            }
        }

        if c == '\n' {
            line += 1;
        }
        i += 1;
    }

    buf.finish(line, &mut out);
    out
}

/// Upper-cased words at parenthesis depth 0, skipping quoted identifiers
fn top_level_words(code: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut depth: usize = 0;
    let mut word = String::new();
    let mut quote: Option<char> = None;

    for c in code.chars() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        if c.is_alphanumeric() || c == '_' || c == '$' {
            if depth == 0 {
                word.push(c);
            }
            continue;
        }
        if !word.is_empty() {
            words.push(word.to_uppercase());
            word.clear();
        }
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '"' | '`' => quote = Some(c),
            _ => {}
        }
    }
    if !word.is_empty() {
        words.push(word.to_uppercase());
    }
    words
}

fn contains_phrase(code: &str, first: &str, second: &str) -> bool {
    let words: Vec<String> = code
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_uppercase())
        .collect();
    words.windows(2).any(|w| w[0] == first && w[1] == second)
}

/// Classify a statement's operation from its code view
pub fn classify(code: &str) -> Operation {
    const PHRASES: [(&str, Operation); 4] = [
        ("CREATE", Operation::CreateTable),
        ("DROP", Operation::DropTable),
        ("ALTER", Operation::AlterTable),
        ("TRUNCATE", Operation::TruncateTable),
    ];
    for (verb, op) in PHRASES {
        if contains_phrase(code, verb, "TABLE") {
            return op;
        }
    }

    let leading = code
        .trim_start()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .unwrap_or("")
        .to_uppercase();
    if let Some(op) = dml_operation(&leading) {
        return op;
    }

    top_level_words(code)
        .into_iter()
        .find(|w| STATEMENT_KEYWORDS.contains(&w.as_str()))
        .map(|w| dml_operation(&w).unwrap_or(Operation::Other(w)))
        .unwrap_or(Operation::Unknown)
}

fn dml_operation(keyword: &str) -> Option<Operation> {
    match keyword {
        "SELECT" => Some(Operation::Select),
        "INSERT" => Some(Operation::Insert),
        "UPDATE" => Some(Operation::Update),
        "DELETE" => Some(Operation::Delete),
        _ => None,
    }
}

/// Strip quoting from a possibly qualified name: `"app"."Users"` → `app.Users`
fn normalize_name(qualified: &str) -> String {
    name_part()
        .captures_iter(qualified)
        .filter_map(|c| {
            c.get(1)
                .or_else(|| c.get(2))
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map(|m| m.as_str().trim().to_string())
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Split a comma-separated name list captured by a DROP/TRUNCATE pattern
fn name_list(captured: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in captured.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q || (q == '[' && c == ']') {
                    quote = None;
                }
            }
            None => match c {
                ',' => {
                    names.push(normalize_name(&current));
                    current.clear();
                }
                '"' | '`' | '[' => {
                    quote = Some(c);
                    current.push(c);
                }
                _ => current.push(c),
            },
        }
    }
    names.push(normalize_name(&current));
    names.retain(|n| !n.is_empty());
    names
}

fn first_capture(re: &Regex, code: &str) -> Vec<String> {
    re.captures(code)
        .and_then(|c| c.get(1))
        .map(|m| vec![normalize_name(m.as_str())])
        .unwrap_or_default()
}

/// Tables a statement touches, according to its operation
pub fn extract_tables(operation: &Operation, code: &str) -> Vec<String> {
    let tables = match operation {
        Operation::CreateTable => first_capture(create_table(), code),
        Operation::AlterTable => first_capture(alter_table(), code),
        Operation::DropTable => drop_table()
            .captures(code)
            .and_then(|c| c.get(1))
            .map(|m| name_list(m.as_str()))
            .unwrap_or_default(),
        Operation::TruncateTable => truncate_table()
            .captures(code)
            .and_then(|c| c.get(1))
            .map(|m| name_list(m.as_str()))
            .unwrap_or_default(),
        Operation::Select => from_join()
            .captures_iter(code)
            .filter_map(|c| c.get(1))
            .map(|m| normalize_name(m.as_str()))
            .collect(),
        Operation::Insert => first_capture(insert_into(), code),
        Operation::Update => first_capture(update_target(), code),
        Operation::Delete => first_capture(delete_from(), code),
        Operation::Other(_) | Operation::Unknown => Vec::new(),
    };
    tables.into_iter().filter(|t| !t.is_empty()).collect()
}

/// Whether `WHERE` appears outside any parentheses
pub fn has_top_level_where(code: &str) -> bool {
    top_level_words(code).iter().any(|w| w == "WHERE")
}

/// Parse a statement list into classified statements and aggregate entities
pub fn analyze(content: &str) -> SqlAnalysis {
    let mut analysis = SqlAnalysis::default();

    for statement in split_statements(content) {
        let operation = classify(&statement.code);
        let tables = extract_tables(&operation, &statement.code);
        let has_where = has_top_level_where(&statement.code);

        let entities = &mut analysis.entities;
        let target = match operation {
            Operation::CreateTable => Some(&mut entities.tables_created),
            Operation::DropTable => Some(&mut entities.tables_dropped),
            Operation::TruncateTable => Some(&mut entities.tables_truncated),
            Operation::AlterTable => Some(&mut entities.tables_altered),
            Operation::Select | Operation::Insert | Operation::Update | Operation::Delete => {
                Some(&mut entities.tables_referenced)
            }
            Operation::Other(_) | Operation::Unknown => None,
        };
        if let Some(set) = target {
            set.extend(tables.iter().cloned());
        }

        analysis.has_ddl |= operation.is_table_ddl();
        analysis.has_dml |= operation.is_dml();
        analysis.statements.push(ParsedStatement {
            operation,
            tables,
            has_where,
            line: statement.line,
            raw: statement.raw,
        });
    }

    analysis
}

/// Entities and structural findings for a SQL artifact
pub fn parse(artifact: &str, content: &str) -> (EntitySet, Vec<Finding>) {
    let analysis = analyze(content);
    let mut findings = Vec::new();

    for stmt in &analysis.statements {
        if matches!(stmt.operation, Operation::Update | Operation::Delete) && !stmt.has_where {
            let snippet: String = stmt.raw.chars().take(SNIPPET_CHARS).collect();
            findings.push(
                Finding::new(
                    PARSER_DETECTOR,
                    artifact,
                    Some(stmt.line),
                    Severity::High,
                    "UNFILTERED_DML",
                    format!("{} without WHERE clause affects all rows", stmt.operation),
                )
                .with_reasoning("SQL parser detected DML operation without filtering condition")
                .with_snippet(snippet)
                .with_recommendation("Add WHERE clause to limit operation scope"),
            );
        }
    }

    // First line each referenced table is used on
    let mut first_use: BTreeMap<&str, u32> = BTreeMap::new();
    for stmt in &analysis.statements {
        if stmt.operation.is_dml() {
            for table in &stmt.tables {
                first_use.entry(table.as_str()).or_insert(stmt.line);
            }
        }
    }

    let entities = &analysis.entities;
    for table in entities
        .tables_referenced
        .intersection(&entities.tables_dropped)
    {
        findings.push(
            Finding::new(
                PARSER_DETECTOR,
                artifact,
                first_use.get(table.as_str()).copied(),
                Severity::Critical,
                "ORPHANED_REFERENCE",
                format!("Table '{}' is referenced after being dropped", table),
            )
            .with_reasoning("SQL parser found usage of a table the same file drops")
            .with_recommendation(format!(
                "Remove references to '{}' or reorder statements",
                table
            )),
        );
    }

    if analysis.has_ddl && analysis.has_dml {
        findings.push(
            Finding::new(
                PARSER_DETECTOR,
                artifact,
                None,
                Severity::Medium,
                "DDL_DML_MIX",
                "File contains both DDL (schema changes) and DML (data changes)",
            )
            .with_reasoning("Mixing schema and data operations increases rollback complexity")
            .with_recommendation("Separate DDL and DML into different migration files"),
        );
    }

    (analysis.entities, findings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> std::collections::BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_respects_quotes_and_comments() {
        let sql = "INSERT INTO t VALUES ('a;b', 'it''s');\n\
                   -- comment; with semicolon\n\
                   /* block ; comment */ SELECT \"odd;name\" FROM t;\n\
                   CREATE FUNCTION f() RETURNS int AS $body$ SELECT 1; $body$ LANGUAGE sql;";
        let statements = split_statements(sql);
        assert_eq!(statements.len(), 3);
        assert!(statements[0].raw.starts_with("INSERT"));
        assert_eq!(statements[1].line, 3);
        assert!(statements[1].raw.starts_with("-- comment"));
        assert!(!statements[1].code.contains("comment"));
        assert!(statements[2].raw.ends_with("LANGUAGE sql;"));
    }

    #[test]
    fn test_backslash_escaped_quote_keeps_literal_open() {
        let sql = "INSERT INTO notes VALUES ('it\\'s fine');\nDELETE FROM users;\nDROP TABLE orders;\n";
        let statements = split_statements(sql);
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[1].line, 2);
        assert_eq!(classify(&statements[1].code), Operation::Delete);
        assert_eq!(classify(&statements[2].code), Operation::DropTable);

        let (entities, findings) = parse("m.sql", sql);
        assert_eq!(entities.tables_dropped, set(&["orders"]));
        assert!(findings.iter().any(|f| f.category == "UNFILTERED_DML"));
    }

    #[test]
    fn test_escaped_backslash_before_closing_quote() {
        let statements = split_statements("INSERT INTO t VALUES ('C:\\\\');\nSELECT 1;");
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1].line, 2);
    }

    #[test]
    fn test_string_contents_are_blanked() {
        let statements = split_statements("UPDATE t SET note = 'where clause';");
        assert_eq!(statements.len(), 1);
        assert!(!statements[0].code.to_uppercase().contains("WHERE"));
        assert!(statements[0].raw.contains("where clause"));
    }

    #[test]
    fn test_trailing_statement_without_semicolon() {
        let statements = split_statements("SELECT 1;\n\nSELECT * FROM b");
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1].line, 3);
    }

    #[test]
    fn test_positional_parameter_is_not_dollar_quote() {
        let statements = split_statements("DELETE FROM t WHERE id = $1; SELECT 2;");
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_classification_precedence() {
        assert_eq!(classify("CREATE TABLE t (id int)"), Operation::CreateTable);
        assert_eq!(classify("drop table if exists t"), Operation::DropTable);
        assert_eq!(
            classify("ALTER TABLE t ADD COLUMN x int"),
            Operation::AlterTable
        );
        assert_eq!(classify("TRUNCATE TABLE t"), Operation::TruncateTable);
        assert_eq!(classify("select * from t"), Operation::Select);
        assert_eq!(classify("INSERT INTO t VALUES (1)"), Operation::Insert);
        assert_eq!(
            classify("WITH old AS (SELECT id FROM t) DELETE FROM t WHERE id IN (SELECT id FROM old)"),
            Operation::Delete
        );
        assert_eq!(
            classify("CREATE INDEX idx ON t (id)"),
            Operation::Other("CREATE".into())
        );
        assert_eq!(classify("BEGIN"), Operation::Unknown);
        assert_eq!(classify("   "), Operation::Unknown);
    }

    #[test]
    fn test_table_extraction() {
        let code = "CREATE TABLE IF NOT EXISTS \"app\".\"Users\" (id int)";
        assert_eq!(
            extract_tables(&Operation::CreateTable, code),
            vec!["app.Users".to_string()]
        );
        assert_eq!(
            extract_tables(&Operation::DropTable, "DROP TABLE IF EXISTS a, b.c"),
            vec!["a".to_string(), "b.c".to_string()]
        );
        assert_eq!(
            extract_tables(
                &Operation::Select,
                "SELECT * FROM orders o JOIN users u ON u.id = o.user_id"
            ),
            vec!["orders".to_string(), "users".to_string()]
        );
        assert_eq!(
            extract_tables(&Operation::Update, "UPDATE accounts SET x = 1"),
            vec!["accounts".to_string()]
        );
        assert_eq!(
            extract_tables(&Operation::Delete, "DELETE FROM `logs`"),
            vec!["logs".to_string()]
        );
    }

    #[test]
    fn test_where_at_depth_zero_only() {
        assert!(has_top_level_where("DELETE FROM t WHERE id = 1"));
        assert!(!has_top_level_where(
            "DELETE FROM t USING (SELECT id FROM s WHERE x) q"
        ));
        assert!(!has_top_level_where("UPDATE t SET \"where\" = 1"));
    }

    #[test]
    fn test_entities_aggregate() {
        let sql = "CREATE TABLE users (id int);\n\
                   ALTER TABLE orders ADD COLUMN user_id int;\n\
                   INSERT INTO users VALUES (1);\n\
                   SELECT * FROM orders JOIN users ON true;\n\
                   TRUNCATE TABLE sessions;\n\
                   DROP TABLE legacy;";
        let analysis = analyze(sql);
        let e = &analysis.entities;
        assert_eq!(e.tables_created, set(&["users"]));
        assert_eq!(e.tables_altered, set(&["orders"]));
        assert_eq!(e.tables_truncated, set(&["sessions"]));
        assert_eq!(e.tables_dropped, set(&["legacy"]));
        assert_eq!(e.tables_referenced, set(&["orders", "users"]));
        assert!(analysis.has_ddl);
        assert!(analysis.has_dml);
    }

    #[test]
    fn test_unfiltered_delete_finding() {
        let (_, findings) = parse("m.sql", "DELETE FROM users;");
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.category, "UNFILTERED_DML");
        assert_eq!(f.severity, Severity::High);
        assert_eq!(f.detector, "parser_tool");
        assert_eq!(f.line, Some(1));
        assert_eq!(f.description, "DELETE without WHERE clause affects all rows");
        assert_eq!(f.snippet.as_deref(), Some("DELETE FROM users;"));
    }

    #[test]
    fn test_filtered_select_is_clean() {
        let (entities, findings) = parse("m.sql", "SELECT * FROM users WHERE id=1;");
        assert!(findings.is_empty());
        assert_eq!(entities.tables_referenced, set(&["users"]));
    }

    #[test]
    fn test_unfiltered_update_line() {
        let sql = "SELECT 1;\n\n-- reset everybody\nUPDATE users SET active = false;";
        let (_, findings) = parse("m.sql", sql);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, Some(4));
    }

    #[test]
    fn test_orphaned_reference_and_mix() {
        let sql = "DROP TABLE users;\nSELECT * FROM users;";
        let (_, findings) = parse("m.sql", sql);
        let categories: Vec<_> = findings.iter().map(|f| f.category.as_str()).collect();
        assert_eq!(categories, vec!["ORPHANED_REFERENCE", "DDL_DML_MIX"]);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].line, Some(2));
        assert_eq!(findings[1].severity, Severity::Medium);
    }

    #[test]
    fn test_garbage_never_panics() {
        let inputs = [
            "",
            ";;;",
            "'unterminated",
            "/* open comment",
            "$$ never closed",
            "\"\"\"",
            "DROP TABLE",
            "CREATE TABLE (",
            "ü€𝄞 ; ; DELETE FROM ;",
        ];
        for input in inputs {
            let _ = parse("x.sql", input);
        }
    }
}
