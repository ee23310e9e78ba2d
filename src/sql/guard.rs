//! Raw SQL guard
//!
//! Free-text statements bypass the entity model, so they get their own rule
//! table. The text is lower-cased, comment markers, quotes, brackets and
//! runs of whitespace are collapsed to single spaces, and each `;`-separated
//! statement is checked twice: by its leading verb and by phrase. A phrase
//! inside a string literal or comment still counts, so detection errs
//! towards rejection.
//!
//! | Rule | Leading verbs | Phrases | Allowed roles |
//! |---|---|---|---|
//! | ExecuteStatement | `exec`, `execute`, `call`, `do`, `prepare` | `execute `, `exec ` | none |
//! | SchemaCreate | `create` | `create table` | none |
//! | Destructive | `drop`, `truncate`, `delete` | `drop table`, `drop database`, `truncate table`, `delete from`, `alter table … drop column` | admin |
//! | DataModifying | `insert`, `update`, `delete`, `alter`, `merge`, `upsert`, `replace`, `grant`, `revoke`, `copy`, `comment` | `insert into`, `update `, `delete `, `alter ` | admin, manager |

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::result::ExecutionResult;
use crate::core::{GateError, GateResult};
use crate::permissions::Role;
use crate::storage::StorageClient;

/// Policy rule a statement can trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlRule {
    ExecuteStatement,
    SchemaCreate,
    Destructive,
    DataModifying,
}

impl SqlRule {
    /// Whether a role may run statements that trip this rule
    pub fn permits(&self, role: &Role) -> bool {
        match self {
            SqlRule::ExecuteStatement | SqlRule::SchemaCreate => false,
            SqlRule::Destructive => role.is_admin(),
            SqlRule::DataModifying => role.is_admin() || role.is_manager(),
        }
    }
}

impl fmt::Display for SqlRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlRule::ExecuteStatement => f.write_str("EXECUTE"),
            SqlRule::SchemaCreate => f.write_str("CREATE"),
            SqlRule::Destructive => f.write_str("destructive"),
            SqlRule::DataModifying => f.write_str("data-modifying"),
        }
    }
}

/// Evaluation order matters: the first failing rule is reported
const RULES: [(SqlRule, &[&str]); 4] = [
    (SqlRule::ExecuteStatement, &["execute ", "exec "]),
    (SqlRule::SchemaCreate, &["create table"]),
    (
        SqlRule::Destructive,
        &["drop table", "drop database", "truncate table", "delete from"],
    ),
    (
        SqlRule::DataModifying,
        &["insert into", "update ", "delete ", "alter "],
    ),
];

/// Rules tripped by a statement's leading keyword
const VERB_RULES: [(&[&str], &[SqlRule]); 5] = [
    (
        &["exec", "execute", "call", "do", "prepare"],
        &[SqlRule::ExecuteStatement],
    ),
    (&["create"], &[SqlRule::SchemaCreate]),
    (&["drop", "truncate"], &[SqlRule::Destructive]),
    (&["delete"], &[SqlRule::Destructive, SqlRule::DataModifying]),
    (
        &[
            "insert", "update", "alter", "merge", "upsert", "replace", "grant", "revoke", "copy",
            "comment",
        ],
        &[SqlRule::DataModifying],
    ),
];

/// Comment markers, quoting, brackets and whitespace all separate tokens
fn separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?:/\*|\*/|--|#|[\s"'`\[\](),])+"#).expect("valid regex"))
}

fn drop_column() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"alter table .*drop column").expect("valid regex"))
}

/// What a statement is and which rules it trips
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Upper-cased first keyword, `UNKNOWN` if none
    pub command: String,
    /// Matched rules in evaluation order
    pub rules: Vec<SqlRule>,
}

impl Classification {
    /// First rule the role is not allowed to trip
    pub fn violation(&self, role: &Role) -> Option<SqlRule> {
        self.rules.iter().copied().find(|rule| !rule.permits(role))
    }
}

/// Classify statement text without executing it
pub fn classify(sql: &str) -> Classification {
    let lowered = sql.to_lowercase();
    let statements: Vec<String> = lowered
        .split(';')
        .map(|statement| separators().replace_all(statement, " ").trim().to_string())
        .filter(|statement| !statement.is_empty())
        .collect();

    let mut rules: Vec<SqlRule> = Vec::new();
    for statement in &statements {
        // Trailing space lets phrases like "update " match at the very end
        let padded = format!("{} ", statement);

        for (rule, phrases) in RULES.iter() {
            if phrases.iter().any(|p| padded.contains(p)) {
                rules.push(*rule);
            }
        }
        if drop_column().is_match(&padded) {
            rules.push(SqlRule::Destructive);
        }

        let verb = leading_word(statement);
        if let Some((_, tripped)) = VERB_RULES.iter().find(|(verbs, _)| verbs.contains(&verb)) {
            rules.extend_from_slice(tripped);
        }
    }

    rules.sort_by_key(|rule| RULES.iter().position(|(r, _)| r == rule));
    rules.dedup();

    let command = statements
        .first()
        .map(|statement| leading_word(statement))
        .filter(|verb| !verb.is_empty())
        .map(str::to_ascii_uppercase)
        .unwrap_or_else(|| "UNKNOWN".to_string());

    Classification { command, rules }
}

fn leading_word(statement: &str) -> &str {
    let end = statement
        .find(|c: char| !(c.is_ascii_alphabetic() || c == '_'))
        .unwrap_or(statement.len());
    &statement[..end]
}

/// Validates free-text SQL by role, then runs it
#[derive(Clone)]
pub struct RawSqlGuard {
    storage: Arc<dyn StorageClient>,
}

impl RawSqlGuard {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self { storage }
    }

    /// Validate without executing
    pub fn check(&self, sql: &str, role: &Role) -> GateResult<Classification> {
        if sql.trim().is_empty() {
            return Err(GateError::bad_request("SQL statement is empty"));
        }

        let classification = classify(sql);
        if let Some(rule) = classification.violation(role) {
            tracing::warn!(
                "[RawSqlGuard] Rejected {} statement from role '{}' ({})",
                classification.command,
                role,
                rule
            );
            return Err(GateError::SqlPolicyViolation {
                rule,
                role: role.to_string(),
            });
        }
        Ok(classification)
    }

    /// Validate and execute
    ///
    /// Policy violations are errors. Driver failures come back as a result
    /// with `success: false` so the caller can correct and retry.
    pub async fn execute_sql(&self, sql: &str, role: &Role) -> GateResult<ExecutionResult> {
        let classification = self.check(sql, role)?;

        tracing::info!(
            "[RawSqlGuard] Executing {} for role '{}' on {}",
            classification.command,
            role,
            self.storage.name()
        );

        let started = Instant::now();
        let result = match self.storage.execute_raw(sql).await {
            Ok(outcome) => ExecutionResult::success(outcome, &classification.command, started.elapsed()),
            Err(e) => {
                tracing::error!(error = %e, sql = %sql, "[RawSqlGuard] Statement failed");
                ExecutionResult::failure(&classification.command, e.to_string(), started.elapsed())
            }
        };

        tracing::debug!(
            "[RawSqlGuard] {} finished in {}ms (success: {})",
            result.command,
            result.duration_ms,
            result.success
        );
        Ok(result)
    }
}

impl fmt::Debug for RawSqlGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSqlGuard")
            .field("storage", &self.storage.name())
            .finish()
    }
}
