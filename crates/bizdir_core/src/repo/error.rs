//! Repository error taxonomy.
//!
//! Storage errors are carried as `source` together with the operation label;
//! they are never reinterpreted into another kind.

use crate::db::DbError;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::ErrorCode;

static UNIQUE_VIOLATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"UNIQUE constraint failed: (\w+)\.(\w+)").expect("valid unique violation regex")
});

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Target business does not exist or is soft-deleted.
    #[error("business not found: {0}")]
    NotFound(String),
    /// Unique constraint violated on `public_id` or `alias`.
    #[error("business {field} `{value}` already exists")]
    Conflict { field: String, value: String },
    /// Category resolve/attach/detach failed in storage.
    #[error("{op}: category association failed: {source}")]
    AssociationFailure {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    /// Transaction begin/commit/rollback failed.
    #[error("{op}: transaction failed: {source}")]
    TransactionFailure {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    /// Any other storage failure while reading or writing.
    #[error("{op}: query failed: {source}")]
    QueryFailure {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    /// Persisted row cannot be converted into the read model.
    #[error("invalid persisted business data: {0}")]
    InvalidData(String),
    #[error("business repository requires schema version {expected_version}, got {actual_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("business repository requires table `{0}`")]
    MissingRequiredTable(&'static str),
    #[error("{0}")]
    Db(#[from] DbError),
}

impl RepoError {
    pub(crate) fn query(op: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::QueryFailure { op, source }
    }

    pub(crate) fn association(op: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::AssociationFailure { op, source }
    }

    pub(crate) fn transaction(op: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::TransactionFailure { op, source }
    }

    /// Maps a write error, turning unique violations on `businesses` into
    /// `Conflict`. `value_of` supplies the offending value for a column.
    pub(crate) fn from_write(
        op: &'static str,
        source: rusqlite::Error,
        value_of: impl Fn(&str) -> Option<String>,
    ) -> Self {
        if let Some(column) = unique_violation_column(&source) {
            let field = match column.as_str() {
                "public_id" => "id".to_string(),
                other => other.to_string(),
            };
            return Self::Conflict {
                value: value_of(column.as_str()).unwrap_or_default(),
                field,
            };
        }
        Self::QueryFailure { op, source }
    }
}

/// Extracts the column named in a `businesses` unique violation.
fn unique_violation_column(err: &rusqlite::Error) -> Option<String> {
    let rusqlite::Error::SqliteFailure(failure, Some(message)) = err else {
        return None;
    };
    if failure.code != ErrorCode::ConstraintViolation {
        return None;
    }
    let captures = UNIQUE_VIOLATION_RE.captures(message)?;
    if &captures[1] != "businesses" {
        return None;
    }
    Some(captures[2].to_string())
}
