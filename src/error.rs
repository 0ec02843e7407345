use thiserror::Error;

use crate::schema::{FieldRole, SemanticType};

pub type Result<T> = std::result::Result<T, OrmError>;

/// Every failure the mapping engine can report.
///
/// Each kind is a distinct variant so callers can match on it instead of
/// inspecting messages.
#[derive(Debug, Error)]
pub enum OrmError {
    #[error("record type `{record}` has no primary key field")]
    MissingPrimaryKey { record: &'static str },

    #[error("record type `{record}` declares more than one {role:?} field: `{first}` and `{second}`")]
    AmbiguousRole {
        record: &'static str,
        role: FieldRole,
        first: String,
        second: String,
    },

    #[error("record type `{record}` declares field `{field}` twice")]
    DuplicateField { record: &'static str, field: String },

    #[error("field `{field}` of `{record}` is a {role:?} field but has type {found:?}, expected DateTime")]
    InvalidTimestampField {
        record: &'static str,
        field: String,
        role: FieldRole,
        found: SemanticType,
    },

    #[error("field `{field}` has type {ty:?}, which has no column mapping")]
    UnsupportedType { field: String, ty: SemanticType },

    #[error("field `{field}` does not belong to record type `{record}`")]
    IllegalField { record: &'static str, field: String },

    /// `found` is `None` for a null value.
    #[error("value for field `{field}` has type {found:?}, expected {expected:?}")]
    ValueMismatch {
        field: String,
        expected: SemanticType,
        found: Option<SemanticType>,
    },

    #[error("record type `{record}` produced {found} values for {expected} fields")]
    ArityMismatch {
        record: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("interactor is bound to `{expected}` but was called for `{found}`")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("unable to connect to database: {0}")]
    Connection(String),

    #[error("connection to database is closed")]
    Disconnected,

    #[error("column `{field}` could not be read as {expected:?}: {reason}")]
    Conversion {
        field: String,
        expected: SemanticType,
        reason: String,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl OrmError {
    /// Errors caused by a malformed record type declaration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            OrmError::MissingPrimaryKey { .. }
                | OrmError::AmbiguousRole { .. }
                | OrmError::DuplicateField { .. }
                | OrmError::InvalidTimestampField { .. }
        )
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, OrmError::Connection(_) | OrmError::Disconnected)
    }
}
