use std::path::PathBuf;

use thiserror::Error;

use crate::table::LogicalType;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Every failure the engine reports to its callers.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("corrupt file at byte offset {offset}: {reason}")]
    CorruptFile { offset: u64, reason: String },

    #[error("unsupported compression codec `{codec}` (expected one of none, snappy, zstd, gzip, lz4)")]
    UnsupportedCodec { codec: String },

    #[error("schema mismatch in table {table}, column `{column}`: {reason}")]
    SchemaMismatch {
        table: usize,
        column: String,
        reason: String,
    },

    #[error("schema declares columns not present in the table: {}", .columns.join(", "))]
    UnknownColumn { columns: Vec<String> },

    #[error("unknown type `{token}` for column `{column}`")]
    UnknownType { token: String, column: String },

    #[error("type mismatch{}: cannot cast {value:?} at row {row} to {target}", describe_column(.column))]
    TypeMismatch {
        column: Option<String>,
        row: usize,
        value: String,
        target: LogicalType,
    },

    #[error("invalid schema declaration: {0}")]
    InvalidSchema(String),

    #[error("invalid table: {0}")]
    InvalidTable(String),

    #[error("query failed: {0}")]
    QueryError(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_column(column: &Option<String>) -> String {
    match column {
        Some(name) => format!(" in column `{name}`"),
        None => String::new(),
    }
}

impl EngineError {
    pub(crate) fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        EngineError::CorruptFile {
            offset,
            reason: reason.into(),
        }
    }

    /// Attach a column name to a `TypeMismatch` raised below the table level.
    pub(crate) fn in_column(self, name: &str) -> Self {
        match self {
            EngineError::TypeMismatch {
                column: None,
                row,
                value,
                target,
            } => EngineError::TypeMismatch {
                column: Some(name.to_string()),
                row,
                value,
                target,
            },
            other => other,
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::QueryError(err.to_string())
    }
}

impl From<csv::Error> for EngineError {
    fn from(err: csv::Error) -> Self {
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(io) => EngineError::Io(io),
            _ => EngineError::InvalidTable(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_names_column_once_attached() {
        let err = EngineError::TypeMismatch {
            column: None,
            row: 2,
            value: "x".into(),
            target: LogicalType::Int64,
        };
        assert_eq!(
            err.to_string(),
            "type mismatch: cannot cast \"x\" at row 2 to int64"
        );

        let err = err.in_column("id");
        assert_eq!(
            err.to_string(),
            "type mismatch in column `id`: cannot cast \"x\" at row 2 to int64"
        );
    }

    #[test]
    fn unknown_column_lists_every_name() {
        let err = EngineError::UnknownColumn {
            columns: vec!["a".into(), "b".into()],
        };
        assert!(err.to_string().ends_with("a, b"));
    }
}
