use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad URL or path, unreadable file, or failed HTTP request.
    #[error("Failed to retrieve '{location}': {reason}")]
    Retrieval { location: String, reason: String },

    /// Malformed CSV or JSON input.
    #[error("Failed to decode {format} input: {reason}")]
    Decode { format: String, reason: String },

    /// An override or explicit name refers to a column the dataset does not have.
    #[error("Unknown column '{column}' ({context})")]
    UnknownColumn { column: String, context: String },

    #[error("Column '{column}' has unsupported type '{kind}': nested objects are not supported")]
    UnsupportedType { column: String, kind: String },

    /// Existing destination table, colliding child tables, or duplicate columns.
    #[error("Schema conflict on '{name}': {reason}")]
    SchemaConflict { name: String, reason: String },

    #[error("Record {index} has {found} value(s) but the table has {expected} column(s)")]
    RowShape {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Name '{raw}' is empty after sanitizing ({context})")]
    EmptyIdentifier { raw: String, context: String },

    #[error("Table '{table}' has no columns")]
    EmptyTable { table: String },

    #[error("Unknown type hint '{hint}' (expected one of: {expected})")]
    InvalidTypeHint { hint: String, expected: String },

    #[error("Database error while {action}: {source}")]
    Database {
        action: String,
        #[source]
        source: rusqlite::Error,
    },
}

impl Error {
    pub fn retrieval(location: impl Into<String>, reason: impl ToString) -> Self {
        Error::Retrieval {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(format: impl Into<String>, reason: impl ToString) -> Self {
        Error::Decode {
            format: format.into(),
            reason: reason.to_string(),
        }
    }

    pub fn conflict(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::SchemaConflict {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn database(action: impl Into<String>) -> impl FnOnce(rusqlite::Error) -> Self {
        let action = action.into();
        move |source| Error::Database { action, source }
    }
}
