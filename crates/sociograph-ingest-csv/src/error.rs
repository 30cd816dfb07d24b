use sociograph_client::ClientError;
use std::path::PathBuf;
use thiserror::Error;

/// Per-row failure. Tagged and non-fatal: the row is skipped with a warning
/// and the batch continues.
#[derive(Debug, Error)]
pub enum RowError {
    /// A required field is missing or does not parse to its declared type.
    #[error("invalid {column}: {message}")]
    Invalid {
        column: &'static str,
        message: String,
    },

    /// A cross-entity reference names a key absent from its uid mapping.
    ///
    /// Distinct from a data error: this is the expected consequence of an
    /// upstream row having been skipped, never a reason to fabricate an edge.
    #[error("unresolved {entity} reference {key:?}")]
    UnresolvedRef { entity: &'static str, key: String },
}

impl RowError {
    pub fn invalid(column: &'static str, message: impl Into<String>) -> Self {
        RowError::Invalid {
            column,
            message: message.into(),
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, RowError::UnresolvedRef { .. })
    }
}

/// File-level failure. Aborts the file's load; for entity files the
/// orchestrator aborts the whole run, for relationship files it moves on to
/// the next file.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("graph service failure while loading {path}: {source}")]
    Service {
        path: PathBuf,
        #[source]
        source: ClientError,
    },
}
