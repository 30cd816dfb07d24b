use thiserror::Error;

/// Failures at the graph service boundary.
///
/// These are service-level failures in the ingestion taxonomy: the caller of
/// the failing file-level operation sees them, and nothing retries them
/// internally.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("graph service transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("graph service rejected {operation}: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    #[error("unexpected graph service response: {0}")]
    InvalidResponse(String),

    #[error("transaction already finished")]
    TxnFinished,

    #[error("mutation attempted in a read-only transaction")]
    ReadOnly,
}
