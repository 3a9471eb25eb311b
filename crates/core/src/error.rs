//! Error types for the averygate domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context (records, completion, sessions) has its own enum;
//! [`Error`] aggregates them for callers that cross contexts.

use thiserror::Error;

/// The top-level error type for all averygate operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Record store errors ---
    #[error("Record store error: {0}")]
    Records(#[from] RecordError),

    // --- Completion errors ---
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    // --- Session errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures talking to the tabular records service.
///
/// An empty result set is never an error: lookups return an empty list or
/// `None` instead.
#[derive(Debug, Clone, Error)]
pub enum RecordError {
    /// A required credential or identifier is missing. Carries the name of
    /// the missing setting, e.g. `AIRTABLE_API_KEY`.
    #[error("{0} not configured on the server.")]
    NotConfigured(String),

    #[error("Records service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Records service unreachable: {0}")]
    Network(String),

    #[error("Records service timed out: {0}")]
    Timeout(String),

    #[error("Failed to decode records response: {0}")]
    Decode(String),

    #[error("Invalid records request: {0}")]
    InvalidRequest(String),
}

/// Failures talking to the language-model completion service.
///
/// An unparsable or empty success body is *not* an error; providers return
/// an empty reply for it.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("{0} not configured on the server.")]
    NotConfigured(String),

    #[error("Completion service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Completion service unreachable: {0}")]
    Transport(String),

    #[error("Completion request timed out: {0}")]
    Timeout(String),
}

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Session storage error: {0}")]
    Storage(String),
}
