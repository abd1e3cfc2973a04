//! Error types for the RagBridge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant. None of these messages are
//! meant for end users: transports convert them to a status code plus a safe
//! reply text and only log the detail.

use thiserror::Error;

/// The top-level error type for all RagBridge operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- RAG collaborator errors ---
    #[error("RAG error: {0}")]
    Rag(#[from] RagError),

    // --- History store errors ---
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    // --- Token validation errors ---
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    // --- Transport errors ---
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum RagError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unusable response: {0}")]
    InvalidResponse(String),

    #[error("RAG client not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Authorization header is missing")]
    MissingToken,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("OpenID discovery failed: {0}")]
    Discovery(String),

    #[error("Key set fetch failed: {0}")]
    KeySet(String),

    #[error("No signing key matches kid {0:?}")]
    UnknownKey(Option<String>),

    #[error("Algorithm {0} is not allowed")]
    AlgorithmNotAllowed(String),

    #[error("Token verification failed: {0}")]
    Verification(String),

    #[error("Issuer {issuer:?} does not start with {expected}")]
    IssuerMismatch { issuer: Option<String>, expected: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

impl TransportError {
    /// Caller-facing description. The variant detail (parser positions,
    /// offending values) stays in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            TransportError::UnsupportedMediaType(_) => "Unsupported media type",
            TransportError::MalformedBody(_) => "Malformed request body",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rag_error_displays_correctly() {
        let err = Error::Rag(RagError::ApiError {
            status_code: 503,
            message: "Service Unavailable".into(),
        });
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("Service Unavailable"));
    }

    #[test]
    fn transport_public_message_omits_detail() {
        let err = TransportError::MalformedBody("expected value at line 1 column 2".into());
        assert_eq!(err.public_message(), "Malformed request body");
        assert!(err.to_string().contains("line 1 column 2"));
    }

    #[test]
    fn issuer_mismatch_displays_expected_prefix() {
        let err = Error::Auth(AuthError::IssuerMismatch {
            issuer: Some("https://evil.example".into()),
            expected: "https://api.botframework.com".into(),
        });
        assert!(err.to_string().contains("evil.example"));
        assert!(err.to_string().contains("api.botframework.com"));
    }
}
