//! Domain errors for the lockcell search engine.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur while searching for failing subsets.
///
/// Errors are `Clone` so that a failed unit of work can hand its originating
/// error to every dependent unit and to the client job that observes it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Oracle invocation failed: {0}")]
    OracleInvocation(String),

    #[error("Analysis guess mismatch: {0}")]
    AnalysisGuessMismatch(String),

    #[error("Structural invariant violated: {0}")]
    StructuralInvariant(String),

    #[error("Transient retrieval failure: {0}")]
    TransientRetrieval(String),

    #[error("Result retrieval failed after {attempts} attempts: {last_error}")]
    RetrievalExhausted { attempts: u32, last_error: String },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Unknown task handle: {0}")]
    UnknownHandle(Uuid),

    #[error("Unsupported work envelope version {found} (expected {expected})")]
    UnsupportedEnvelope { found: u32, expected: u32 },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Substrate error: {0}")]
    Substrate(String),
}

impl DomainError {
    /// Whether a retrieval that failed with this error may be retried.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::TransientRetrieval(_))
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_retrieval_is_retryable() {
        assert!(DomainError::TransientRetrieval("lost".into()).is_transient());
        assert!(!DomainError::OracleInvocation("boom".into()).is_transient());
        assert!(!DomainError::RetrievalExhausted {
            attempts: 5,
            last_error: "lost".into()
        }
        .is_transient());
    }

    #[test]
    fn test_error_messages() {
        let err = DomainError::InvalidStateTransition {
            from: "COMPLETED".into(),
            to: "RUNNING".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition from COMPLETED to RUNNING"
        );
    }
}
