//! Metadata error types

use modelmeta_cache::CacheError;
use modelmeta_common::DispatchError;
use modelmeta_template::TemplateError;
use thiserror::Error;

/// Result type for metadata operations
pub type MetaResult<T> = Result<T, MetaError>;

/// Structural problems in a `read-resource-description` response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("composite has {expected} steps but the response has {actual}")]
    StepCountMismatch { expected: usize, actual: usize },

    #[error("step {index} ({operation}) failed: {description}")]
    StepFailed {
        index: usize,
        operation: String,
        description: String,
    },

    #[error("unexpected payload for {operation}: {reason}")]
    UnexpectedPayload { operation: String, reason: String },
}

impl ParseError {
    pub(crate) fn unexpected(operation: impl ToString, reason: impl Into<String>) -> Self {
        Self::UnexpectedPayload {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors returned by the metadata pipeline
#[derive(Debug, Error)]
pub enum MetaError {
    #[error("no address templates given")]
    NoTemplates,

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

impl MetaError {
    /// Check if the call may succeed when issued again
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Dispatch(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(MetaError::from(DispatchError::Timeout).is_retryable());
        assert!(!MetaError::from(DispatchError::failed("composite", "denied")).is_retryable());
        let parse = ParseError::StepFailed {
            index: 2,
            operation: "/subsystem=ee:read-resource-description".into(),
            description: "WFLYCTL0216".into(),
        };
        assert!(!MetaError::from(parse).is_retryable());
    }

    #[test]
    fn test_display() {
        let err = MetaError::from(ParseError::StepCountMismatch {
            expected: 3,
            actual: 2,
        });
        assert_eq!(
            err.to_string(),
            "parse error: composite has 3 steps but the response has 2"
        );
    }
}
