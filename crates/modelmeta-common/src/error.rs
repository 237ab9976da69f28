//! Dispatch error type
//!
//! Every failure returned by a [`Dispatcher`](crate::Dispatcher) is a
//! [`DispatchError`]. The metadata layer propagates it unchanged.

use thiserror::Error;

/// Result type for dispatcher calls
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// Error returned by the transport collaborator
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timeout")]
    Timeout,

    #[error("operation {operation} failed: {description}")]
    Failed {
        operation: String,
        description: String,
    },

    #[error("cannot decode response: {0}")]
    Decode(String),
}

impl DispatchError {
    /// Create a new transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a new decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an error for an operation the server reported as failed
    pub fn failed(operation: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Failed {
            operation: operation.into(),
            description: description.into(),
        }
    }

    /// Check if the whole call may succeed when issued again
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        assert!(DispatchError::Timeout.is_retryable());
        assert!(DispatchError::transport("connection reset").is_retryable());
        assert!(!DispatchError::failed("read-resource", "WFLYCTL0216").is_retryable());
        assert!(!DispatchError::decode("eof").is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = DispatchError::failed("read-children-names", "not found");
        assert_eq!(
            err.to_string(),
            "operation read-children-names failed: not found"
        );
    }
}
