//! Template error types

use thiserror::Error;

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors raised while parsing or resolving address templates
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("malformed address template '{template}': {reason}")]
    MalformedTemplate { template: String, reason: String },

    #[error("unresolved placeholder {{{placeholder}}} in '{template}'")]
    UnresolvedPlaceholder {
        template: String,
        placeholder: String,
    },
}

impl TemplateError {
    pub(crate) fn malformed(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedTemplate {
            template: template.into(),
            reason: reason.into(),
        }
    }
}
