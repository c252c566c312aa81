//! Error types for the morph-to field engine

use thiserror::Error;

/// Result type for field operations
pub type Result<T> = std::result::Result<T, FieldError>;

/// Errors that can occur while defining, resolving, validating, filling or
/// serializing a morph-to field
#[derive(Debug, Error)]
pub enum FieldError {
    /// Field definition is invalid
    #[error("field configuration error: {message}")]
    Configuration { message: String },

    /// Two candidate types registered under the same key
    #[error("duplicate candidate key: {key}")]
    DuplicateCandidate { key: String },

    /// The request did not select a candidate for the field
    #[error("no candidate selected for field '{attribute}'")]
    MissingSelection { attribute: String },

    /// The submitted candidate key does not match any registered type
    #[error("unknown candidate: {key}")]
    UnknownCandidate { key: String },

    /// The related entity failed resource validation
    #[error("validation failed for {resource}: {message}")]
    Validation { resource: String, message: String },

    /// The related entity could not be persisted
    #[error("failed to persist {resource}: {message}")]
    Persistence { resource: String, message: String },
}

impl FieldError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Persistence {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Check if this error is recoverable at the request boundary
    /// (validation-class errors are; configuration and persistence are not)
    pub fn is_request_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingSelection { .. } | Self::UnknownCandidate { .. } | Self::Validation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FieldError::DuplicateCandidate {
            key: "post".into(),
        };
        assert_eq!(err.to_string(), "duplicate candidate key: post");
    }

    #[test]
    fn test_validation_error() {
        let err = FieldError::validation("video", "title is required");
        assert!(err.to_string().contains("video"));
        assert!(err.to_string().contains("title is required"));
    }

    #[test]
    fn test_request_recoverable() {
        assert!(FieldError::UnknownCandidate { key: "x".into() }.is_request_recoverable());
        assert!(FieldError::validation("post", "bad").is_request_recoverable());
        assert!(!FieldError::persistence("post", "disk full").is_request_recoverable());
        assert!(!FieldError::configuration("bad types").is_request_recoverable());
    }
}
