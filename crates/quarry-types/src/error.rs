use thiserror::Error;

/// Errors raised while validating a research request.
///
/// These are rejected before a run starts and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("topic must be at least {min} characters (got {actual})")]
    TopicTooShort { min: usize, actual: usize },

    #[error("search_limit must be between {min} and {max} (got {value})")]
    SearchLimitOutOfRange { value: u32, min: u32, max: u32 },

    #[error("malformed repository reference '{0}': expected 'owner/repo'")]
    MalformedRepository(String),

    #[error("unknown search mode '{0}'")]
    UnknownSearchMode(String),
}

/// Errors from repository operations (used by trait definitions in quarry-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::TopicTooShort { min: 3, actual: 2 };
        assert_eq!(err.to_string(), "topic must be at least 3 characters (got 2)");

        let err = ValidationError::MalformedRepository("nope".to_string());
        assert!(err.to_string().contains("owner/repo"));
    }

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }
}
