//! Error types for protocol values.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors produced while interpreting protocol values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The entity kind name is not known.
    #[error("unknown entity kind: {0}")]
    UnknownKind(String),

    /// The entity kind has no remote resource type in the registry.
    #[error("entity kind {0} is not registered")]
    UnregisteredKind(String),

    /// The publish status name is not known.
    #[error("unknown post status: {0}")]
    UnknownStatus(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ProtocolError::UnknownKind("page".into());
        assert_eq!(err.to_string(), "unknown entity kind: page");

        let err = ProtocolError::UnregisteredKind("ckan-local-group".into());
        assert!(err.to_string().contains("ckan-local-group"));
    }
}
