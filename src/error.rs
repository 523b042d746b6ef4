//! Error types for rust-yangcodec

use thiserror::Error;

use crate::codec::EncodingFormat;

/// Main error type for codec, schema and transport operations
#[derive(Debug, Error)]
pub enum CodecError {
    /// No schema node at the given absolute path
    #[error("unknown schema path: {0}")]
    UnknownPath(String),

    /// Field name absent from the schema node at `path`
    #[error("unknown field '{name}' under {path}")]
    UnknownField { path: String, name: String },

    /// Field exists but is used as the wrong kind of node
    #[error("{path} is a {actual}, not a {expected}")]
    KindMismatch {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Value assigned to a leaf does not match its YANG type
    #[error("type mismatch at {path}: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// Encoded scalar could not be converted to the leaf's YANG type
    #[error("cannot convert value at {path}: expected {expected}, got {value}")]
    Conversion {
        path: String,
        expected: String,
        value: String,
    },

    /// Two list entries share the same key tuple
    #[error("duplicate key {key} in list {path}")]
    DuplicateKey { path: String, key: String },

    /// List entry added without one of its key leafs
    #[error("list entry for {path} is missing key leaf '{key}'")]
    MissingKey { path: String, key: String },

    /// Schema descriptor violates a structural invariant
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Tree handed to the engine is not rooted at one of its schema roots
    #[error("root mismatch: '{0}' is not a root of this schema")]
    RootMismatch(String),

    /// Syntactically malformed payload
    #[error("malformed {format} payload: {message}")]
    Malformed {
        format: EncodingFormat,
        message: String,
    },

    /// Encoding name other than `xml` or `json`
    #[error("unsupported encoding '{0}', expected xml or json")]
    UnsupportedFormat(String),

    /// Transport did not answer in time
    #[error("transport timeout: {0}")]
    Timeout(String),

    /// Peer refused or dropped the exchange
    #[error("transport refused: {0}")]
    Refused(String),

    /// Session could not be established
    #[error("connection error: {0}")]
    Connection(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error in a schema or session descriptor
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of [`CodecError`] used by callers to decide on retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Schema,
    Type,
    DuplicateKey,
    Transport,
    Connection,
    Encoding,
    Io,
}

impl CodecError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::UnknownPath(_)
            | CodecError::UnknownField { .. }
            | CodecError::KindMismatch { .. }
            | CodecError::MissingKey { .. }
            | CodecError::InvalidSchema(_)
            | CodecError::RootMismatch(_) => ErrorKind::Schema,
            CodecError::TypeMismatch { .. } | CodecError::Conversion { .. } => ErrorKind::Type,
            CodecError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            CodecError::Timeout(_) | CodecError::Refused(_) => ErrorKind::Transport,
            CodecError::Connection(_) => ErrorKind::Connection,
            CodecError::Malformed { .. }
            | CodecError::UnsupportedFormat(_)
            | CodecError::Json(_) => ErrorKind::Encoding,
            CodecError::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether the caller may reasonably retry the operation
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Connection)
    }
}

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = CodecError::UnknownField {
            path: "/Isis".into(),
            name: "bogus".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(!err.is_retryable());

        let err = CodecError::Timeout("no reply after 5s".into());
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_error_message_carries_path() {
        let err = CodecError::TypeMismatch {
            path: "/Isis/enabled".into(),
            expected: "boolean".into(),
            actual: "string \"yes\"".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/Isis/enabled"));
        assert!(msg.contains("boolean"));
    }
}
