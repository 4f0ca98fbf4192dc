//! Error types shared by the host model and the interop bridge

/// Result type for interop operations
pub type InteropResult<T> = Result<T, InteropError>;

/// Coarse error classification used by embedders to decide how to report a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid request detected before any work was done (non-retryable as-is)
    Validation,
    /// No applicable or no unique overload
    Resolution,
    /// A value could not be converted toward a destination type
    Conversion,
    /// Programming error in the embedding; not recoverable
    Fatal,
    /// Error raised while running host or script code
    Runtime,
}

/// Interop error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum InteropError {
    /// Adapter request names an invalid combination of supertypes
    #[error("Invalid adapter request: {0}")]
    InvalidAdapterSpec(String),

    /// Adapter supertype exposes no public or protected constructor
    #[error("No accessible constructor: {type_name}")]
    NoAccessibleConstructor {
        /// Type that was to be extended
        type_name: String,
    },

    /// No candidate accepts the argument list at any tier
    #[error("none of the {count} methods are compatible with the argument list:\n{}", .signatures.join("\n"))]
    NoApplicableOverload {
        /// Number of candidates considered
        count: usize,
        /// Signatures of every candidate
        signatures: Vec<String>,
    },

    /// More than one candidate survives every tie-break
    #[error("cannot select between {count} methods compatible with the argument list:\n{}", .signatures.join("\n"))]
    AmbiguousOverload {
        /// Number of surviving candidates
        count: usize,
        /// Signatures of the surviving candidates
        signatures: Vec<String>,
    },

    /// Named member does not exist on the type
    #[error("No such member: {type_name}.{member}")]
    NoSuchMember {
        /// Type that was searched
        type_name: String,
        /// Requested member name
        member: String,
    },

    /// Value could not be converted for a specific argument position
    #[error("Cannot convert argument {position} from {actual} to {expected}")]
    Conversion {
        /// Zero-based argument position
        position: usize,
        /// Destination type name
        expected: String,
        /// Description of the supplied value
        actual: String,
    },

    /// Value does not have the required shape
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        actual: String,
    },

    /// Abstract member invoked without any implementation
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Single-threaded adapter entered from a foreign thread
    #[error("Adapter {type_name} was created on one thread and used from another")]
    CrossThreadAccess {
        /// Generated adapter type name
        type_name: String,
    },

    /// Error raised by script code
    #[error("Script error: {0}")]
    Script(String),

    /// Error raised by a host member body
    #[error("{type_name}: {message}")]
    Host {
        /// Type that raised the error
        type_name: String,
        /// Error message
        message: String,
    },
}

impl InteropError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            InteropError::InvalidAdapterSpec(_) | InteropError::NoAccessibleConstructor { .. } => {
                ErrorKind::Validation
            }
            InteropError::NoApplicableOverload { .. }
            | InteropError::AmbiguousOverload { .. }
            | InteropError::NoSuchMember { .. } => ErrorKind::Resolution,
            InteropError::Conversion { .. } | InteropError::TypeMismatch { .. } => {
                ErrorKind::Conversion
            }
            InteropError::CrossThreadAccess { .. } => ErrorKind::Fatal,
            InteropError::UnsupportedOperation(_)
            | InteropError::Script(_)
            | InteropError::Host { .. } => ErrorKind::Runtime,
        }
    }

    /// Whether the error signals misuse of the embedding rather than bad data
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }

    /// Shorthand for a host-side failure raised by `type_name`
    pub fn host(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        InteropError::Host {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

impl From<String> for InteropError {
    fn from(s: String) -> Self {
        InteropError::Script(s)
    }
}

impl From<&str> for InteropError {
    fn from(s: &str) -> Self {
        InteropError::Script(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overload_messages_list_signatures() {
        let err = InteropError::NoApplicableOverload {
            count: 2,
            signatures: vec!["f(int)".into(), "f(String)".into()],
        };
        assert_eq!(
            err.to_string(),
            "none of the 2 methods are compatible with the argument list:\nf(int)\nf(String)"
        );
        assert_eq!(err.kind(), ErrorKind::Resolution);
    }

    #[test]
    fn test_only_cross_thread_is_fatal() {
        let fatal = InteropError::CrossThreadAccess {
            type_name: "A$$Adapter".into(),
        };
        assert!(fatal.is_fatal());
        assert!(!InteropError::UnsupportedOperation("run".into()).is_fatal());
        assert_eq!(
            InteropError::InvalidAdapterSpec("x".into()).kind(),
            ErrorKind::Validation
        );
    }
}
