use sift_core_types::{GroupId, PredicateId};
use thiserror::Error;

/// Result type alias using SiftError
pub type Result<T> = std::result::Result<T, SiftError>;

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and log assertions.
///
/// Unresolvable selections and rejected moves are not errors: they are
/// reported in-band (`selection_error`, `MoveOutcome::Rejected`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Structural
    NotFound,
    InvalidIndex,
    KindMismatch,

    // Catalog
    UnknownKind,
    MissingBehavior,
    DuplicateKind,
    NotValidated,

    // Persistence / configuration
    InvalidState,
    Serialization,
    Config,
    Io,
}

impl ErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "ERR_NOT_FOUND",
            ErrorKind::InvalidIndex => "ERR_INVALID_INDEX",
            ErrorKind::KindMismatch => "ERR_KIND_MISMATCH",
            ErrorKind::UnknownKind => "ERR_UNKNOWN_KIND",
            ErrorKind::MissingBehavior => "ERR_MISSING_BEHAVIOR",
            ErrorKind::DuplicateKind => "ERR_DUPLICATE_KIND",
            ErrorKind::NotValidated => "ERR_NOT_VALIDATED",
            ErrorKind::InvalidState => "ERR_INVALID_STATE",
            ErrorKind::Serialization => "ERR_SERIALIZATION",
            ErrorKind::Config => "ERR_CONFIG",
            ErrorKind::Io => "ERR_IO",
        }
    }
}

/// Error taxonomy for predicate tree operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SiftError {
    // ===== Structural Errors =====
    /// No group with this id exists in the tree
    #[error("Group not found: {group_id}")]
    GroupNotFound { group_id: GroupId },

    /// No predicate with this id exists in the tree
    #[error("Predicate not found: {predicate_id}")]
    PredicateNotFound { predicate_id: PredicateId },

    /// Insert position past the end of the group
    #[error("Index {index} out of range for group of {len} members")]
    IndexOutOfRange { index: usize, len: usize },

    /// Predicate's behavior is not the one the caller asked for
    #[error("Predicate {predicate_id} is not a {expected} predicate")]
    KindMismatch {
        predicate_id: PredicateId,
        expected: String,
    },

    // ===== Catalog Errors =====
    /// Kind was never declared in the catalog
    #[error("Unknown predicate kind: {kind}")]
    UnknownKind { kind: String },

    /// Kind is declared without a usable behavior
    #[error("Predicate kind '{kind}' has no registered behavior (declared: {behavior})")]
    MissingBehavior { kind: String, behavior: String },

    /// Kind declared twice
    #[error("Predicate kind declared more than once: {kind}")]
    DuplicateKind { kind: String },

    /// Catalog used before a successful validation pass
    #[error("Catalog has not been validated")]
    CatalogNotValidated,

    // ===== Persistence / Configuration Errors =====
    /// Persisted state for a kind could not be restored
    #[error("Invalid state for kind '{kind}': {reason}")]
    InvalidState { kind: String, reason: String },

    /// JSON serialization or deserialization failure
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Configuration could not be parsed
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Configuration file could not be read
    #[error("I/O error: {message}")]
    Io { message: String },
}

impl SiftError {
    /// Create an invalid state error
    pub fn invalid_state(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SiftError::GroupNotFound { .. } | SiftError::PredicateNotFound { .. } => {
                ErrorKind::NotFound
            }
            SiftError::IndexOutOfRange { .. } => ErrorKind::InvalidIndex,
            SiftError::KindMismatch { .. } => ErrorKind::KindMismatch,
            SiftError::UnknownKind { .. } => ErrorKind::UnknownKind,
            SiftError::MissingBehavior { .. } => ErrorKind::MissingBehavior,
            SiftError::DuplicateKind { .. } => ErrorKind::DuplicateKind,
            SiftError::CatalogNotValidated => ErrorKind::NotValidated,
            SiftError::InvalidState { .. } => ErrorKind::InvalidState,
            SiftError::Serialization { .. } => ErrorKind::Serialization,
            SiftError::Config { .. } => ErrorKind::Config,
            SiftError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Stable error code for this error
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }
}

impl From<serde_json::Error> for SiftError {
    fn from(err: serde_json::Error) -> Self {
        SiftError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for SiftError {
    fn from(err: toml::de::Error) -> Self {
        SiftError::Config {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for SiftError {
    fn from(err: std::io::Error) -> Self {
        SiftError::Io {
            message: err.to_string(),
        }
    }
}
