//! Error types for SOMA operations

use thiserror::Error;

use crate::format::{ObjectType, StorageKind};

/// Result type for SOMA operations
pub type Result<T> = core::result::Result<T, SomaError>;

/// Errors that can occur during SOMA operations
#[derive(Error, Debug)]
pub enum SomaError {
    /// Label sequence length disagrees with a matrix dimension
    #[error("{axis} label count {labels} does not match matrix dimension {expected}")]
    DimensionMismatch {
        axis: &'static str,
        labels: usize,
        expected: usize,
    },

    /// Parallel coordinate columns have different lengths
    #[error("ragged coordinate batch: dim0={dim0} dim1={dim1} values={values}")]
    RaggedBatch {
        dim0: usize,
        dim1: usize,
        values: usize,
    },

    /// Source matrix buffers are internally inconsistent
    #[error("invalid matrix: {0}")]
    InvalidMatrix(String),

    /// Argument outside its accepted domain
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A stored coordinate names a label the caller did not supply
    #[error("label {label:?} not present in {axis} labels")]
    UnknownLabel { axis: &'static str, label: String },

    /// Required metadata entry is absent
    #[error("object at {uri} is missing metadata key {key:?}")]
    MissingMetadata { uri: String, key: &'static str },

    /// Encoding version tag is not an integer
    #[error("object at {uri} has unparseable encoding version {value:?}")]
    InvalidEncodingVersion { uri: String, value: String },

    /// Encoding version tag is newer than this library understands
    #[error("object at {uri} uses encoding version {found}; newest supported is {supported}")]
    FutureEncodingVersion {
        uri: String,
        found: u64,
        supported: u32,
    },

    /// Type tag is not one of the recognized object types
    #[error("object at {uri} has unknown object type {tag:?}")]
    UnknownObjectType { uri: String, tag: String },

    /// Type tag and storage shape disagree
    #[error("object at {uri} is tagged {object_type} but is stored as {kind}")]
    InconsistentObjectShape {
        uri: String,
        object_type: ObjectType,
        kind: StorageKind,
    },

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema or metadata document failed to (de)serialize
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Storage engine rejected the operation
    #[error("storage error: {0}")]
    Storage(String),

    /// An object already exists at the location
    #[error("object already exists at {0}")]
    AlreadyExists(String),

    /// No object exists at the location
    #[error("no object at {0}")]
    NotFound(String),

    /// Fragment bytes failed validation
    #[error("invalid fragment: {0}")]
    InvalidFragment(&'static str),
}

/// Coarse error taxonomy used by callers to decide how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller supplied inconsistent input; nothing was mutated
    Precondition,
    /// Stored object metadata could not be mapped to a typed object
    Classification,
    /// The storage layer failed or refused the operation
    Storage,
}

impl SomaError {
    /// Category this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            SomaError::DimensionMismatch { .. }
            | SomaError::RaggedBatch { .. }
            | SomaError::InvalidMatrix(_)
            | SomaError::InvalidArgument(_)
            | SomaError::UnknownLabel { .. } => ErrorCategory::Precondition,
            SomaError::MissingMetadata { .. }
            | SomaError::InvalidEncodingVersion { .. }
            | SomaError::FutureEncodingVersion { .. }
            | SomaError::UnknownObjectType { .. }
            | SomaError::InconsistentObjectShape { .. } => ErrorCategory::Classification,
            SomaError::Io(_)
            | SomaError::Json(_)
            | SomaError::Storage(_)
            | SomaError::AlreadyExists(_)
            | SomaError::NotFound(_)
            | SomaError::InvalidFragment(_) => ErrorCategory::Storage,
        }
    }

    /// True for classification failures
    pub fn is_classification(&self) -> bool {
        self.category() == ErrorCategory::Classification
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        SomaError::Storage(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        SomaError::InvalidArgument(msg.into())
    }

    /// Create an invalid matrix error
    pub fn invalid_matrix(msg: impl Into<String>) -> Self {
        SomaError::InvalidMatrix(msg.into())
    }
}
