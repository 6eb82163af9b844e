//! Error types and handling for API compatibility checking

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for apivet operations
///
/// Compatibility findings are never errors; they are [`crate::issues::Issue`]
/// values collected by the comparator. This type covers the fatal cases:
/// broken input models, broken configuration, and I/O at the edges.
#[derive(Debug, Error)]
pub enum ApiVetError {
    /// Two classes in one codebase share a qualified name
    #[error("Duplicate class '{name}' in {codebase} codebase")]
    DuplicateClass { name: String, codebase: String },

    /// The supertype graph contains a cycle
    #[error("Inheritance cycle detected: {chain}")]
    InheritanceCycle { chain: String },

    /// A member refers to a containing class that is not in its codebase
    #[error("Member '{member}' references unknown class '{class}'")]
    DanglingMember { member: String, class: String },

    /// Signature file could not be parsed into a model
    #[error("Signature error at line {line}: {message}")]
    SignatureError { message: String, line: usize },

    /// Configuration loading or validation errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// A severity override names an issue kind that does not exist
    #[error("Unknown issue kind '{name}' in severity override")]
    UnknownIssueKind { name: String },

    /// Baseline file is malformed
    #[error("Baseline error: {message}")]
    BaselineError { message: String },

    /// File system I/O errors
    #[error("IO error for path '{path}': {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Structural,
    Signature,
    Config,
    Baseline,
    Io,
    Internal,
}

impl ApiVetError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiVetError::DuplicateClass { .. }
            | ApiVetError::InheritanceCycle { .. }
            | ApiVetError::DanglingMember { .. } => ErrorKind::Structural,
            ApiVetError::SignatureError { .. } => ErrorKind::Signature,
            ApiVetError::ConfigError { .. } | ApiVetError::UnknownIssueKind { .. } => {
                ErrorKind::Config
            }
            ApiVetError::BaselineError { .. } => ErrorKind::Baseline,
            ApiVetError::IoError { .. } => ErrorKind::Io,
            ApiVetError::InternalError { .. } => ErrorKind::Internal,
        }
    }

    /// Structural errors abort the whole comparison before any issue is reported
    pub fn is_structural(&self) -> bool {
        self.kind() == ErrorKind::Structural
    }

    /// Create a duplicate-class error
    pub fn duplicate_class(name: impl Into<String>, codebase: impl Into<String>) -> Self {
        Self::DuplicateClass {
            name: name.into(),
            codebase: codebase.into(),
        }
    }

    /// Create an inheritance-cycle error from the offending chain
    pub fn inheritance_cycle(chain: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let chain: Vec<String> = chain.into_iter().map(Into::into).collect();
        Self::InheritanceCycle {
            chain: chain.join(" -> "),
        }
    }

    /// Create a signature parse error
    pub fn signature_error(message: impl Into<String>, line: usize) -> Self {
        Self::SignatureError {
            message: message.into(),
            line,
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a baseline error
    pub fn baseline_error(message: impl Into<String>) -> Self {
        Self::BaselineError {
            message: message.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ApiVetError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            path: PathBuf::new(),
            source: err,
        }
    }
}
