//! # Error Handling
//!
//! This module defines the error taxonomy shared by every repository
//! operation. All failures surface as one `Error` enum built with
//! `thiserror`; callers that only care about the broad category use
//! [`Error::kind`], which maps each variant onto one of six kinds:
//!
//! - **invalid-argument**: URI outside the namespace, malformed alteration
//!   request, bad encoded-property text, circular copy/move target.
//! - **precondition**: closed repository with auto-open disabled, missing
//!   root URI at open time.
//! - **not-found**: resource absent where existence was required.
//! - **forbidden**: operation disallowed (read-only repository, deleting the
//!   repository root).
//! - **state-conflict**: overwrite disallowed but the destination exists.
//! - **io**: opaque backend failure, wrapped with context.
//!
//! Backends do not build `Error` values for every failure themselves. They
//! return a [`BackendError`], and the façade hands it to
//! `Backend::translate_error`, whose default is [`translate`].

use thiserror::Error;
use url::Url;

/// Main error type for repository operations
#[derive(Error, Debug)]
pub enum Error {
    /// The URI does not lie within the repository namespace.
    #[error("URI {uri} is not within repository root {root}")]
    OutsideNamespace { uri: String, root: String },

    /// The destination of a copy or move is the source or lies beneath it.
    #[error("Circular operation: cannot transfer {source_uri} to {destination}")]
    Circular {
        source_uri: String,
        destination: String,
    },

    /// A caller-supplied argument was rejected.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The repository is in the wrong state for the requested operation.
    #[error("Precondition not met: {message}")]
    Precondition { message: String },

    /// The resource does not exist.
    #[error("Resource not found: {uri}")]
    NotFound { uri: String },

    /// The operation is not allowed on this resource or repository.
    #[error("Forbidden operation on {uri}: {message}")]
    Forbidden { uri: String, message: String },

    /// The resource is in a state that conflicts with the request.
    #[error("Resource state conflict for {uri}: {message}")]
    StateConflict { uri: String, message: String },

    /// An opaque backend failure for a particular resource.
    #[error("Resource I/O error for {uri}: {source}")]
    ResourceIo {
        uri: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A TOML parsing error, wrapped from `toml::de::Error`.
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A JSON error from the structured description format.
    #[error("Description format error: {0}")]
    Json(#[from] serde_json::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// An error indicating that a lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },
}

/// The broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Precondition,
    NotFound,
    Forbidden,
    StateConflict,
    Io,
}

impl Error {
    /// Classify this error into the repository error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::OutsideNamespace { .. }
            | Error::Circular { .. }
            | Error::InvalidArgument { .. }
            | Error::Json(_)
            | Error::UrlParse(_)
            | Error::Glob(_)
            | Error::Yaml(_)
            | Error::Toml(_) => ErrorKind::InvalidArgument,
            Error::Precondition { .. } => ErrorKind::Precondition,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Forbidden { .. } => ErrorKind::Forbidden,
            Error::StateConflict { .. } => ErrorKind::StateConflict,
            Error::ResourceIo { .. } | Error::Io(_) | Error::LockPoisoned { .. } => ErrorKind::Io,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        Error::Precondition {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(uri: &Url) -> Self {
        Error::NotFound {
            uri: uri.to_string(),
        }
    }

    pub(crate) fn forbidden(uri: &Url, message: impl Into<String>) -> Self {
        Error::Forbidden {
            uri: uri.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn conflict(uri: &Url, message: impl Into<String>) -> Self {
        Error::StateConflict {
            uri: uri.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn poisoned(context: &str) -> Self {
        Error::LockPoisoned {
            context: context.to_string(),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Low-level failure reported by a storage backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend already knows the repository-level meaning of the failure.
    #[error(transparent)]
    Repository(#[from] Error),

    /// A backend-level precondition was violated.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// An I/O failure from the storage medium.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Any other backend failure.
    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// A convenient type alias for backend primitive results.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Base translation of a backend failure into a repository error.
///
/// Already-typed repository errors pass through unchanged, precondition
/// violations become state conflicts, and everything else is wrapped as a
/// resource I/O error that keeps the original cause.
pub fn translate(uri: &Url, error: BackendError) -> Error {
    match error {
        BackendError::Repository(error) => error,
        BackendError::Precondition(message) => Error::conflict(uri, message),
        BackendError::Io(source) => Error::ResourceIo {
            uri: uri.to_string(),
            source: Box::new(source),
        },
        BackendError::Other(source) => Error::ResourceIo {
            uri: uri.to_string(),
            source,
        },
    }
}
