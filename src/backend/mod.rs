//! # Storage Backend Contract
//!
//! A backend is the storage collaborator behind a [`Repository`]. It works
//! entirely in its own *source* namespace (for example `file:///srv/data/`)
//! and never sees the public URIs callers use; the repository translates
//! every URI before calling in and after results come back.
//!
//! The contract is deliberately narrow: existence, description, content
//! streams, single-level listing, creation, deletion and property
//! alteration. Copy and move have optional fast paths. A backend that
//! returns [`Outcome::Declined`] leaves the work to the repository's generic
//! algorithms in [`crate::transfer`].
//!
//! Two adapters ship with the crate:
//!
//! - [`MemoryBackend`]: in-memory tree with flat string properties
//! - [`FileSystemBackend`]: local directories and files with description
//!   sidecar files
//!
//! [`Repository`]: crate::repository::Repository

pub mod filesystem;
pub mod memory;

use chrono::{DateTime, Utc};
use std::io::{self, Read, Write};
use url::Url;

use crate::alteration::ResourceAlteration;
use crate::error::{self, BackendResult, Error};
use crate::property::Resource;
use crate::repository::Repository;
use crate::transfer::ProgressListener;

pub use filesystem::FileSystemBackend;
pub use memory::MemoryBackend;

/// Readable content stream.
pub type ContentReader = Box<dyn Read + Send>;

/// Writable content stream. Content is committed by `flush` or on drop.
pub type ContentWriter = Box<dyn Write + Send>;

/// Translation shared by the bundled adapters: I/O failures carrying a
/// recognizable kind map onto the matching repository error, the rest take
/// the base mapping.
pub fn translate_io(uri: &Url, error: error::BackendError) -> Error {
    match error {
        error::BackendError::Io(source) => match source.kind() {
            io::ErrorKind::NotFound => Error::not_found(uri),
            io::ErrorKind::PermissionDenied => Error::forbidden(uri, source.to_string()),
            io::ErrorKind::AlreadyExists => Error::conflict(uri, source.to_string()),
            _ => error::translate(uri, error::BackendError::Io(source)),
        },
        other => error::translate(uri, other),
    }
}

/// A not-found failure for a source URI.
pub(crate) fn missing(uri: &Url) -> error::BackendError {
    error::BackendError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", uri),
    ))
}

/// Whether a backend handled an optional operation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Declined,
}

/// Storage primitives a repository is built on.
///
/// All URIs are normalized URIs in the backend's source namespace.
pub trait Backend: Send + Sync {
    /// Root collection of the backend's source namespace.
    fn source_root(&self) -> &Url;

    /// Backend-specific opening. Called at most once per open transition.
    fn open(&self) -> BackendResult<()> {
        Ok(())
    }

    /// Backend-specific closing.
    fn close(&self) -> BackendResult<()> {
        Ok(())
    }

    fn exists(&self, uri: &Url) -> BackendResult<bool>;

    /// Describe a resource, including its live properties.
    ///
    /// Fails with a not-found error if the resource does not exist.
    fn describe(&self, uri: &Url) -> BackendResult<Resource>;

    fn read(&self, uri: &Url) -> BackendResult<ContentReader>;

    /// Open the content of an existing resource for replacement, recording
    /// `modified` (or the current time) as its content modification time.
    fn write(&self, uri: &Url, modified: Option<DateTime<Utc>>) -> BackendResult<ContentWriter>;

    fn has_children(&self, uri: &Url) -> BackendResult<bool>;

    /// Describe the direct children of a collection in lexical URI order.
    fn list_children(&self, uri: &Url) -> BackendResult<Vec<Resource>>;

    /// Create (or replace) a resource with the given stored description and
    /// content. The parent collection must exist.
    fn create(&self, uri: &Url, description: &Resource, content: &[u8])
        -> BackendResult<Resource>;

    /// Create a resource and return a stream for its content.
    fn create_stream(&self, uri: &Url, description: &Resource) -> BackendResult<ContentWriter> {
        self.create(uri, description, &[])?;
        self.write(uri, description.modified())
    }

    /// Delete a resource and, for a collection, everything beneath it.
    fn delete(&self, uri: &Url) -> BackendResult<()>;

    /// Apply an alteration to the stored description, returning the result.
    ///
    /// The alteration never names live properties.
    fn alter_properties(
        &self,
        uri: &Url,
        alteration: &ResourceAlteration,
    ) -> BackendResult<Resource>;

    /// Copy inside this backend without going through content streams.
    fn copy_within(
        &self,
        _source: &Url,
        _destination: &Url,
        _overwrite: bool,
        _progress: &dyn ProgressListener,
    ) -> BackendResult<Outcome> {
        Ok(Outcome::Declined)
    }

    /// Move inside this backend, usually by renaming.
    fn move_within(
        &self,
        _source: &Url,
        _destination: &Url,
        _overwrite: bool,
        _progress: &dyn ProgressListener,
    ) -> BackendResult<Outcome> {
        Ok(Outcome::Declined)
    }

    /// Copy to a resource of another repository. `destination` is a public
    /// URI in that repository's namespace.
    fn copy_to(
        &self,
        _source: &Url,
        _repository: &Repository,
        _destination: &Url,
        _overwrite: bool,
        _progress: &dyn ProgressListener,
    ) -> BackendResult<Outcome> {
        Ok(Outcome::Declined)
    }

    /// Move to a resource of another repository.
    fn move_to(
        &self,
        _source: &Url,
        _repository: &Repository,
        _destination: &Url,
        _overwrite: bool,
        _progress: &dyn ProgressListener,
    ) -> BackendResult<Outcome> {
        Ok(Outcome::Declined)
    }

    /// Translate a low-level failure for the public `uri` into a repository
    /// error. Adapters extend the base mapping for their own failure types.
    fn translate_error(&self, uri: &Url, error: error::BackendError) -> Error {
        error::translate(uri, error)
    }
}
