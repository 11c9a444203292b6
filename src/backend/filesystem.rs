//! Local filesystem backend.
//!
//! Collections are directories and other resources are files. Descriptions
//! and collection content live next to the data in reserved files:
//!
//! | Resource | Content | Stored description |
//! |---|---|---|
//! | `dir/name` | `dir/name` | `dir/name@` |
//! | `dir/sub/` | `dir/sub/@` | `dir/sub/@@` |
//!
//! Names ending in [`RESERVED_SUFFIX`] are never listed and cannot be
//! addressed. Descriptions use the structured description format.

use chrono::{DateTime, Utc};
use log::debug;
use std::fs::{self, File, Metadata};
use std::io::{self, BufWriter, Cursor};
use std::path::{Path, PathBuf};
use url::Url;
use walkdir::WalkDir;

use super::{translate_io, Backend, ContentReader, ContentWriter, Outcome};
use crate::alteration::ResourceAlteration;
use crate::codec;
use crate::error::{BackendError, BackendResult, Error, Result};
use crate::property::{vocab, Resource};
use crate::transfer::ProgressListener;
use crate::uri;

/// Suffix marking the reserved files that hold descriptions and collection
/// content.
pub const RESERVED_SUFFIX: char = '@';

/// File holding the content of a collection.
const COLLECTION_CONTENT: &str = "@";

/// File holding the description of a collection.
const COLLECTION_DESCRIPTION: &str = "@@";

fn is_reserved(name: &str) -> bool {
    name.ends_with(RESERVED_SUFFIX)
}

fn timestamp(time: io::Result<std::time::SystemTime>) -> Option<DateTime<Utc>> {
    time.ok().map(DateTime::<Utc>::from)
}

/// A repository backend over a local directory tree.
#[derive(Debug, Clone)]
pub struct FileSystemBackend {
    root: Url,
    base: PathBuf,
}

impl FileSystemBackend {
    /// Serve the directory at `path`, creating it if necessary.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        fs::create_dir_all(path)?;
        let base = fs::canonicalize(path)?;
        let root = Url::from_directory_path(&base).map_err(|_| {
            Error::invalid(format!("{} cannot be expressed as a file URI", base.display()))
        })?;
        Ok(Self {
            root: uri::normalize(&root),
            base,
        })
    }

    fn check_name(uri: &Url) -> BackendResult<()> {
        match uri::name(uri) {
            Some(name) if is_reserved(&name) => Err(Error::invalid(format!(
                "{} uses a reserved name ending in '{}'",
                uri, RESERVED_SUFFIX
            ))
            .into()),
            _ => Ok(()),
        }
    }

    /// The file or directory of a resource.
    fn path(&self, uri: &Url) -> BackendResult<PathBuf> {
        Self::check_name(uri)?;
        let path = uri
            .to_file_path()
            .map_err(|_| Error::invalid(format!("{} is not a local file URI", uri)))?;
        Ok(path.components().collect())
    }

    fn content_path(&self, uri: &Url) -> BackendResult<PathBuf> {
        let path = self.path(uri)?;
        Ok(if uri::is_collection(uri) {
            path.join(COLLECTION_CONTENT)
        } else {
            path
        })
    }

    fn description_path(&self, uri: &Url) -> BackendResult<PathBuf> {
        let path = self.path(uri)?;
        if uri::is_collection(uri) {
            return Ok(path.join(COLLECTION_DESCRIPTION));
        }
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::invalid(format!("{} has no file name", uri)))?;
        Ok(path.with_file_name(format!("{}{}", name, RESERVED_SUFFIX)))
    }

    fn uri_for(&self, path: &Path, is_dir: bool) -> BackendResult<Url> {
        let uri = if is_dir {
            Url::from_directory_path(path)
        } else {
            Url::from_file_path(path)
        };
        uri.map(|uri| uri::normalize(&uri)).map_err(|_| {
            Error::invalid(format!("{} cannot be expressed as a file URI", path.display())).into()
        })
    }

    /// Metadata of an existing resource whose kind matches its URI.
    fn metadata(&self, uri: &Url) -> BackendResult<Metadata> {
        let metadata = fs::metadata(self.path(uri)?)?;
        if metadata.is_dir() != uri::is_collection(uri) {
            return Err(super::missing(uri));
        }
        Ok(metadata)
    }

    fn stored(&self, uri: &Url) -> BackendResult<Resource> {
        match fs::read_to_string(self.description_path(uri)?) {
            Ok(text) => {
                let mut resource = codec::parse_description(uri, &text)?;
                resource.set_uri(uri.clone());
                Ok(resource)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Resource::new(uri.clone())),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, resource: &Resource) -> BackendResult<()> {
        let text = codec::format_description(resource.uri(), resource)?;
        fs::write(self.description_path(resource.uri())?, text)?;
        Ok(())
    }

    fn record_modified(&self, uri: &Url, modified: DateTime<Utc>) -> BackendResult<()> {
        let mut stored = self.stored(uri)?;
        stored.set_property(vocab::content_modified().clone(), modified);
        self.store(&stored)
    }

    fn remove(&self, uri: &Url) -> BackendResult<()> {
        if uri::is_collection(uri) {
            fs::remove_dir_all(self.path(uri)?)?;
            return Ok(());
        }
        fs::remove_file(self.path(uri)?)?;
        match fs::remove_file(self.description_path(uri)?) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Make room for a transfer destination.
    fn clear_destination(&self, destination: &Url, overwrite: bool) -> BackendResult<()> {
        if self.exists(destination)? {
            if !overwrite {
                return Err(BackendError::Precondition(format!(
                    "{} already exists",
                    destination
                )));
            }
            self.remove(destination)?;
        }
        Ok(())
    }

    fn copy_tree(&self, from: &Path, to: &Path, progress: &dyn ProgressListener) -> BackendResult<u64> {
        let mut copied = 0u64;
        for entry in WalkDir::new(from).sort_by_file_name() {
            let entry = entry.map_err(|e| BackendError::Other(Box::new(e)))?;
            let relative = entry
                .path()
                .strip_prefix(from)
                .map_err(|e| BackendError::Other(Box::new(e)))?;
            let target = to.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir(&target)?;
            } else {
                copied += fs::copy(entry.path(), &target)?;
                progress.progress(copied, None);
            }
        }
        Ok(copied)
    }
}

impl Backend for FileSystemBackend {
    fn source_root(&self) -> &Url {
        &self.root
    }

    fn open(&self) -> BackendResult<()> {
        if !self.base.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", self.base.display()),
            )
            .into());
        }
        debug!("Serving {}", self.base.display());
        Ok(())
    }

    fn exists(&self, uri: &Url) -> BackendResult<bool> {
        if Self::check_name(uri).is_err() {
            return Ok(false);
        }
        match fs::metadata(self.path(uri)?) {
            Ok(metadata) => Ok(metadata.is_dir() == uri::is_collection(uri)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self, uri: &Url) -> BackendResult<Resource> {
        let metadata = self.metadata(uri)?;
        let mut resource = self.stored(uri)?;
        let (length, accessed, modified) = if uri::is_collection(uri) {
            match fs::metadata(self.content_path(uri)?) {
                Ok(content) => (
                    content.len(),
                    timestamp(content.accessed()),
                    timestamp(content.modified()),
                ),
                Err(_) => (0, timestamp(metadata.accessed()), timestamp(metadata.modified())),
            }
        } else {
            (
                metadata.len(),
                timestamp(metadata.accessed()),
                timestamp(metadata.modified()),
            )
        };
        resource.set_property(
            vocab::content_length().clone(),
            i64::try_from(length).unwrap_or(i64::MAX),
        );
        if let Some(accessed) = accessed {
            resource.set_property(vocab::content_accessed().clone(), accessed);
        }
        if resource.modified().is_none() {
            if let Some(modified) = modified {
                resource.set_property(vocab::content_modified().clone(), modified);
            }
        }
        Ok(resource)
    }

    fn read(&self, uri: &Url) -> BackendResult<ContentReader> {
        self.metadata(uri)?;
        match File::open(self.content_path(uri)?) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound && uri::is_collection(uri) => {
                Ok(Box::new(Cursor::new(Vec::new())))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, uri: &Url, modified: Option<DateTime<Utc>>) -> BackendResult<ContentWriter> {
        self.metadata(uri)?;
        self.record_modified(uri, modified.unwrap_or_else(Utc::now))?;
        let file = File::create(self.content_path(uri)?)?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn has_children(&self, uri: &Url) -> BackendResult<bool> {
        if !uri::is_collection(uri) {
            return Ok(false);
        }
        for entry in fs::read_dir(self.path(uri)?)? {
            if !is_reserved(&entry?.file_name().to_string_lossy()) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn list_children(&self, uri: &Url) -> BackendResult<Vec<Resource>> {
        self.metadata(uri)?;
        let mut children = Vec::new();
        for entry in fs::read_dir(self.path(uri)?)? {
            let entry = entry?;
            if is_reserved(&entry.file_name().to_string_lossy()) {
                continue;
            }
            let child = self.uri_for(&entry.path(), entry.file_type()?.is_dir())?;
            children.push(self.describe(&child)?);
        }
        children.sort_by(|a, b| a.uri().as_str().cmp(b.uri().as_str()));
        Ok(children)
    }

    fn create(&self, uri: &Url, description: &Resource, content: &[u8]) -> BackendResult<Resource> {
        let path = self.path(uri)?;
        let mut stored = description.clone();
        stored.set_uri(uri.clone());
        if stored.modified().is_none() {
            stored.set_property(vocab::content_modified().clone(), Utc::now());
        }

        if uri::is_collection(uri) {
            if path.exists() {
                return Err(BackendError::Precondition(format!(
                    "collection {} already exists",
                    uri
                )));
            }
            fs::create_dir(&path)?;
            if !content.is_empty() {
                fs::write(self.content_path(uri)?, content)?;
            }
        } else {
            if path.is_dir() {
                return Err(BackendError::Precondition(format!(
                    "{} exists as a collection",
                    uri
                )));
            }
            fs::write(&path, content)?;
        }
        self.store(&stored)?;
        self.describe(uri)
    }

    fn delete(&self, uri: &Url) -> BackendResult<()> {
        if uri == &self.root {
            return Err(BackendError::Precondition(
                "the backend root cannot be deleted".to_string(),
            ));
        }
        self.metadata(uri)?;
        self.remove(uri)
    }

    fn alter_properties(
        &self,
        uri: &Url,
        alteration: &ResourceAlteration,
    ) -> BackendResult<Resource> {
        self.metadata(uri)?;
        let mut stored = self.stored(uri)?;
        alteration.apply(&mut stored);
        self.store(&stored)?;
        self.describe(uri)
    }

    fn copy_within(
        &self,
        source: &Url,
        destination: &Url,
        overwrite: bool,
        progress: &dyn ProgressListener,
    ) -> BackendResult<Outcome> {
        self.metadata(source)?;
        self.clear_destination(destination, overwrite)?;
        if uri::is_collection(source) {
            self.copy_tree(&self.path(source)?, &self.path(destination)?, progress)?;
        } else {
            let copied = fs::copy(self.path(source)?, self.path(destination)?)?;
            progress.progress(copied, Some(copied));
            match fs::copy(self.description_path(source)?, self.description_path(destination)?) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
        }
        Ok(Outcome::Completed)
    }

    fn move_within(
        &self,
        source: &Url,
        destination: &Url,
        overwrite: bool,
        _progress: &dyn ProgressListener,
    ) -> BackendResult<Outcome> {
        self.metadata(source)?;
        self.clear_destination(destination, overwrite)?;
        fs::rename(self.path(source)?, self.path(destination)?)?;
        if !uri::is_collection(source) {
            match fs::rename(self.description_path(source)?, self.description_path(destination)?) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
        }
        debug!("Renamed {} -> {}", source, destination);
        Ok(Outcome::Completed)
    }

    fn translate_error(&self, uri: &Url, error: BackendError) -> Error {
        translate_io(uri, error)
    }
}
