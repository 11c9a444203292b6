//! In-memory backend.
//!
//! Resources live in one ordered map keyed by source URI. Every property is
//! stored as a single flat string per property URI, the way a WebDAV
//! dead-property store holds them, so multi-valued and typed properties go
//! through [`codec::encode_properties`] on the way in and
//! [`codec::decode_properties`] (with legacy namespace migration) on the way
//! out.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::io::{self, Cursor, Write};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use url::Url;

use super::{missing, translate_io, Backend, ContentReader, ContentWriter, Outcome};
use crate::alteration::ResourceAlteration;
use crate::codec::{self, LegacyNamespaces};
use crate::error::{BackendError, BackendResult, Error};
use crate::property::{vocab, Resource};
use crate::transfer::ProgressListener;
use crate::uri;

/// Content plus flat stored properties of one resource.
#[derive(Debug, Clone, Default)]
struct Entry {
    content: Vec<u8>,
    properties: BTreeMap<String, String>,
    accessed: Option<DateTime<Utc>>,
}

type Entries = Arc<RwLock<BTreeMap<String, Entry>>>;

fn read_entries(entries: &Entries) -> BackendResult<RwLockReadGuard<'_, BTreeMap<String, Entry>>> {
    entries
        .read()
        .map_err(|_| Error::poisoned("memory backend").into())
}

fn write_entries(entries: &Entries) -> BackendResult<RwLockWriteGuard<'_, BTreeMap<String, Entry>>> {
    entries
        .write()
        .map_err(|_| Error::poisoned("memory backend").into())
}

impl Entry {
    fn stored(&self, uri: &Url, legacy: &LegacyNamespaces) -> BackendResult<Resource> {
        let mut resource = Resource::new(uri.clone());
        codec::decode_properties(&mut resource, &self.properties, legacy)?;
        Ok(resource)
    }

    fn describe(&self, uri: &Url, legacy: &LegacyNamespaces) -> BackendResult<Resource> {
        let mut resource = self.stored(uri, legacy)?;
        resource.set_property(
            vocab::content_length().clone(),
            i64::try_from(self.content.len()).unwrap_or(i64::MAX),
        );
        if let Some(accessed) = self.accessed {
            resource.set_property(vocab::content_accessed().clone(), accessed);
        }
        Ok(resource)
    }

    fn store(&mut self, resource: &Resource) -> BackendResult<()> {
        self.properties = codec::encode_properties(resource)?;
        Ok(())
    }

    fn replace_content(
        &mut self,
        uri: &Url,
        legacy: &LegacyNamespaces,
        content: Vec<u8>,
        modified: DateTime<Utc>,
    ) -> BackendResult<()> {
        let mut resource = self.stored(uri, legacy)?;
        resource.set_property(vocab::content_modified().clone(), modified);
        self.store(&resource)?;
        self.content = content;
        Ok(())
    }
}

/// Write stream that replaces the content of one entry when flushed or
/// dropped.
struct MemoryWriter {
    entries: Entries,
    uri: Url,
    legacy: LegacyNamespaces,
    modified: DateTime<Utc>,
    buffer: Vec<u8>,
    dirty: bool,
}

impl MemoryWriter {
    fn commit(&mut self) -> BackendResult<()> {
        let mut entries = write_entries(&self.entries)?;
        let entry = entries
            .get_mut(self.uri.as_str())
            .ok_or_else(|| missing(&self.uri))?;
        entry.replace_content(&self.uri, &self.legacy, self.buffer.clone(), self.modified)?;
        self.dirty = false;
        Ok(())
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.dirty = true;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit().map_err(io::Error::other)
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(e) = self.commit() {
                warn!("Discarding content written to {}: {}", self.uri, e);
            }
        }
    }
}

/// A repository backend held entirely in memory. Clones share storage.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    root: Url,
    entries: Entries,
    legacy: LegacyNamespaces,
}

impl MemoryBackend {
    /// Create an empty backend in the namespace `mem://<name>/`.
    ///
    /// Characters that cannot appear in a host name are replaced with `-`.
    pub fn new(name: &str) -> Self {
        let host: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_') {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();
        let host = if host.is_empty() { "memory".to_string() } else { host };
        let root = Url::parse(&format!("mem://{}/", host))
            .expect("sanitized memory namespace is a valid URI");
        let mut entries = BTreeMap::new();
        entries.insert(root.to_string(), Entry::default());
        Self {
            root,
            entries: Arc::new(RwLock::new(entries)),
            legacy: LegacyNamespaces::default(),
        }
    }

    /// Replace the legacy namespace migrations applied when reading.
    pub fn with_legacy_namespaces(mut self, legacy: LegacyNamespaces) -> Self {
        self.legacy = legacy;
        self
    }

    /// Store raw flat properties for an existing resource, bypassing the
    /// codec. Useful for seeding data written by older clients.
    pub fn insert_raw_properties(
        &self,
        uri: &Url,
        properties: BTreeMap<String, String>,
    ) -> BackendResult<()> {
        let mut entries = write_entries(&self.entries)?;
        let entry = entries.get_mut(uri.as_str()).ok_or_else(|| missing(uri))?;
        entry.properties.extend(properties);
        Ok(())
    }

    /// Keys of `uri` and everything beneath it.
    fn subtree(entries: &BTreeMap<String, Entry>, uri: &Url) -> Vec<String> {
        if !uri::is_collection(uri) {
            return entries
                .contains_key(uri.as_str())
                .then(|| uri.to_string())
                .into_iter()
                .collect();
        }
        entries
            .range(uri.to_string()..)
            .take_while(|(key, _)| key.starts_with(uri.as_str()))
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn check_parent(&self, entries: &BTreeMap<String, Entry>, uri: &Url) -> BackendResult<()> {
        match uri::parent_uri(&self.root, uri) {
            Some(parent) if !entries.contains_key(parent.as_str()) => Err(missing(&parent)),
            _ => Ok(()),
        }
    }

    /// Copy (and optionally remove) a subtree under a new prefix.
    fn transplant(
        &self,
        source: &Url,
        destination: &Url,
        overwrite: bool,
        remove_source: bool,
        progress: &dyn ProgressListener,
    ) -> BackendResult<Outcome> {
        let mut entries = write_entries(&self.entries)?;
        let keys = Self::subtree(&entries, source);
        if keys.is_empty() {
            return Err(missing(source));
        }
        if entries.contains_key(destination.as_str()) {
            if !overwrite {
                return Err(BackendError::Precondition(format!(
                    "{} already exists",
                    destination
                )));
            }
            for key in Self::subtree(&entries, destination) {
                entries.remove(&key);
            }
        }
        self.check_parent(&entries, destination)?;

        let mut moved = Vec::with_capacity(keys.len());
        let mut total = 0u64;
        for key in &keys {
            let suffix = &key[source.as_str().len()..];
            let entry = if remove_source {
                entries.remove(key)
            } else {
                entries.get(key).cloned()
            };
            if let Some(entry) = entry {
                total += entry.content.len() as u64;
                moved.push((format!("{}{}", destination, suffix), entry));
            }
        }
        entries.extend(moved);
        progress.progress(total, Some(total));
        debug!(
            "Memory backend {} {} -> {}",
            if remove_source { "moved" } else { "copied" },
            source,
            destination
        );
        Ok(Outcome::Completed)
    }
}

impl Backend for MemoryBackend {
    fn source_root(&self) -> &Url {
        &self.root
    }

    fn exists(&self, uri: &Url) -> BackendResult<bool> {
        Ok(read_entries(&self.entries)?.contains_key(uri.as_str()))
    }

    fn describe(&self, uri: &Url) -> BackendResult<Resource> {
        let entries = read_entries(&self.entries)?;
        let entry = entries.get(uri.as_str()).ok_or_else(|| missing(uri))?;
        entry.describe(uri, &self.legacy)
    }

    fn read(&self, uri: &Url) -> BackendResult<ContentReader> {
        let mut entries = write_entries(&self.entries)?;
        let entry = entries.get_mut(uri.as_str()).ok_or_else(|| missing(uri))?;
        entry.accessed = Some(Utc::now());
        Ok(Box::new(Cursor::new(entry.content.clone())))
    }

    fn write(&self, uri: &Url, modified: Option<DateTime<Utc>>) -> BackendResult<ContentWriter> {
        if !read_entries(&self.entries)?.contains_key(uri.as_str()) {
            return Err(missing(uri));
        }
        Ok(Box::new(MemoryWriter {
            entries: Arc::clone(&self.entries),
            uri: uri.clone(),
            legacy: self.legacy.clone(),
            modified: modified.unwrap_or_else(Utc::now),
            buffer: Vec::new(),
            dirty: true,
        }))
    }

    fn has_children(&self, uri: &Url) -> BackendResult<bool> {
        if !uri::is_collection(uri) {
            return Ok(false);
        }
        let entries = read_entries(&self.entries)?;
        Ok(entries
            .range(uri.to_string()..)
            .take_while(|(key, _)| key.starts_with(uri.as_str()))
            .any(|(key, _)| key.as_str() != uri.as_str()))
    }

    fn list_children(&self, uri: &Url) -> BackendResult<Vec<Resource>> {
        let entries = read_entries(&self.entries)?;
        if !entries.contains_key(uri.as_str()) {
            return Err(missing(uri));
        }
        let mut children = Vec::new();
        for (key, entry) in entries
            .range(uri.to_string()..)
            .take_while(|(key, _)| key.starts_with(uri.as_str()))
        {
            let rest = &key[uri.as_str().len()..];
            let direct = !rest.is_empty()
                && rest
                    .trim_end_matches(uri::PATH_SEPARATOR)
                    .find(uri::PATH_SEPARATOR)
                    .is_none();
            if direct {
                children.push(entry.describe(&Url::parse(key).map_err(Error::from)?, &self.legacy)?);
            }
        }
        Ok(children)
    }

    fn create(&self, uri: &Url, description: &Resource, content: &[u8]) -> BackendResult<Resource> {
        let mut entries = write_entries(&self.entries)?;
        self.check_parent(&entries, uri)?;
        if uri::is_collection(uri) && entries.contains_key(uri.as_str()) {
            return Err(BackendError::Precondition(format!(
                "collection {} already exists",
                uri
            )));
        }
        let mut stored = description.clone();
        stored.set_uri(uri.clone());
        if stored.modified().is_none() {
            stored.set_property(vocab::content_modified().clone(), Utc::now());
        }
        let mut entry = Entry {
            content: content.to_vec(),
            ..Entry::default()
        };
        entry.store(&stored)?;
        let described = entry.describe(uri, &self.legacy)?;
        entries.insert(uri.to_string(), entry);
        Ok(described)
    }

    fn delete(&self, uri: &Url) -> BackendResult<()> {
        if uri == &self.root {
            return Err(BackendError::Precondition(
                "the backend root cannot be deleted".to_string(),
            ));
        }
        let mut entries = write_entries(&self.entries)?;
        let keys = Self::subtree(&entries, uri);
        if keys.is_empty() {
            return Err(missing(uri));
        }
        for key in keys {
            entries.remove(&key);
        }
        Ok(())
    }

    fn alter_properties(
        &self,
        uri: &Url,
        alteration: &ResourceAlteration,
    ) -> BackendResult<Resource> {
        let mut entries = write_entries(&self.entries)?;
        let entry = entries.get_mut(uri.as_str()).ok_or_else(|| missing(uri))?;
        let mut stored = entry.stored(uri, &self.legacy)?;
        alteration.apply(&mut stored);
        entry.store(&stored)?;
        entry.describe(uri, &self.legacy)
    }

    fn copy_within(
        &self,
        source: &Url,
        destination: &Url,
        overwrite: bool,
        progress: &dyn ProgressListener,
    ) -> BackendResult<Outcome> {
        self.transplant(source, destination, overwrite, false, progress)
    }

    fn move_within(
        &self,
        source: &Url,
        destination: &Url,
        overwrite: bool,
        progress: &dyn ProgressListener,
    ) -> BackendResult<Outcome> {
        self.transplant(source, destination, overwrite, true, progress)
    }

    fn translate_error(&self, uri: &Url, error: BackendError) -> Error {
        translate_io(uri, error)
    }
}
