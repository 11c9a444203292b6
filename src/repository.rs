//! # Repository Façade
//!
//! This module provides [`Repository`], the public entry point for every
//! resource operation. A repository owns one [`Backend`] and wraps it with
//! the behaviour every backend must honour identically:
//!
//! - **URI checking**: each operation normalizes its URI and verifies that
//!   it lies inside the repository namespace before anything else happens.
//! - **Namespace translation**: callers use *public* URIs under the
//!   repository root; the backend sees *source* URIs under its own root.
//!   Resource-valued properties pointing inside the namespace are translated
//!   in both directions too.
//! - **Sub-repository routing**: other repositories can be mounted at
//!   collection paths. An operation on a URI owned by a mount is delegated
//!   to that repository's public API.
//! - **Lifecycle**: operations on a closed repository either open it
//!   transparently (auto-open) or fail with a precondition error.
//! - **Live properties**: never stored, never altered.
//! - **Read-only policy** and **copy/move orchestration**, falling back on
//!   the generic algorithms in [`crate::transfer`] whenever a backend
//!   declines a fast path.
//!
//! Repositories are always handled through `Arc<Repository>`; mounting links
//! a child to its parent with a weak back-reference.

use chrono::{DateTime, Utc};
use log::{debug, error};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use url::Url;

use crate::alteration::ResourceAlteration;
use crate::backend::{Backend, ContentReader, ContentWriter, Outcome};
use crate::error::{self, BackendError, Error, Result};
use crate::filter::ResourceFilter;
use crate::lifecycle::Lifecycle;
use crate::property::{vocab, LiveProperties, PropertyMap, PropertyValue, Resource};
use crate::router::{self, Router};
use crate::transfer::{self, ProgressListener};
use crate::uri::{self, SourceMapping};

/// Listing depth that descends every level.
pub const INFINITE_DEPTH: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    Copy,
    Move,
}

fn read_lock<'a, T>(lock: &'a RwLock<T>, context: &str) -> Result<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| Error::poisoned(context))
}

fn write_lock<'a, T>(lock: &'a RwLock<T>, context: &str) -> Result<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| Error::poisoned(context))
}

type Convert<'a> = &'a dyn Fn(&Url) -> Result<Url>;

fn remap_value(value: &PropertyValue, from_root: &Url, convert: Convert) -> Result<PropertyValue> {
    match value {
        PropertyValue::Resource(target) if uri::is_within(from_root, target) => {
            Ok(PropertyValue::Resource(convert(target)?))
        }
        other => Ok(other.clone()),
    }
}

fn remap_properties(
    properties: &PropertyMap,
    from_root: &Url,
    convert: Convert,
) -> Result<PropertyMap> {
    let mut remapped = PropertyMap::new();
    for (property, value) in properties.iter() {
        remapped.add(property.clone(), remap_value(value, from_root, convert)?);
    }
    Ok(remapped)
}

/// A URI-addressed resource store backed by one [`Backend`].
pub struct Repository {
    this: Weak<Repository>,
    backend: Box<dyn Backend>,
    mapping: RwLock<Option<SourceMapping>>,
    read_only: AtomicBool,
    auto_open: AtomicBool,
    live: RwLock<Arc<LiveProperties>>,
    lifecycle: Lifecycle,
    router: RwLock<Router>,
    parent: RwLock<Weak<Repository>>,
}

impl Repository {
    /// Create a closed repository without a root URI.
    ///
    /// The root must be set with [`Repository::set_root_uri`] (or by mounting
    /// the repository) before it can be opened. Auto-open is enabled.
    pub fn new(backend: Box<dyn Backend>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            backend,
            mapping: RwLock::new(None),
            read_only: AtomicBool::new(false),
            auto_open: AtomicBool::new(true),
            live: RwLock::new(Arc::new(LiveProperties::default())),
            lifecycle: Lifecycle::new(),
            router: RwLock::new(Router::new()),
            parent: RwLock::new(Weak::new()),
        })
    }

    /// Create a closed repository rooted at `root`.
    pub fn with_root(backend: Box<dyn Backend>, root: Url) -> Result<Arc<Self>> {
        let repository = Self::new(backend);
        repository.set_root_uri(root)?;
        Ok(repository)
    }

    // ---- namespace ------------------------------------------------------

    fn mapping(&self) -> Result<SourceMapping> {
        read_lock(&self.mapping, "repository root")?
            .clone()
            .ok_or_else(|| Error::precondition("repository has no root URI"))
    }

    /// The public root URI, once set.
    pub fn root_uri(&self) -> Option<Url> {
        self.mapping()
            .ok()
            .map(|mapping| mapping.public_root().clone())
    }

    /// Root of the backend's own namespace.
    pub fn source_root(&self) -> &Url {
        self.backend.source_root()
    }

    /// Set the public root URI and push the new mount locations into every
    /// directly mounted repository, which in turn updates its own mounts.
    pub fn set_root_uri(&self, root: Url) -> Result<()> {
        let root = uri::normalize(&root);
        let mapping = SourceMapping::new(root.clone(), self.backend.source_root().clone())?;
        *write_lock(&self.mapping, "repository root")? = Some(mapping);
        let updates = write_lock(&self.router, "mount table")?.set_root(Some(root.clone()))?;
        debug!("Repository root set to {}", root);
        for (mount_root, repository) in updates {
            repository.set_root_uri(mount_root)?;
        }
        Ok(())
    }

    /// Normalize `uri` and verify it lies within this repository.
    pub fn check_resource_uri(&self, uri: &Url) -> Result<Url> {
        let mapping = self.mapping()?;
        uri::check_within(mapping.public_root(), uri)
    }

    /// Resolve a reference that is either an absolute URI or a path relative
    /// to the root, and check it.
    pub fn resolve_uri(&self, reference: &str) -> Result<Url> {
        match Url::parse(reference) {
            Ok(absolute) => self.check_resource_uri(&absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let mapping = self.mapping()?;
                let relative = reference.trim_start_matches(uri::PATH_SEPARATOR);
                let resolved = uri::resolve(mapping.public_root(), relative)?;
                self.check_resource_uri(&resolved)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The collection a resource lives at: itself for a collection.
    pub fn collection_uri(&self, uri: &Url) -> Result<Url> {
        Ok(uri::collection_uri(&self.check_resource_uri(uri)?))
    }

    /// The parent collection of a resource, `None` for the root.
    pub fn parent_uri(&self, uri: &Url) -> Result<Option<Url>> {
        let uri = self.check_resource_uri(uri)?;
        let mapping = self.mapping()?;
        Ok(uri::parent_uri(mapping.public_root(), &uri))
    }

    fn is_root(&self, uri: &Url) -> Result<bool> {
        Ok(self.mapping()?.public_root() == uri)
    }

    fn to_source(&self, uri: &Url) -> Result<Url> {
        self.mapping()?.to_source(uri)
    }

    /// Translate a backend description into the public namespace.
    fn publish(&self, resource: Resource) -> Result<Resource> {
        let mapping = self.mapping()?;
        let convert = |target: &Url| mapping.to_public(target);
        let properties = remap_properties(resource.properties(), mapping.source_root(), &convert)?;
        Ok(Resource::with_properties(
            mapping.to_public(resource.uri())?,
            properties,
        ))
    }

    /// The description a backend stores for `source`: no live properties,
    /// internal references translated, creation time recorded.
    fn stored_description(&self, source: &Url, description: &Resource) -> Result<Resource> {
        let mapping = self.mapping()?;
        let live = self.live_properties()?;
        let convert = |target: &Url| mapping.to_source(target);
        let properties = remap_properties(
            description.without_live(&live).properties(),
            mapping.public_root(),
            &convert,
        )?;
        let mut stored = Resource::with_properties(source.clone(), properties);
        if stored.property(vocab::content_created()).is_none() {
            stored.set_property(vocab::content_created().clone(), Utc::now());
        }
        Ok(stored)
    }

    fn alteration_to_source(&self, alteration: &ResourceAlteration) -> Result<ResourceAlteration> {
        let mapping = self.mapping()?;
        let convert = |target: &Url| mapping.to_source(target);
        let value = |value: &PropertyValue| remap_value(value, mapping.public_root(), &convert);
        let mut translated = ResourceAlteration::new();
        for property in alteration.added() {
            translated = translated.add(property.uri.clone(), value(&property.value)?);
        }
        for property in alteration.sets() {
            translated = translated.set(property.uri.clone(), value(&property.value)?);
        }
        for property in alteration.removed() {
            translated = translated.remove(property.uri.clone(), value(&property.value)?);
        }
        for property_uri in alteration.removed_uris() {
            translated = translated.remove_uri(property_uri.clone());
        }
        Ok(translated)
    }

    fn fail<'a>(&'a self, uri: &'a Url) -> impl Fn(BackendError) -> Error + 'a {
        move |e| self.backend.translate_error(uri, e)
    }

    // ---- lifecycle and policy -------------------------------------------

    pub fn is_open(&self) -> bool {
        self.lifecycle.is_open()
    }

    /// Open this repository and every mounted repository.
    ///
    /// Fails with a precondition error if no root URI has been set.
    pub fn open(&self) -> Result<()> {
        self.lifecycle.open(|| self.open_backend())?;
        for (_, repository) in self.mounts()? {
            repository.open()?;
        }
        Ok(())
    }

    /// Close every mounted repository, then this one.
    pub fn close(&self) -> Result<()> {
        for (_, repository) in self.mounts()? {
            repository.close()?;
        }
        self.lifecycle.close(|| self.close_backend())
    }

    fn open_backend(&self) -> Result<()> {
        let mapping = self.mapping()?;
        self.backend
            .open()
            .map_err(|e| self.backend.translate_error(mapping.public_root(), e))
    }

    fn close_backend(&self) -> Result<()> {
        let root = self
            .root_uri()
            .unwrap_or_else(|| self.backend.source_root().clone());
        self.backend
            .close()
            .map_err(|e| self.backend.translate_error(&root, e))
    }

    fn ensure_open(&self) -> Result<()> {
        self.lifecycle
            .check_open(self.is_auto_open(), || self.open_backend())
    }

    /// Check and normalize `uri`, then make sure the repository is open.
    fn prepare(&self, uri: &Url) -> Result<Url> {
        let uri = self.check_resource_uri(uri)?;
        self.ensure_open()?;
        Ok(uri)
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only.load(Ordering::Acquire)
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Release);
    }

    pub fn is_auto_open(&self) -> bool {
        self.auto_open.load(Ordering::Acquire)
    }

    pub fn set_auto_open(&self, auto_open: bool) {
        self.auto_open.store(auto_open, Ordering::Release);
    }

    /// Modifying an existing resource: not-found beats forbidden.
    fn check_writable(&self, uri: &Url) -> Result<()> {
        if !self.is_read_only() {
            return Ok(());
        }
        let source = self.to_source(uri)?;
        if !self.backend.exists(&source).map_err(self.fail(uri))? {
            return Err(Error::not_found(uri));
        }
        Err(Error::forbidden(uri, "repository is read-only"))
    }

    fn check_creatable(&self, uri: &Url) -> Result<()> {
        if self.is_read_only() {
            return Err(Error::forbidden(uri, "repository is read-only"));
        }
        Ok(())
    }

    /// Creation check against whichever repository owns `uri`.
    fn check_creatable_at(&self, uri: &Url) -> Result<()> {
        match self.owner(uri)? {
            Some(owner) => owner.check_creatable_at(uri),
            None => self.check_creatable(uri),
        }
    }

    // ---- live properties ------------------------------------------------

    /// The current live-property set. Later registrations publish a new set
    /// and leave this one untouched.
    pub fn live_properties(&self) -> Result<Arc<LiveProperties>> {
        Ok(Arc::clone(&*read_lock(&self.live, "live properties")?))
    }

    pub fn is_live(&self, property: &Url) -> Result<bool> {
        Ok(self.live_properties()?.is_live(property))
    }

    pub fn add_live_property(&self, property: Url) -> Result<()> {
        let mut live = write_lock(&self.live, "live properties")?;
        *live = Arc::new(live.with(property));
        Ok(())
    }

    // ---- sub-repositories -----------------------------------------------

    /// Mount `repository` at the relative collection `path`.
    ///
    /// The mounted repository gets this repository as its parent and, once
    /// this repository's root is known, the resolved root URI of the mount.
    /// Returns the repository previously mounted at exactly `path`; it is
    /// detached from this parent but not closed.
    pub fn register_path(
        &self,
        path: &str,
        repository: Arc<Repository>,
    ) -> Result<Option<Arc<Repository>>> {
        let path = router::canonical_path(path)?;
        let this = self
            .this
            .upgrade()
            .ok_or_else(|| Error::precondition("repository is being dropped"))?;
        if self.is_self_or_ancestor(&repository) {
            return Err(Error::invalid(format!(
                "cannot mount a repository inside itself at {}",
                path
            )));
        }
        repository.attach_parent(&this)?;

        let (previous, mount_root) = {
            let mut router = write_lock(&self.router, "mount table")?;
            let previous = router.register(&path, Arc::clone(&repository))?;
            (previous, router.mount_uri(&path)?)
        };
        if let Some(previous) = &previous {
            if !Arc::ptr_eq(previous, &repository) {
                previous.detach_parent()?;
            }
        }
        debug!("Mounted repository at {}", path);
        if let Some(mount_root) = mount_root {
            repository.set_root_uri(mount_root)?;
        }
        Ok(previous)
    }

    /// Unmount the repository at `path`, returning it.
    pub fn unregister_path(&self, path: &str) -> Result<Option<Arc<Repository>>> {
        let removed = write_lock(&self.router, "mount table")?.unregister(path)?;
        if let Some(repository) = &removed {
            repository.detach_parent()?;
            debug!("Unmounted repository at {}", path);
        }
        Ok(removed)
    }

    /// The repository this one is mounted in.
    pub fn parent(&self) -> Option<Arc<Repository>> {
        self.parent.read().ok().and_then(|parent| parent.upgrade())
    }

    /// Directly mounted repositories with their mount paths.
    pub fn mounts(&self) -> Result<Vec<(String, Arc<Repository>)>> {
        Ok(read_lock(&self.router, "mount table")?
            .mounts()
            .map(|(path, repository)| (path.to_string(), Arc::clone(repository)))
            .collect())
    }

    fn attach_parent(&self, parent: &Arc<Repository>) -> Result<()> {
        let mut slot = write_lock(&self.parent, "parent link")?;
        if let Some(existing) = slot.upgrade() {
            if !Arc::ptr_eq(&existing, parent) {
                return Err(Error::precondition(
                    "repository is already mounted under another parent; unregister it first",
                ));
            }
        }
        *slot = Arc::downgrade(parent);
        Ok(())
    }

    fn detach_parent(&self) -> Result<()> {
        *write_lock(&self.parent, "parent link")? = Weak::new();
        Ok(())
    }

    fn is_self_or_ancestor(&self, candidate: &Arc<Repository>) -> bool {
        let mut current = self.this.upgrade();
        while let Some(repository) = current {
            if Arc::ptr_eq(&repository, candidate) {
                return true;
            }
            current = repository.parent();
        }
        false
    }

    fn top(&self) -> Option<Arc<Repository>> {
        let mut current = self.this.upgrade()?;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        Some(current)
    }

    fn same_tree(&self, other: &Repository) -> bool {
        match (self.top(), other.top()) {
            (Some(mine), Some(theirs)) => Arc::ptr_eq(&mine, &theirs),
            _ => std::ptr::eq(self, other),
        }
    }

    /// The repository physically owning `uri`: the deepest mount on its
    /// path, or this repository.
    fn resident(&self, uri: &Url) -> Result<Option<Arc<Repository>>> {
        let mut current = match self.this.upgrade() {
            Some(current) => current,
            None => return Ok(None),
        };
        while let Some(owner) = current.owner(uri)? {
            current = owner;
        }
        Ok(Some(current))
    }

    /// The mounted repository physically owning `uri`, or `None` when this
    /// repository owns it.
    fn owner(&self, uri: &Url) -> Result<Option<Arc<Repository>>> {
        let owner = read_lock(&self.router, "mount table")?.resolve_owner(uri);
        if owner.is_some() {
            debug!("Delegating {} to mounted repository", uri);
        }
        Ok(owner)
    }

    // ---- resource operations --------------------------------------------

    pub fn exists(&self, uri: &Url) -> Result<bool> {
        let uri = self.prepare(uri)?;
        if let Some(owner) = self.owner(&uri)? {
            return owner.exists(&uri);
        }
        let source = self.to_source(&uri)?;
        self.backend.exists(&source).map_err(self.fail(&uri))
    }

    /// Describe a resource, live properties included.
    pub fn describe(&self, uri: &Url) -> Result<Resource> {
        let uri = self.prepare(uri)?;
        if let Some(owner) = self.owner(&uri)? {
            return owner.describe(&uri);
        }
        let source = self.to_source(&uri)?;
        let resource = self.backend.describe(&source).map_err(self.fail(&uri))?;
        self.publish(resource)
    }

    pub fn read(&self, uri: &Url) -> Result<ContentReader> {
        let uri = self.prepare(uri)?;
        if let Some(owner) = self.owner(&uri)? {
            return owner.read(&uri);
        }
        let source = self.to_source(&uri)?;
        self.backend.read(&source).map_err(self.fail(&uri))
    }

    /// Read the whole content of a resource.
    pub fn read_bytes(&self, uri: &Url) -> Result<Vec<u8>> {
        let mut reader = self.read(uri)?;
        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .map_err(|e| error::translate(uri, BackendError::Io(e)))?;
        Ok(content)
    }

    /// Open the content of an existing resource for replacement. `modified`
    /// is recorded as the content modification time, defaulting to now.
    pub fn write(&self, uri: &Url, modified: Option<DateTime<Utc>>) -> Result<ContentWriter> {
        let uri = self.prepare(uri)?;
        if let Some(owner) = self.owner(&uri)? {
            return owner.write(&uri, modified);
        }
        self.check_writable(&uri)?;
        let source = self.to_source(&uri)?;
        self.backend.write(&source, modified).map_err(self.fail(&uri))
    }

    /// Replace the whole content of an existing resource.
    pub fn write_bytes(&self, uri: &Url, content: &[u8]) -> Result<()> {
        let mut writer = self.write(uri, None)?;
        writer
            .write_all(content)
            .and_then(|_| writer.flush())
            .map_err(|e| error::translate(uri, BackendError::Io(e)))
    }

    pub fn has_children(&self, uri: &Url) -> Result<bool> {
        let uri = self.prepare(uri)?;
        if let Some(owner) = self.owner(&uri)? {
            return owner.has_children(&uri);
        }
        if !read_lock(&self.router, "mount table")?
            .mounted_under(&uri)
            .is_empty()
        {
            return Ok(true);
        }
        let source = self.to_source(&uri)?;
        self.backend.has_children(&source).map_err(self.fail(&uri))
    }

    /// List the descendants of a collection in lexical URI order.
    ///
    /// `depth` 0 lists nothing, 1 lists direct children and
    /// [`INFINITE_DEPTH`] lists everything. Mounted repositories appear as
    /// entries and are descended like any other collection. The filter only
    /// decides what is reported; collections it rejects are still descended.
    pub fn children(
        &self,
        uri: &Url,
        filter: Option<&dyn ResourceFilter>,
        depth: usize,
    ) -> Result<Vec<Resource>> {
        let uri = self.prepare(uri)?;
        if let Some(owner) = self.owner(&uri)? {
            return owner.children(&uri, filter, depth);
        }
        let mut found = Vec::new();
        if depth == 0 || !uri::is_collection(&uri) {
            return Ok(found);
        }

        let source = self.to_source(&uri)?;
        let mut direct: BTreeMap<String, Resource> = BTreeMap::new();
        for child in self.backend.list_children(&source).map_err(self.fail(&uri))? {
            let child = self.publish(child)?;
            direct.insert(child.uri().to_string(), child);
        }
        let mounted = read_lock(&self.router, "mount table")?.mounted_under(&uri);
        for (_, repository) in mounted {
            let Some(mount_root) = repository.root_uri() else {
                continue;
            };
            let child = repository.describe(&mount_root)?;
            direct.insert(child.uri().to_string(), child);
        }

        let next = if depth == INFINITE_DEPTH {
            depth
        } else {
            depth - 1
        };
        for child in direct.into_values() {
            let nested = if next > 0 && child.is_collection() {
                self.children(child.uri(), filter, next)?
            } else {
                Vec::new()
            };
            if filter.map_or(true, |filter| filter.is_pass(&child)) {
                found.push(child);
            }
            found.extend(nested);
        }
        found.sort_by(|a, b| a.uri().as_str().cmp(b.uri().as_str()));
        Ok(found)
    }

    /// Create a resource (or replace a non-collection) with a description
    /// and inline content. The parent collection must exist.
    pub fn create(&self, uri: &Url, description: &Resource, content: &[u8]) -> Result<Resource> {
        let uri = self.prepare(uri)?;
        if let Some(owner) = self.owner(&uri)? {
            return owner.create(&uri, description, content);
        }
        self.check_creatable(&uri)?;
        let source = self.to_source(&uri)?;
        let stored = self.stored_description(&source, description)?;
        let created = self
            .backend
            .create(&source, &stored, content)
            .map_err(self.fail(&uri))?;
        debug!("Created {}", uri);
        self.publish(created)
    }

    /// Create a resource and return a stream for its content.
    pub fn create_stream(&self, uri: &Url, description: &Resource) -> Result<ContentWriter> {
        let uri = self.prepare(uri)?;
        if let Some(owner) = self.owner(&uri)? {
            return owner.create_stream(&uri, description);
        }
        self.check_creatable(&uri)?;
        let source = self.to_source(&uri)?;
        let stored = self.stored_description(&source, description)?;
        debug!("Creating {} from stream", uri);
        self.backend
            .create_stream(&source, &stored)
            .map_err(self.fail(&uri))
    }

    /// Create an empty collection.
    pub fn create_collection(&self, uri: &Url) -> Result<Resource> {
        let uri = self.check_resource_uri(uri)?;
        if !uri::is_collection(&uri) {
            return Err(Error::invalid(format!("{} is not a collection URI", uri)));
        }
        self.create(&uri, &Resource::new(uri.clone()), &[])
    }

    /// Delete a resource and everything beneath it. The repository root
    /// cannot be deleted.
    pub fn delete(&self, uri: &Url) -> Result<()> {
        let uri = self.prepare(uri)?;
        if self.is_root(&uri)? {
            return Err(Error::forbidden(&uri, "the repository root cannot be deleted"));
        }
        if let Some(owner) = self.owner(&uri)? {
            return owner.delete(&uri);
        }
        self.check_writable(&uri)?;
        let source = self.to_source(&uri)?;
        self.backend.delete(&source).map_err(self.fail(&uri))?;
        debug!("Deleted {}", uri);
        Ok(())
    }

    /// Apply an alteration and return the resulting description.
    ///
    /// Parts of the request naming live properties are dropped; a request
    /// with nothing left does not reach the backend.
    pub fn alter_properties(
        &self,
        uri: &Url,
        alteration: &ResourceAlteration,
    ) -> Result<Resource> {
        alteration.validate()?;
        let uri = self.prepare(uri)?;
        if let Some(owner) = self.owner(&uri)? {
            return owner.alter_properties(&uri, alteration);
        }
        self.check_writable(&uri)?;
        let live = self.live_properties()?;
        let stored = alteration.without_live(&live);
        if stored.is_empty() {
            return self.describe(&uri);
        }
        let source = self.to_source(&uri)?;
        let stored = self.alteration_to_source(&stored)?;
        let altered = self
            .backend
            .alter_properties(&source, &stored)
            .map_err(self.fail(&uri))?;
        self.publish(altered)
    }

    // ---- copy and move --------------------------------------------------

    /// Copy a resource to another location in this repository.
    pub fn copy_resource(
        &self,
        source: &Url,
        destination: &Url,
        overwrite: bool,
        progress: &dyn ProgressListener,
    ) -> Result<()> {
        self.transfer(Transfer::Copy, source, self, destination, overwrite, progress)
    }

    /// Copy a resource into another repository.
    pub fn copy_resource_to(
        &self,
        source: &Url,
        target: &Repository,
        destination: &Url,
        overwrite: bool,
        progress: &dyn ProgressListener,
    ) -> Result<()> {
        self.transfer(Transfer::Copy, source, target, destination, overwrite, progress)
    }

    /// Move a resource to another location in this repository.
    pub fn move_resource(
        &self,
        source: &Url,
        destination: &Url,
        overwrite: bool,
        progress: &dyn ProgressListener,
    ) -> Result<()> {
        self.transfer(Transfer::Move, source, self, destination, overwrite, progress)
    }

    /// Move a resource into another repository.
    pub fn move_resource_to(
        &self,
        source: &Url,
        target: &Repository,
        destination: &Url,
        overwrite: bool,
        progress: &dyn ProgressListener,
    ) -> Result<()> {
        self.transfer(Transfer::Move, source, target, destination, overwrite, progress)
    }

    fn transfer(
        &self,
        mode: Transfer,
        source: &Url,
        target: &Repository,
        destination: &Url,
        overwrite: bool,
        progress: &dyn ProgressListener,
    ) -> Result<()> {
        let source = self.check_resource_uri(source)?;
        let destination = target.check_resource_uri(destination)?;
        let circular = uri::is_within(&source, &destination)
            || (overwrite && self.same_tree(target) && uri::is_within(&destination, &source));
        if circular {
            return Err(Error::Circular {
                source_uri: source.to_string(),
                destination: destination.to_string(),
            });
        }
        if mode == Transfer::Move && self.is_root(&source)? {
            return Err(Error::forbidden(&source, "the repository root cannot be moved"));
        }
        if uri::is_collection(&source) != uri::is_collection(&destination) {
            return Err(Error::invalid(format!(
                "cannot transfer {} to {}: both must be collections or both non-collections",
                source, destination
            )));
        }
        // Address the destination's own repository so that a transfer staying
        // inside one mount reaches that mount's native primitives.
        let resident = target.resident(&destination)?;
        let target = resident.as_deref().unwrap_or(target);
        self.ensure_open()?;
        target.ensure_open()?;

        if let Some(owner) = self.owner(&source)? {
            return owner.transfer(mode, &source, target, &destination, overwrite, progress);
        }
        if mode == Transfer::Move {
            self.check_writable(&source)?;
        }
        let source_path = self.to_source(&source)?;

        if std::ptr::eq(self, target) {
            match self.owner(&destination)? {
                Some(owner) => {
                    return self.transfer_across(
                        mode,
                        &source,
                        &source_path,
                        &owner,
                        &destination,
                        overwrite,
                        progress,
                    );
                }
                None => {
                    self.check_creatable(&destination)?;
                    let destination_path = self.to_source(&destination)?;
                    let outcome = match mode {
                        Transfer::Copy => self.backend.copy_within(
                            &source_path,
                            &destination_path,
                            overwrite,
                            progress,
                        ),
                        Transfer::Move => self.backend.move_within(
                            &source_path,
                            &destination_path,
                            overwrite,
                            progress,
                        ),
                    }
                    .map_err(self.fail(&source))?;
                    if outcome == Outcome::Completed {
                        debug!("{:?} {} -> {} done by backend", mode, source, destination);
                        return Ok(());
                    }
                    return self.transfer_generic(
                        mode,
                        &source,
                        self,
                        &destination,
                        overwrite,
                        progress,
                    );
                }
            }
        }
        self.transfer_across(
            mode,
            &source,
            &source_path,
            target,
            &destination,
            overwrite,
            progress,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn transfer_across(
        &self,
        mode: Transfer,
        source: &Url,
        source_path: &Url,
        target: &Repository,
        destination: &Url,
        overwrite: bool,
        progress: &dyn ProgressListener,
    ) -> Result<()> {
        target.check_creatable_at(destination)?;
        let outcome = match mode {
            Transfer::Copy => {
                self.backend
                    .copy_to(source_path, target, destination, overwrite, progress)
            }
            Transfer::Move => {
                self.backend
                    .move_to(source_path, target, destination, overwrite, progress)
            }
        }
        .map_err(self.fail(source))?;
        if outcome == Outcome::Completed {
            debug!("{:?} {} -> {} done by backend", mode, source, destination);
            return Ok(());
        }
        self.transfer_generic(mode, source, target, destination, overwrite, progress)
    }

    fn transfer_generic(
        &self,
        mode: Transfer,
        source: &Url,
        target: &Repository,
        destination: &Url,
        overwrite: bool,
        progress: &dyn ProgressListener,
    ) -> Result<()> {
        match mode {
            Transfer::Copy => {
                transfer::copy_generic(self, source, target, destination, overwrite, progress)
            }
            Transfer::Move => {
                transfer::move_generic(self, source, target, destination, overwrite, progress)
            }
        }
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.root_uri().map(String::from))
            .field("source_root", &self.backend.source_root().as_str())
            .field("open", &self.is_open())
            .field("read_only", &self.is_read_only())
            .finish()
    }
}

impl Drop for Repository {
    fn drop(&mut self) {
        if let Err(e) = self.lifecycle.close(|| self.close_backend()) {
            error!("Failed to close repository on drop: {}", e);
        }
    }
}
