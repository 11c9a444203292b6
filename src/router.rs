//! Sub-repository mount table.
//!
//! A repository can delegate collection path prefixes to other repository
//! instances. The router keeps the exact path → repository mapping plus an
//! index from a mount's parent path to the mounts directly beneath it, and
//! answers which repository physically owns a URI. The most specific mount
//! wins.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use url::Url;

use crate::error::{Error, Result};
use crate::repository::Repository;
use crate::uri::{self, PATH_SEPARATOR};

#[derive(Default)]
pub struct Router {
    root: Option<Url>,
    mounts: BTreeMap<String, Arc<Repository>>,
    by_parent: BTreeMap<String, BTreeSet<String>>,
}

/// Canonical form of a mount path: relative, a collection, no dot segments.
pub fn canonical_path(path: &str) -> Result<String> {
    let invalid = |reason: &str| Error::invalid(format!("mount path {:?} {}", path, reason));
    if path.is_empty() || path.starts_with(PATH_SEPARATOR) {
        return Err(invalid("must be a non-empty relative path"));
    }
    if !path.ends_with(PATH_SEPARATOR) {
        return Err(invalid("must denote a collection"));
    }
    let segments = &path[..path.len() - 1];
    if segments
        .split(PATH_SEPARATOR)
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(invalid("must not contain empty or dot segments"));
    }
    let base = Url::parse("mem://mount/")?;
    let resolved = uri::resolve(&base, path)?;
    match uri::relativize(&base, &resolved) {
        Some(relative) if !relative.is_empty() => Ok(relative),
        _ => Err(invalid("must be a relative path")),
    }
}

/// The path of the collection containing `path`, or `""` at the top.
fn parent_path(path: &str) -> String {
    let trimmed = path.trim_end_matches(PATH_SEPARATOR);
    match trimmed.rfind(PATH_SEPARATOR) {
        Some(index) => trimmed[..=index].to_string(),
        None => String::new(),
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new root and return every direct mount with its new root URI.
    pub fn set_root(&mut self, root: Option<Url>) -> Result<Vec<(Url, Arc<Repository>)>> {
        self.root = root;
        self.mounts
            .keys()
            .filter_map(|path| {
                self.mount_uri(path)
                    .map(|uri| uri.map(|uri| (uri, Arc::clone(&self.mounts[path]))))
                    .transpose()
            })
            .collect()
    }

    /// The absolute root URI of a mount path, if the router's root is known.
    pub fn mount_uri(&self, path: &str) -> Result<Option<Url>> {
        self.root
            .as_ref()
            .map(|root| uri::resolve(root, path))
            .transpose()
    }

    /// Register `repository` at `path`, returning the repository previously
    /// registered at exactly that path.
    pub fn register(
        &mut self,
        path: &str,
        repository: Arc<Repository>,
    ) -> Result<Option<Arc<Repository>>> {
        let path = canonical_path(path)?;
        self.by_parent
            .entry(parent_path(&path))
            .or_default()
            .insert(path.clone());
        Ok(self.mounts.insert(path, repository))
    }

    /// Remove the mount at `path`.
    pub fn unregister(&mut self, path: &str) -> Result<Option<Arc<Repository>>> {
        let path = canonical_path(path)?;
        let parent = parent_path(&path);
        if let Some(siblings) = self.by_parent.get_mut(&parent) {
            siblings.remove(&path);
            if siblings.is_empty() {
                self.by_parent.remove(&parent);
            }
        }
        Ok(self.mounts.remove(&path))
    }

    /// Mount paths and repositories in lexical path order.
    pub fn mounts(&self) -> impl Iterator<Item = (&str, &Arc<Repository>)> {
        self.mounts
            .iter()
            .map(|(path, repository)| (path.as_str(), repository))
    }

    /// The mounted repository owning `uri`, walking from the URI's own level
    /// up to (but not including) the root. `None` means the router's owner.
    pub fn resolve_owner(&self, uri: &Url) -> Option<Arc<Repository>> {
        if self.mounts.is_empty() {
            return None;
        }
        let root = self.root.as_ref()?;
        let relative = uri::relativize(root, uri)?;
        let mut level = if relative.ends_with(PATH_SEPARATOR) {
            relative
        } else {
            parent_path(&relative)
        };
        while !level.is_empty() {
            if let Some(repository) = self.mounts.get(&level) {
                return Some(Arc::clone(repository));
            }
            level = parent_path(&level);
        }
        None
    }

    /// Repositories mounted directly beneath the collection `parent`.
    pub fn mounted_under(&self, parent: &Url) -> Vec<(String, Arc<Repository>)> {
        let Some(relative) = self.root.as_ref().and_then(|root| uri::relativize(root, parent))
        else {
            return Vec::new();
        };
        self.by_parent
            .get(&relative)
            .map(|paths| {
                paths
                    .iter()
                    .filter_map(|path| {
                        self.mounts
                            .get(path)
                            .map(|repository| (path.clone(), Arc::clone(repository)))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
