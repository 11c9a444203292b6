//! # Repository Configuration
//!
//! This module defines the `repository.yaml` schema describing a tree of
//! repositories, and turns it into live [`Repository`] values.
//!
//! ```yaml
//! root: "http://example.com/repo/"
//! backend:
//!   kind: filesystem
//!   path: ./data
//! read_only: false
//! auto_open: true
//! live_properties: ["urn:resource-repo:content:modified"]
//! legacy_namespaces:
//!   - legacy: "http://purl.org/dc/elements/1.0/"
//!     canonical: "http://purl.org/dc/elements/1.1/"
//! mounts:
//!   - path: "docs/"
//!     repository:
//!       backend: { kind: memory }
//! ```
//!
//! ## Key Components
//!
//! - **`RepositoryConfig`**: one repository node, with its mounts nested
//!   beneath it.
//! - **`BackendRegistry`**: maps a backend `kind` to a factory. The registry
//!   is an ordinary value built by the caller; [`BackendRegistry::with_defaults`]
//!   knows `memory` and `filesystem`.
//! - **`build`**: constructs the repository tree and registers every mount
//!   on its parent.
//!
//! Files ending in `.toml` are parsed as TOML with the same schema.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

use crate::backend::{Backend, FileSystemBackend, MemoryBackend};
use crate::codec::{LegacyNamespaces, NamespaceMigration};
use crate::defaults;
use crate::error::{Error, Result};
use crate::repository::Repository;
use crate::uri;

/// Backend selection and its options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Registry key, e.g. `memory` or `filesystem`.
    pub kind: String,
    /// Directory served by a filesystem backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Namespace name of a memory backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A repository mounted at a relative collection path of its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MountConfig {
    pub path: String,
    pub repository: RepositoryConfig,
}

/// One repository of the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Public root URI. Only the top-level repository sets it; it defaults to
    /// the backend's own namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    pub backend: BackendConfig,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default = "default_auto_open")]
    pub auto_open: bool,
    /// Property URIs treated as live in addition to the defaults.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub live_properties: Vec<String>,
    /// Namespace migrations applied to flat property stores. Omitted means
    /// the default Dublin Core migration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_namespaces: Option<Vec<NamespaceMigration>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<MountConfig>,
}

pub fn default_auto_open() -> bool {
    true
}

impl RepositoryConfig {
    /// A configuration for a backend kind with every other field defaulted.
    pub fn for_backend(kind: &str) -> Self {
        Self {
            root: None,
            backend: BackendConfig {
                kind: kind.to_string(),
                path: None,
                name: None,
            },
            read_only: false,
            auto_open: default_auto_open(),
            live_properties: Vec::new(),
            legacy_namespaces: None,
            mounts: Vec::new(),
        }
    }

    fn legacy(&self) -> LegacyNamespaces {
        self.legacy_namespaces
            .clone()
            .map(LegacyNamespaces::new)
            .unwrap_or_default()
    }

    /// Resolve relative backend paths against `base`, recursively.
    fn resolve_paths(&mut self, base: &Path) {
        if let Some(path) = &self.backend.path {
            if path.is_relative() {
                self.backend.path = Some(base.join(path));
            }
        }
        for mount in &mut self.mounts {
            mount.repository.resolve_paths(base);
        }
    }
}

/// Creates a backend from its configuration.
pub type BackendFactory =
    Box<dyn Fn(&BackendConfig, &LegacyNamespaces) -> Result<Box<dyn Backend>> + Send + Sync>;

/// Named backend factories.
pub struct BackendRegistry {
    factories: BTreeMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// A registry without any backend kinds.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry knowing the bundled `memory` and `filesystem` backends.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            "memory",
            Box::new(|config: &BackendConfig, legacy: &LegacyNamespaces| -> Result<Box<dyn Backend>> {
                let name = config.name.as_deref().unwrap_or("memory");
                let backend = MemoryBackend::new(name).with_legacy_namespaces(legacy.clone());
                Ok(Box::new(backend) as Box<dyn Backend>)
            }),
        );
        registry.register(
            "filesystem",
            Box::new(|config: &BackendConfig, _legacy: &LegacyNamespaces| -> Result<Box<dyn Backend>> {
                let path = config
                    .path
                    .clone()
                    .unwrap_or_else(defaults::default_data_dir);
                Ok(Box::new(FileSystemBackend::new(path)?) as Box<dyn Backend>)
            }),
        );
        registry
    }

    /// Register (or replace) the factory for `kind`.
    pub fn register(&mut self, kind: &str, factory: BackendFactory) {
        self.factories.insert(kind.to_string(), factory);
    }

    /// Registered backend kinds in lexical order.
    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn create(
        &self,
        config: &BackendConfig,
        legacy: &LegacyNamespaces,
    ) -> Result<Box<dyn Backend>> {
        let factory = self.factories.get(&config.kind).ok_or_else(|| {
            Error::invalid(format!(
                "unknown backend kind '{}' (known kinds: {})",
                config.kind,
                self.kinds().join(", ")
            ))
        })?;
        factory(config, legacy)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Parse a YAML configuration.
pub fn parse(yaml_content: &str) -> Result<RepositoryConfig> {
    Ok(serde_yaml::from_str(yaml_content)?)
}

/// Parse a TOML configuration.
pub fn parse_toml(toml_content: &str) -> Result<RepositoryConfig> {
    Ok(toml::from_str(toml_content)?)
}

/// Load a configuration file, choosing the format by extension and
/// resolving relative backend paths against the file's directory.
pub fn load<P: AsRef<Path>>(path: P) -> Result<RepositoryConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    let is_toml = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("toml"));
    let mut config = if is_toml {
        parse_toml(&content)?
    } else {
        parse(&content)?
    };
    let base = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base);
    Ok(config)
}

/// Build the repository tree described by `config`.
///
/// The returned repository is closed; mounted repositories already carry
/// their resolved root URIs.
pub fn build(config: &RepositoryConfig, registry: &BackendRegistry) -> Result<Arc<Repository>> {
    let repository = build_node(config, registry)?;
    let root = match &config.root {
        Some(root) => uri::parse(root)?,
        None => repository.source_root().clone(),
    };
    repository.set_root_uri(root)?;
    Ok(repository)
}

fn build_node(config: &RepositoryConfig, registry: &BackendRegistry) -> Result<Arc<Repository>> {
    let backend = registry.create(&config.backend, &config.legacy())?;
    let repository = Repository::new(backend);
    repository.set_read_only(config.read_only);
    repository.set_auto_open(config.auto_open);
    for property in &config.live_properties {
        let property = Url::parse(property).map_err(|e| {
            Error::invalid(format!("invalid live property URI '{}': {}", property, e))
        })?;
        repository.add_live_property(property)?;
    }
    for mount in &config.mounts {
        if mount.repository.root.is_some() {
            return Err(Error::invalid(format!(
                "repository mounted at '{}' must not set a root URI",
                mount.path
            )));
        }
        let child = build_node(&mount.repository, registry)?;
        repository.register_path(&mount.path, child)?;
    }
    Ok(repository)
}
