//! # Resource Repository Library
//!
//! This library provides a uniform, hierarchical repository of resources
//! over pluggable storage backends. Every resource is addressed by a URI,
//! carries a description made of typed properties and, unless it is a
//! collection, a byte content stream. Repositories can be mounted inside
//! each other so that one namespace spans several backends.
//!
//! ## Quick Example
//!
//! ```
//! use resource_repo::backend::MemoryBackend;
//! use resource_repo::property::Resource;
//! use resource_repo::repository::Repository;
//! use url::Url;
//!
//! let root = Url::parse("http://example.com/repo/").unwrap();
//! let repository = Repository::with_root(Box::new(MemoryBackend::new("docs")), root.clone()).unwrap();
//!
//! let readme = root.join("README.txt").unwrap();
//! repository
//!     .create(&readme, &Resource::new(readme.clone()), b"hello")
//!     .unwrap();
//!
//! assert_eq!(repository.read_bytes(&readme).unwrap(), b"hello");
//! assert_eq!(repository.describe(&readme).unwrap().content_length(), Some(5));
//! ```
//!
//! ## Core Concepts
//!
//! - **URIs (`uri`)**: normalization, namespace membership and the mapping
//!   between a repository's public namespace and its backend's source
//!   namespace. Collection URIs end with `/`.
//! - **Properties (`property`, `alteration`)**: typed property values,
//!   resource descriptions, live properties derived from content, and
//!   add/set/remove change requests.
//! - **Codecs (`codec`)**: the structured description format and the flat
//!   string encoding used by simple property stores, including legacy
//!   namespace migration.
//! - **Backends (`backend`)**: the storage contract with in-memory and
//!   local filesystem adapters.
//! - **Repositories (`repository`, `router`, `lifecycle`)**: the façade
//!   every caller uses. It translates URIs, enforces policies, routes
//!   requests to mounted sub-repositories and manages open/close.
//! - **Transfers (`transfer`)**: generic copy and move that work across
//!   backends and repository instances.
//! - **Configuration (`config`)**: YAML description of a repository tree and
//!   the backend registry that builds it.

pub mod alteration;
pub mod backend;
pub mod codec;
pub mod config;
pub mod defaults;
pub mod error;
pub mod filter;
pub mod lifecycle;
pub mod output;
pub mod property;
pub mod repository;
pub mod router;
pub mod suggestions;
pub mod transfer;
pub mod uri;

#[cfg(test)]
mod uri_proptest;
