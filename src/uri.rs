//! URI manipulation utilities for resource-repo
//!
//! Every resource is identified by an absolute, hierarchical URI. A URI whose
//! path ends in [`PATH_SEPARATOR`] denotes a collection. The functions here
//! normalize URIs into one canonical form, check that a URI lies inside a
//! repository namespace, and derive collection/parent levels.

use crate::error::{Error, Result};
use regex::{Captures, Regex};
use std::sync::OnceLock;
use url::Url;

/// Separator between path segments; a trailing separator marks a collection.
pub const PATH_SEPARATOR: char = '/';

fn escape_pattern() -> &'static Regex {
    static ESCAPE: OnceLock<Regex> = OnceLock::new();
    ESCAPE.get_or_init(|| Regex::new(r"%([0-9A-Fa-f]{2})").expect("valid escape pattern"))
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

/// Canonicalize percent escapes in a URI component.
///
/// Escapes of unreserved characters are decoded and every remaining escape is
/// rewritten with uppercase hex digits.
fn canonicalize_escapes(component: &str) -> String {
    escape_pattern()
        .replace_all(component, |caps: &Captures| {
            let hex = &caps[1];
            match u8::from_str_radix(hex, 16) {
                Ok(byte) if is_unreserved(byte) => (byte as char).to_string(),
                _ => format!("%{}", hex.to_ascii_uppercase()),
            }
        })
        .into_owned()
}

/// Parse an absolute URI string and normalize it.
pub fn parse(uri: &str) -> Result<Url> {
    Ok(normalize(&Url::parse(uri)?))
}

/// Normalize a URI into its canonical form.
///
/// Parsing already lowercases the scheme and host, drops default ports and
/// removes `.`/`..` segments; this additionally canonicalizes percent escapes
/// in the path and query. `normalize(&normalize(u)) == normalize(u)`.
pub fn normalize(uri: &Url) -> Url {
    let mut normalized = uri.clone();
    if normalized.cannot_be_a_base() {
        return normalized;
    }
    let path = canonicalize_escapes(normalized.path());
    normalized.set_path(&path);
    if let Some(query) = normalized.query().map(canonicalize_escapes) {
        normalized.set_query(Some(&query));
    }
    normalized
}

/// Whether the URI denotes a collection.
pub fn is_collection(uri: &Url) -> bool {
    uri.path().ends_with(PATH_SEPARATOR)
}

/// Return the collection form of a URI by appending a trailing separator.
pub fn as_collection(uri: &Url) -> Url {
    if is_collection(uri) {
        return uri.clone();
    }
    let mut collection = uri.clone();
    let path = format!("{}{}", uri.path(), PATH_SEPARATOR);
    collection.set_path(&path);
    collection
}

/// Verify that a URI can serve as a repository root.
pub fn check_root(root: &Url) -> Result<()> {
    if root.cannot_be_a_base() || !is_collection(root) {
        return Err(Error::invalid(format!(
            "repository root {} must be a hierarchical collection URI",
            root
        )));
    }
    Ok(())
}

/// Whether `uri` is equal to or a descendant of the collection `base`.
///
/// Both URIs are expected to be normalized.
pub fn is_within(base: &Url, uri: &Url) -> bool {
    uri.as_str().starts_with(base.as_str())
        && (is_collection(base) || uri.as_str() == base.as_str())
}

/// Normalize `uri` and verify that it lies within the namespace of `root`.
///
/// Fails with an invalid-argument error if the URI is outside the namespace.
pub fn check_within(root: &Url, uri: &Url) -> Result<Url> {
    let normalized = normalize(uri);
    if !is_within(root, &normalized) {
        return Err(Error::OutsideNamespace {
            uri: normalized.to_string(),
            root: root.to_string(),
        });
    }
    Ok(normalized)
}

/// The level containing the resource: itself for a collection, otherwise the
/// resource URI with its name removed.
pub fn current_level(uri: &Url) -> Url {
    if is_collection(uri) {
        return uri.clone();
    }
    uri.join("./").unwrap_or_else(|_| uri.clone())
}

/// The level above the resource's current level.
pub fn parent_level(uri: &Url) -> Url {
    current_level(uri)
        .join("../")
        .unwrap_or_else(|_| uri.clone())
}

/// The collection URI of a resource: itself if already a collection, else its
/// current level.
pub fn collection_uri(uri: &Url) -> Url {
    current_level(uri)
}

/// The parent collection of a resource within the namespace of `root`.
///
/// Returns `None` for the root itself.
pub fn parent_uri(root: &Url, uri: &Url) -> Option<Url> {
    if uri.as_str() == root.as_str() || uri.path() == "/" {
        return None;
    }
    let parent = if is_collection(uri) {
        parent_level(uri)
    } else {
        current_level(uri)
    };
    Some(parent)
}

/// The path of `uri` relative to `base`, still percent-encoded.
///
/// Returns `None` if `uri` is not within `base`.
pub fn relativize(base: &Url, uri: &Url) -> Option<String> {
    if !is_within(base, uri) {
        return None;
    }
    uri.as_str()
        .strip_prefix(base.as_str())
        .map(|relative| relative.to_string())
}

/// Resolve a relative path (as produced by [`relativize`]) against `base`.
pub fn resolve(base: &Url, relative: &str) -> Result<Url> {
    let first_segment = relative.split(PATH_SEPARATOR).next().unwrap_or_default();
    let resolved = if first_segment.contains(':') {
        base.join(&format!("./{}", relative))?
    } else {
        base.join(relative)?
    };
    Ok(normalize(&resolved))
}

/// Decode percent escapes in a single path segment.
pub fn decode_segment(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' && index + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[index + 1..index + 3]).ok();
            if let Some(byte) = hex.and_then(|hex| u8::from_str_radix(hex, 16).ok()) {
                decoded.push(byte);
                index += 3;
                continue;
            }
        }
        decoded.push(bytes[index]);
        index += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

/// The decoded name of a resource: its last path segment without a trailing
/// separator. The root of a namespace has no name.
pub fn name(uri: &Url) -> Option<String> {
    let path = uri.path().trim_end_matches(PATH_SEPARATOR);
    let segment = path.rsplit(PATH_SEPARATOR).next()?;
    if segment.is_empty() {
        return None;
    }
    Some(decode_segment(segment))
}

/// Translation between a repository's public namespace and the private
/// namespace its backend addresses resources in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMapping {
    public_root: Url,
    source_root: Url,
}

impl SourceMapping {
    /// Create a mapping between two collection roots.
    pub fn new(public_root: Url, source_root: Url) -> Result<Self> {
        check_root(&public_root)?;
        check_root(&source_root)?;
        Ok(Self {
            public_root: normalize(&public_root),
            source_root: normalize(&source_root),
        })
    }

    pub fn public_root(&self) -> &Url {
        &self.public_root
    }

    pub fn source_root(&self) -> &Url {
        &self.source_root
    }

    /// Translate a public URI into the backend namespace.
    pub fn to_source(&self, public_uri: &Url) -> Result<Url> {
        Self::translate(&self.public_root, &self.source_root, public_uri)
    }

    /// Translate a backend URI into the public namespace.
    pub fn to_public(&self, source_uri: &Url) -> Result<Url> {
        Self::translate(&self.source_root, &self.public_root, source_uri)
    }

    fn translate(from: &Url, to: &Url, uri: &Url) -> Result<Url> {
        let relative = relativize(from, &normalize(uri)).ok_or_else(|| Error::OutsideNamespace {
            uri: uri.to_string(),
            root: from.to_string(),
        })?;
        resolve(to, &relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_normalize_dot_segments() {
        let uri = parse("http://example.com/repo/a/./b/../c.txt").unwrap();
        assert_eq!(uri.as_str(), "http://example.com/repo/a/c.txt");
    }

    #[test]
    fn test_normalize_escape_case() {
        let lower = parse("http://example.com/repo/a%2fb").unwrap();
        let upper = parse("http://example.com/repo/a%2Fb").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(upper.path(), "/repo/a%2Fb");
    }

    #[test]
    fn test_normalize_decodes_unreserved_escapes() {
        let uri = parse("http://Example.COM/repo/%7Euser/%41bc").unwrap();
        assert_eq!(uri.as_str(), "http://example.com/repo/~user/Abc");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = parse("file:///tmp/x/%2e%2E/y%3a/z").unwrap();
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_check_within() {
        let root = url("http://example.com/repo/");
        assert!(check_within(&root, &url("http://example.com/repo/")).is_ok());
        assert_eq!(
            check_within(&root, &url("http://example.com/repo/x/../y"))
                .unwrap()
                .as_str(),
            "http://example.com/repo/y"
        );
        let error = check_within(&root, &url("http://example.com/other/")).unwrap_err();
        assert!(matches!(error, Error::OutsideNamespace { .. }));
        assert!(check_within(&root, &url("http://example.com/repo")).is_err());
        assert!(check_within(&root, &url("http://example.com/repo/../x")).is_err());
        assert!(check_within(&root, &url("https://example.com/repo/a")).is_err());
    }

    #[test]
    fn test_collection_and_parent_levels() {
        let root = url("http://example.com/repo/");
        let file = url("http://example.com/repo/a/b.txt");
        let dir = url("http://example.com/repo/a/b/");

        assert!(!is_collection(&file));
        assert!(is_collection(&dir));
        assert_eq!(collection_uri(&file).as_str(), "http://example.com/repo/a/");
        assert_eq!(collection_uri(&dir), dir);
        assert_eq!(
            parent_uri(&root, &file).unwrap().as_str(),
            "http://example.com/repo/a/"
        );
        assert_eq!(
            parent_uri(&root, &dir).unwrap().as_str(),
            "http://example.com/repo/a/"
        );
        assert_eq!(parent_uri(&root, &root), None);
    }

    #[test]
    fn test_relativize_and_resolve() {
        let root = url("http://example.com/repo/");
        let uri = url("http://example.com/repo/docs/readme.txt");
        let relative = relativize(&root, &uri).unwrap();
        assert_eq!(relative, "docs/readme.txt");
        assert_eq!(resolve(&root, &relative).unwrap(), uri);
        assert_eq!(relativize(&root, &root).unwrap(), "");
        assert_eq!(relativize(&root, &url("http://example.com/x")), None);
    }

    #[test]
    fn test_resolve_colon_in_first_segment() {
        let root = url("http://example.com/repo/");
        let resolved = resolve(&root, "a:b/c").unwrap();
        assert_eq!(resolved.as_str(), "http://example.com/repo/a:b/c");
    }

    #[test]
    fn test_name() {
        assert_eq!(
            name(&url("http://example.com/repo/a%20b.txt")).as_deref(),
            Some("a b.txt")
        );
        assert_eq!(
            name(&url("http://example.com/repo/dir/")).as_deref(),
            Some("dir")
        );
        assert_eq!(name(&url("http://example.com/")), None);
    }

    #[test]
    fn test_as_collection() {
        assert_eq!(
            as_collection(&url("http://example.com/repo/a")).as_str(),
            "http://example.com/repo/a/"
        );
    }

    #[test]
    fn test_source_mapping() {
        let mapping = SourceMapping::new(
            url("http://example.com/repo/"),
            url("file:///var/data/store/"),
        )
        .unwrap();
        let source = mapping
            .to_source(&url("http://example.com/repo/a/b.txt"))
            .unwrap();
        assert_eq!(source.as_str(), "file:///var/data/store/a/b.txt");
        let public = mapping.to_public(&source).unwrap();
        assert_eq!(public.as_str(), "http://example.com/repo/a/b.txt");
        assert!(mapping.to_source(&url("http://other.com/")).is_err());
    }

    #[test]
    fn test_check_root_rejects_non_collections() {
        assert!(check_root(&url("http://example.com/repo")).is_err());
        assert!(check_root(&url("urn:example:repo")).is_err());
        assert!(check_root(&url("http://example.com/repo/")).is_ok());
    }
}
