//! # Resource Property Model
//!
//! A resource's metadata is a multimap from property URI to an ordered list
//! of typed values. Some properties are *live*: their values are derived
//! from backend state (content length, last access) and are never stored,
//! replaced, or removed by clients. Each repository publishes its live set as
//! an immutable [`LiveProperties`] value and swaps it wholesale when a new
//! live property is registered.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::OnceLock;
use url::Url;

use crate::uri;

/// Property URIs understood by the repository itself.
pub mod vocab {
    use super::*;

    /// Namespace of content properties.
    pub const CONTENT_NAMESPACE: &str = "urn:resource-repo:content:";
    /// Byte length of the resource content (live).
    pub const CONTENT_LENGTH: &str = "urn:resource-repo:content:length";
    /// Last time the content was read (live).
    pub const CONTENT_ACCESSED: &str = "urn:resource-repo:content:accessed";
    /// Last time the content was written.
    pub const CONTENT_MODIFIED: &str = "urn:resource-repo:content:modified";
    /// Time the resource was created.
    pub const CONTENT_CREATED: &str = "urn:resource-repo:content:created";

    /// Dublin Core element set, current namespace.
    pub const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";
    /// Dublin Core element set, superseded namespace.
    pub const DC_LEGACY_NAMESPACE: &str = "http://purl.org/dc/elements/1.0/";
    pub const DC_TITLE: &str = "http://purl.org/dc/elements/1.1/title";
    pub const DC_DESCRIPTION: &str = "http://purl.org/dc/elements/1.1/description";

    fn cached(cell: &'static OnceLock<Url>, uri: &str) -> &'static Url {
        cell.get_or_init(|| Url::parse(uri).expect("vocabulary URIs are valid"))
    }

    pub fn content_length() -> &'static Url {
        static CELL: OnceLock<Url> = OnceLock::new();
        cached(&CELL, CONTENT_LENGTH)
    }

    pub fn content_accessed() -> &'static Url {
        static CELL: OnceLock<Url> = OnceLock::new();
        cached(&CELL, CONTENT_ACCESSED)
    }

    pub fn content_modified() -> &'static Url {
        static CELL: OnceLock<Url> = OnceLock::new();
        cached(&CELL, CONTENT_MODIFIED)
    }

    pub fn content_created() -> &'static Url {
        static CELL: OnceLock<Url> = OnceLock::new();
        cached(&CELL, CONTENT_CREATED)
    }
}

/// A single typed property value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyValue {
    /// A plain text literal.
    Text(String),
    /// An integer number.
    Integer(i64),
    /// A point in time.
    Timestamp(DateTime<Utc>),
    /// A reference to another resource by URI.
    Resource(Url),
    /// An opaque reference the repository does not interpret.
    Reference(String),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            PropertyValue::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&Url> {
        match self {
            PropertyValue::Resource(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(text) => write!(f, "{}", text),
            PropertyValue::Integer(value) => write!(f, "{}", value),
            PropertyValue::Timestamp(value) => write!(f, "{}", value.to_rfc3339()),
            PropertyValue::Resource(value) => write!(f, "<{}>", value),
            PropertyValue::Reference(value) => write!(f, "#{}", value),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(text: &str) -> Self {
        PropertyValue::Text(text.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(text: String) -> Self {
        PropertyValue::Text(text)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        PropertyValue::Timestamp(value)
    }
}

impl From<Url> for PropertyValue {
    fn from(value: Url) -> Self {
        PropertyValue::Resource(value)
    }
}

/// A (property URI, value) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Property {
    pub uri: Url,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(uri: Url, value: impl Into<PropertyValue>) -> Self {
        Self {
            uri,
            value: value.into(),
        }
    }
}

/// Multimap from property URI to its ordered values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap {
    entries: BTreeMap<Url, Vec<PropertyValue>>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, keeping any existing values for the property.
    pub fn add(&mut self, uri: Url, value: PropertyValue) {
        self.entries.entry(uri).or_default().push(value);
    }

    /// Replace every value of a property. An empty list removes it.
    pub fn set(&mut self, uri: Url, values: Vec<PropertyValue>) {
        if values.is_empty() {
            self.entries.remove(&uri);
        } else {
            self.entries.insert(uri, values);
        }
    }

    /// All values of a property, in insertion order.
    pub fn values(&self, uri: &Url) -> &[PropertyValue] {
        self.entries.get(uri).map(Vec::as_slice).unwrap_or_default()
    }

    /// The first value of a property, if any.
    pub fn first(&self, uri: &Url) -> Option<&PropertyValue> {
        self.values(uri).first()
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.entries.contains_key(uri)
    }

    /// Remove every value of a property, returning them.
    pub fn remove_all(&mut self, uri: &Url) -> Vec<PropertyValue> {
        self.entries.remove(uri).unwrap_or_default()
    }

    /// Remove one value instance. Returns `true` if it was present.
    pub fn remove_value(&mut self, uri: &Url, value: &PropertyValue) -> bool {
        let Some(values) = self.entries.get_mut(uri) else {
            return false;
        };
        let Some(position) = values.iter().position(|existing| existing == value) else {
            return false;
        };
        values.remove(position);
        if values.is_empty() {
            self.entries.remove(uri);
        }
        true
    }

    /// Property URIs in lexical order.
    pub fn property_uris(&self) -> impl Iterator<Item = &Url> {
        self.entries.keys()
    }

    /// Every (property URI, value) pair.
    pub fn iter(&self) -> impl Iterator<Item = (&Url, &PropertyValue)> {
        self.entries
            .iter()
            .flat_map(|(uri, values)| values.iter().map(move |value| (uri, value)))
    }

    /// Number of distinct property URIs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep only the properties whose URI satisfies the predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(&Url) -> bool) {
        self.entries.retain(|uri, _| keep(uri));
    }
}

impl FromIterator<Property> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        let mut map = PropertyMap::new();
        for property in iter {
            map.add(property.uri, property.value);
        }
        map
    }
}

/// An addressable resource: its URI and its property set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    uri: Url,
    properties: PropertyMap,
}

impl Resource {
    pub fn new(uri: Url) -> Self {
        Self {
            uri,
            properties: PropertyMap::new(),
        }
    }

    pub fn with_properties(uri: Url, properties: PropertyMap) -> Self {
        Self { uri, properties }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn set_uri(&mut self, uri: Url) {
        self.uri = uri;
    }

    pub fn is_collection(&self) -> bool {
        uri::is_collection(&self.uri)
    }

    /// The decoded resource name; `None` for a namespace root.
    pub fn name(&self) -> Option<String> {
        uri::name(&self.uri)
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut PropertyMap {
        &mut self.properties
    }

    /// Append a property value.
    pub fn add_property(&mut self, uri: Url, value: impl Into<PropertyValue>) -> &mut Self {
        self.properties.add(uri, value.into());
        self
    }

    /// Replace all values of a property with a single value.
    pub fn set_property(&mut self, uri: Url, value: impl Into<PropertyValue>) -> &mut Self {
        self.properties.set(uri, vec![value.into()]);
        self
    }

    pub fn property(&self, uri: &Url) -> Option<&PropertyValue> {
        self.properties.first(uri)
    }

    /// The content length, if the backend reported one.
    pub fn content_length(&self) -> Option<u64> {
        self.property(vocab::content_length())
            .and_then(PropertyValue::as_integer)
            .and_then(|length| u64::try_from(length).ok())
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.property(vocab::content_modified())
            .and_then(PropertyValue::as_timestamp)
    }

    pub fn accessed(&self) -> Option<DateTime<Utc>> {
        self.property(vocab::content_accessed())
            .and_then(PropertyValue::as_timestamp)
    }

    /// A copy of this description with every live property removed.
    pub fn without_live(&self, live: &LiveProperties) -> Resource {
        let mut stored = self.clone();
        stored.properties.retain(|uri| !live.is_live(uri));
        stored
    }
}

/// The immutable set of live property URIs for a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveProperties {
    uris: HashSet<Url>,
}

impl LiveProperties {
    /// An empty live set.
    pub fn empty() -> Self {
        Self {
            uris: HashSet::new(),
        }
    }

    pub fn is_live(&self, uri: &Url) -> bool {
        self.uris.contains(uri)
    }

    /// A new set containing this set plus `uri`.
    pub fn with(&self, uri: Url) -> Self {
        let mut uris = self.uris.clone();
        uris.insert(uri);
        Self { uris }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Url> {
        self.uris.iter()
    }

    pub fn len(&self) -> usize {
        self.uris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }
}

impl Default for LiveProperties {
    /// Content length and content access time.
    fn default() -> Self {
        Self::empty()
            .with(vocab::content_length().clone())
            .with(vocab::content_accessed().clone())
    }
}

impl FromIterator<Url> for LiveProperties {
    fn from_iter<I: IntoIterator<Item = Url>>(iter: I) -> Self {
        Self {
            uris: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title() -> Url {
        Url::parse(vocab::DC_TITLE).unwrap()
    }

    fn resource() -> Resource {
        Resource::new(Url::parse("http://example.com/repo/a.txt").unwrap())
    }

    #[test]
    fn test_add_keeps_existing_values() {
        let mut map = PropertyMap::new();
        map.add(title(), "a".into());
        map.add(title(), "b".into());
        assert_eq!(
            map.values(&title()),
            &[PropertyValue::from("a"), PropertyValue::from("b")]
        );
        assert_eq!(map.len(), 1);
        assert_eq!(map.iter().count(), 2);
    }

    #[test]
    fn test_set_replaces_and_empty_set_removes() {
        let mut map = PropertyMap::new();
        map.add(title(), "a".into());
        map.set(title(), vec!["z".into()]);
        assert_eq!(map.values(&title()), &[PropertyValue::from("z")]);
        map.set(title(), vec![]);
        assert!(!map.contains(&title()));
    }

    #[test]
    fn test_remove_value() {
        let mut map = PropertyMap::new();
        map.add(title(), "a".into());
        map.add(title(), "b".into());
        assert!(map.remove_value(&title(), &"a".into()));
        assert!(!map.remove_value(&title(), &"missing".into()));
        assert_eq!(map.values(&title()), &[PropertyValue::from("b")]);
        assert!(map.remove_value(&title(), &"b".into()));
        assert!(map.is_empty());
    }

    #[test]
    fn test_content_length_accessor() {
        let mut resource = resource();
        assert_eq!(resource.content_length(), None);
        resource.set_property(vocab::content_length().clone(), 1025i64);
        assert_eq!(resource.content_length(), Some(1025));
    }

    #[test]
    fn test_without_live() {
        let mut resource = resource();
        resource
            .set_property(vocab::content_length().clone(), 3i64)
            .add_property(title(), "Title");
        let stored = resource.without_live(&LiveProperties::default());
        assert_eq!(stored.content_length(), None);
        assert_eq!(stored.property(&title()), Some(&"Title".into()));
    }

    #[test]
    fn test_live_properties_with_is_new_set() {
        let live = LiveProperties::default();
        let extended = live.with(title());
        assert!(!live.is_live(&title()));
        assert!(extended.is_live(&title()));
        assert!(extended.is_live(vocab::content_length()));
        assert_eq!(extended.len(), 3);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(PropertyValue::Integer(4).to_string(), "4");
        assert_eq!(PropertyValue::from("x").to_string(), "x");
        assert_eq!(
            PropertyValue::Resource(Url::parse("http://e.com/").unwrap()).to_string(),
            "<http://e.com/>"
        );
    }
}
