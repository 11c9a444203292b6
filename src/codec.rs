//! # Description Codec
//!
//! Some backends can hold only one flat string per property name (WebDAV
//! dead properties are the usual example). This module collapses all values
//! of one property into a single text value and expands it back:
//!
//! - A lone plain text value is stored verbatim.
//! - Anything else (several values, non-text values, or text that happens to
//!   start with the signature) is written as a minimal resource description
//!   in the structured description format, prefixed with [`SIGNATURE`].
//!
//! The structured format is also the canonical on-disk representation of a
//! whole description. It is the signature followed by one JSON object:
//!
//! ```text
//! `RRD{"uri":"","properties":{"http://purl.org/dc/elements/1.1/title":[{"text":"a"},{"text":"b"}]}}
//! ```
//!
//! URIs inside the block (the resource itself and resource-valued
//! properties) are written relative to a base URI; the empty string means the
//! base resource itself.
//!
//! Property names read from flat stores may use superseded namespaces.
//! [`LegacyNamespaces::migrate`] rewrites them to their canonical form before
//! decoding.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

use crate::error::{Error, Result};
use crate::property::{vocab, Property, PropertyValue, Resource};
use crate::uri;

/// Literal prefix identifying structured description text.
pub const SIGNATURE: &str = "`RRD";

#[derive(Debug, Serialize, Deserialize)]
struct DescriptionBlock {
    #[serde(default)]
    uri: String,
    #[serde(default)]
    properties: BTreeMap<String, Vec<WireValue>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum WireValue {
    Text(String),
    Integer(i64),
    Timestamp(DateTime<Utc>),
    Resource(String),
    Reference(String),
}

/// Write `target` as a reference relative to the level of `base` where
/// possible.
///
/// A suffix starting with a query, fragment or separator would resolve
/// against something other than the level, so those stay absolute.
fn relative_reference(base: &Url, target: &Url) -> String {
    if target == base {
        return String::new();
    }
    let level = uri::current_level(base);
    match uri::relativize(&level, target) {
        Some(relative) if !relative.is_empty() && !relative.starts_with(['?', '#', '/']) => {
            let first_segment = relative.split(uri::PATH_SEPARATOR).next().unwrap_or_default();
            if first_segment.contains(':') {
                format!("./{}", relative)
            } else {
                relative
            }
        }
        _ => target.to_string(),
    }
}

fn resolve_reference(base: &Url, reference: &str) -> Result<Url> {
    if reference.is_empty() {
        return Ok(base.clone());
    }
    Ok(uri::current_level(base).join(reference)?)
}

impl WireValue {
    fn from_value(base: &Url, value: &PropertyValue) -> Self {
        match value {
            PropertyValue::Text(text) => WireValue::Text(text.clone()),
            PropertyValue::Integer(value) => WireValue::Integer(*value),
            PropertyValue::Timestamp(value) => WireValue::Timestamp(*value),
            PropertyValue::Resource(target) => {
                WireValue::Resource(relative_reference(base, target))
            }
            PropertyValue::Reference(value) => WireValue::Reference(value.clone()),
        }
    }

    fn into_value(self, base: &Url) -> Result<PropertyValue> {
        Ok(match self {
            WireValue::Text(text) => PropertyValue::Text(text),
            WireValue::Integer(value) => PropertyValue::Integer(value),
            WireValue::Timestamp(value) => PropertyValue::Timestamp(value),
            WireValue::Resource(reference) => {
                PropertyValue::Resource(resolve_reference(base, &reference)?)
            }
            WireValue::Reference(value) => PropertyValue::Reference(value),
        })
    }
}

/// Serialize a whole description in the structured format, relative to `base`.
pub fn format_description(base: &Url, resource: &Resource) -> Result<String> {
    let mut properties: BTreeMap<String, Vec<WireValue>> = BTreeMap::new();
    for (property_uri, value) in resource.properties().iter() {
        properties
            .entry(property_uri.to_string())
            .or_default()
            .push(WireValue::from_value(base, value));
    }
    let block = DescriptionBlock {
        uri: relative_reference(base, resource.uri()),
        properties,
    };
    Ok(format!("{}{}", SIGNATURE, serde_json::to_string(&block)?))
}

/// Parse a description in the structured format, resolving URIs against `base`.
pub fn parse_description(base: &Url, text: &str) -> Result<Resource> {
    let body = text.strip_prefix(SIGNATURE).ok_or_else(|| {
        Error::invalid("description text does not start with the structured-format signature")
    })?;
    let block: DescriptionBlock = serde_json::from_str(body)
        .map_err(|e| Error::invalid(format!("malformed description text: {}", e)))?;
    let mut resource = Resource::new(resolve_reference(base, &block.uri)?);
    for (property_uri, values) in block.properties {
        let property_uri = Url::parse(&property_uri)?;
        for value in values {
            resource.add_property(property_uri.clone(), value.into_value(base)?);
        }
    }
    Ok(resource)
}

/// Collapse values of one property into a single text value.
///
/// Fails with an invalid-argument error if no properties are given or if they
/// do not all share one property URI.
pub fn encode_properties_as_text(resource_uri: &Url, properties: &[Property]) -> Result<String> {
    let first = properties
        .first()
        .ok_or_else(|| Error::invalid("no properties given to encode"))?;
    if properties.iter().any(|property| property.uri != first.uri) {
        return Err(Error::invalid(format!(
            "properties to encode must all share property URI {}",
            first.uri
        )));
    }
    if let [Property {
        value: PropertyValue::Text(text),
        ..
    }] = properties
    {
        if !text.starts_with(SIGNATURE) {
            return Ok(text.clone());
        }
    }
    let description = Resource::with_properties(
        resource_uri.clone(),
        properties.iter().cloned().collect(),
    );
    format_description(resource_uri, &description)
}

/// Expand text produced by [`encode_properties_as_text`] onto `target`.
///
/// Structured text replaces every existing value of `property_uri`; plain
/// text is appended as one literal value.
pub fn decode_properties_from_text(
    target: &mut Resource,
    property_uri: &Url,
    text: &str,
) -> Result<()> {
    if !text.starts_with(SIGNATURE) {
        target.add_property(property_uri.clone(), text);
        return Ok(());
    }
    let description = parse_description(target.uri(), text).map_err(|e| {
        Error::invalid(format!(
            "cannot decode property {} of {}: {}",
            property_uri,
            target.uri(),
            e
        ))
    })?;
    let values: Vec<PropertyValue> = description
        .properties()
        .iter()
        .map(|(_, value)| value.clone())
        .collect();
    if values.is_empty() {
        warn!(
            "Structured value of property {} on {} contains no values",
            property_uri,
            target.uri()
        );
    }
    let properties = target.properties_mut();
    properties.remove_all(property_uri);
    for value in values {
        properties.add(property_uri.clone(), value);
    }
    Ok(())
}

/// Encode every property of a description into one text value per property URI.
pub fn encode_properties(resource: &Resource) -> Result<BTreeMap<String, String>> {
    let mut encoded = BTreeMap::new();
    for property_uri in resource.properties().property_uris() {
        let properties: Vec<Property> = resource
            .properties()
            .values(property_uri)
            .iter()
            .map(|value| Property::new(property_uri.clone(), value.clone()))
            .collect();
        encoded.insert(
            property_uri.to_string(),
            encode_properties_as_text(resource.uri(), &properties)?,
        );
    }
    Ok(encoded)
}

/// Decode a flat property store onto `target`, migrating legacy names first.
pub fn decode_properties(
    target: &mut Resource,
    flat: &BTreeMap<String, String>,
    legacy: &LegacyNamespaces,
) -> Result<()> {
    for (name, text) in legacy.migrate(flat) {
        let property_uri = Url::parse(&name)
            .map_err(|e| Error::invalid(format!("invalid property name {}: {}", name, e)))?;
        decode_properties_from_text(target, &property_uri, &text)?;
    }
    Ok(())
}

/// One superseded namespace and the namespace that replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceMigration {
    pub legacy: String,
    pub canonical: String,
}

/// Rewrites property URIs in superseded namespaces to their canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyNamespaces {
    migrations: Vec<NamespaceMigration>,
}

impl LegacyNamespaces {
    /// No migrations at all.
    pub fn none() -> Self {
        Self {
            migrations: Vec::new(),
        }
    }

    pub fn new(migrations: Vec<NamespaceMigration>) -> Self {
        Self { migrations }
    }

    pub fn migrations(&self) -> &[NamespaceMigration] {
        &self.migrations
    }

    /// The canonical form of a legacy property URI, if it is one.
    pub fn canonical(&self, property_uri: &str) -> Option<String> {
        self.migrations.iter().find_map(|migration| {
            property_uri
                .strip_prefix(migration.legacy.as_str())
                .map(|local| format!("{}{}", migration.canonical, local))
        })
    }

    /// Return a copy of `properties` with legacy keys rewritten.
    ///
    /// When both a legacy key and its canonical key are present, the
    /// canonical entry wins and the legacy entry is dropped.
    pub fn migrate<V: Clone>(&self, properties: &BTreeMap<String, V>) -> BTreeMap<String, V> {
        let rewrites: Vec<(String, String)> = properties
            .keys()
            .filter_map(|key| self.canonical(key).map(|canonical| (key.clone(), canonical)))
            .collect();
        let mut migrated = properties.clone();
        for (legacy, canonical) in rewrites {
            let Some(value) = migrated.remove(&legacy) else {
                continue;
            };
            if migrated.contains_key(&canonical) {
                warn!(
                    "Dropping legacy property {} in favour of {}",
                    legacy, canonical
                );
                continue;
            }
            migrated.insert(canonical, value);
        }
        migrated
    }
}

impl Default for LegacyNamespaces {
    /// Dublin Core 1.0 → 1.1.
    fn default() -> Self {
        Self::new(vec![NamespaceMigration {
            legacy: vocab::DC_LEGACY_NAMESPACE.to_string(),
            canonical: vocab::DC_NAMESPACE.to_string(),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serial_test::serial;
    use std::collections::HashSet;

    fn base() -> Url {
        Url::parse("mem://test/docs/a.txt").unwrap()
    }

    fn title() -> Url {
        Url::parse(vocab::DC_TITLE).unwrap()
    }

    fn titles(values: &[&str]) -> Vec<Property> {
        values
            .iter()
            .map(|value| Property::new(title(), *value))
            .collect()
    }

    #[test]
    fn test_single_plain_text_is_verbatim() {
        let encoded = encode_properties_as_text(&base(), &titles(&["hello"])).unwrap();
        assert_eq!(encoded, "hello");
    }

    #[test]
    fn test_two_values_use_structured_format() {
        let encoded = encode_properties_as_text(&base(), &titles(&["a", "b"])).unwrap();
        insta::assert_snapshot!(encoded, @r#"`RRD{"uri":"","properties":{"http://purl.org/dc/elements/1.1/title":[{"text":"a"},{"text":"b"}]}}"#);

        let mut target = Resource::new(base());
        decode_properties_from_text(&mut target, &title(), &encoded).unwrap();
        let decoded: HashSet<&PropertyValue> =
            target.properties().values(&title()).iter().collect();
        let expected = [PropertyValue::from("a"), PropertyValue::from("b")];
        assert_eq!(decoded, expected.iter().collect());
    }

    #[test]
    fn test_text_starting_with_signature_is_escaped() {
        let tricky = format!("{}not really", SIGNATURE);
        let encoded = encode_properties_as_text(&base(), &titles(&[&tricky])).unwrap();
        assert_ne!(encoded, tricky);
        let mut target = Resource::new(base());
        decode_properties_from_text(&mut target, &title(), &encoded).unwrap();
        assert_eq!(
            target.property(&title()),
            Some(&PropertyValue::Text(tricky))
        );
    }

    #[test]
    fn test_encode_rejects_empty_and_mixed() {
        assert!(encode_properties_as_text(&base(), &[]).is_err());
        let mixed = vec![
            Property::new(title(), "a"),
            Property::new(vocab::content_modified().clone(), "b"),
        ];
        let error = encode_properties_as_text(&base(), &mixed).unwrap_err();
        assert_eq!(error.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_plain_decode_appends() {
        let mut target = Resource::new(base());
        target.add_property(title(), "existing");
        decode_properties_from_text(&mut target, &title(), "more").unwrap();
        assert_eq!(target.properties().values(&title()).len(), 2);
    }

    #[test]
    fn test_structured_decode_replaces() {
        let encoded = encode_properties_as_text(&base(), &titles(&["x", "y"])).unwrap();
        let mut target = Resource::new(base());
        target.add_property(title(), "stale");
        decode_properties_from_text(&mut target, &title(), &encoded).unwrap();
        assert_eq!(
            target.properties().values(&title()),
            &[PropertyValue::from("x"), PropertyValue::from("y")]
        );
    }

    #[test]
    fn test_malformed_structured_text_is_invalid_argument() {
        let mut target = Resource::new(base());
        let error = decode_properties_from_text(&mut target, &title(), "`RRD{not json")
            .unwrap_err();
        assert_eq!(error.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    #[serial]
    fn test_empty_structured_value_is_logged() {
        testing_logger::setup();
        let mut target = Resource::new(base());
        decode_properties_from_text(&mut target, &title(), r#"`RRD{"uri":""}"#).unwrap();
        assert!(!target.properties().contains(&title()));
        testing_logger::validate(|logs| {
            assert!(logs
                .iter()
                .any(|log| log.level == log::Level::Warn && log.body.contains("no values")));
        });
    }

    #[test]
    fn test_self_reference_resolves_to_target() {
        let link = Url::parse("urn:resource-repo:test:link").unwrap();
        let properties = vec![
            Property::new(link.clone(), base()),
            Property::new(
                link.clone(),
                Url::parse("mem://test/docs/other.txt").unwrap(),
            ),
        ];
        let encoded = encode_properties_as_text(&base(), &properties).unwrap();
        assert!(encoded.contains(r#"{"resource":""}"#));
        assert!(encoded.contains(r#"{"resource":"other.txt"}"#));

        let mut target = Resource::new(base());
        decode_properties_from_text(&mut target, &link, &encoded).unwrap();
        assert_eq!(target.property(&link), Some(&PropertyValue::Resource(base())));
    }

    #[test]
    fn test_references_beside_the_level_round_trip() {
        let link = Url::parse("urn:resource-repo:test:link").unwrap();
        for target in [
            "mem://test/docs/?q=1",
            "mem://test/docs/#frag",
            "mem://test/docs//x",
            "mem://test/docs/a.txt?q=1",
        ] {
            let target = Url::parse(target).unwrap();
            let properties = vec![
                Property::new(link.clone(), target.clone()),
                Property::new(link.clone(), "other"),
            ];
            let encoded = encode_properties_as_text(&base(), &properties).unwrap();

            let mut decoded = Resource::new(base());
            decode_properties_from_text(&mut decoded, &link, &encoded).unwrap();
            assert!(
                decoded
                    .properties()
                    .values(&link)
                    .contains(&PropertyValue::Resource(target.clone())),
                "{} did not survive {}",
                target,
                encoded
            );
        }
    }

    #[test]
    fn test_description_round_trip() {
        let mut resource = Resource::new(base());
        resource
            .add_property(title(), "Title")
            .add_property(vocab::content_length().clone(), 42i64)
            .add_property(vocab::content_modified().clone(), Utc::now());
        let text = format_description(&base(), &resource).unwrap();
        assert!(text.starts_with(SIGNATURE));
        assert_eq!(parse_description(&base(), &text).unwrap(), resource);
    }

    #[test]
    fn test_legacy_migration() {
        let legacy = LegacyNamespaces::default();
        let mut flat = BTreeMap::new();
        flat.insert("http://purl.org/dc/elements/1.0/title".to_string(), "old");
        flat.insert(
            "http://purl.org/dc/elements/1.0/creator".to_string(),
            "someone",
        );
        flat.insert("http://purl.org/dc/elements/1.1/title".to_string(), "new");

        let migrated = legacy.migrate(&flat);
        assert_eq!(migrated.len(), 2);
        assert_eq!(migrated[vocab::DC_TITLE], "new");
        assert_eq!(migrated["http://purl.org/dc/elements/1.1/creator"], "someone");
        assert_eq!(legacy.migrate(&migrated), migrated);
    }

    #[test]
    fn test_flat_round_trip() {
        let mut resource = Resource::new(base());
        resource
            .add_property(title(), "one")
            .add_property(title(), "two")
            .add_property(vocab::content_created().clone(), Utc::now());
        let flat = encode_properties(&resource).unwrap();
        assert_eq!(flat.len(), 2);

        let mut decoded = Resource::new(base());
        decode_properties(&mut decoded, &flat, &LegacyNamespaces::default()).unwrap();
        assert_eq!(decoded, resource);
    }

    fn reference_strategy() -> impl Strategy<Value = Url> {
        let level = prop_oneof![Just("mem://test/docs/"), Just("mem://test/")];
        let path = "(|[a-z]{1,6}|[a-z]{1,3}:[a-z]{1,3}|/[a-z]{1,4}|[a-z]{1,4}/|[a-z]{1,4}/[a-z]{1,4})";
        let query = "(\\?[a-z0-9=]{1,6})?";
        let fragment = "(#[a-z]{1,6})?";
        (level, path, query, fragment).prop_map(|(level, path, query, fragment)| {
            Url::parse(&format!("{}{}{}{}", level, path, query, fragment)).unwrap()
        })
    }

    fn value_strategy() -> impl Strategy<Value = PropertyValue> {
        prop_oneof![
            ".*".prop_map(PropertyValue::Text),
            any::<i64>().prop_map(PropertyValue::Integer),
            (0i64..4_102_444_800, 0u32..1_000_000_000).prop_map(|(seconds, nanos)| {
                PropertyValue::Timestamp(DateTime::from_timestamp(seconds, nanos).unwrap())
            }),
            reference_strategy().prop_map(PropertyValue::Resource),
            "[a-z0-9]{1,8}".prop_map(PropertyValue::Reference),
        ]
    }

    proptest! {
        /// Property: decoding an encoding yields the same set of values
        #[test]
        fn encode_decode_round_trip(values in proptest::collection::vec(value_strategy(), 1..5)) {
            let properties: Vec<Property> = values
                .iter()
                .map(|value| Property::new(title(), value.clone()))
                .collect();
            let encoded = encode_properties_as_text(&base(), &properties).unwrap();
            let mut target = Resource::new(base());
            decode_properties_from_text(&mut target, &title(), &encoded).unwrap();

            let decoded: HashSet<&PropertyValue> = target.properties().values(&title()).iter().collect();
            let expected: HashSet<&PropertyValue> = values.iter().collect();
            prop_assert_eq!(decoded, expected);
        }
    }
}
