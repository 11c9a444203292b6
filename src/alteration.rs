//! Property alteration requests.
//!
//! A [`ResourceAlteration`] bundles the four kinds of change a caller can
//! request against a resource description: add values, set (replace) all
//! values of a property, remove individual values, and remove every value of
//! a property. The façade strips live properties out of a request before a
//! backend ever sees it.

use std::collections::BTreeSet;
use url::Url;

use crate::error::{Error, Result};
use crate::property::{LiveProperties, Property, PropertyValue, Resource};

/// A request to change the properties of one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceAlteration {
    add: Vec<Property>,
    set: Vec<Property>,
    remove: Vec<Property>,
    remove_uris: BTreeSet<Url>,
}

impl ResourceAlteration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, keeping existing values.
    pub fn add(mut self, uri: Url, value: impl Into<PropertyValue>) -> Self {
        self.add.push(Property::new(uri, value));
        self
    }

    /// Replace all values of the property. Several `set` calls naming the
    /// same property accumulate into one replacement list.
    pub fn set(mut self, uri: Url, value: impl Into<PropertyValue>) -> Self {
        self.set.push(Property::new(uri, value));
        self
    }

    /// Remove one specific value instance.
    pub fn remove(mut self, uri: Url, value: impl Into<PropertyValue>) -> Self {
        self.remove.push(Property::new(uri, value));
        self
    }

    /// Remove every value of the property.
    pub fn remove_uri(mut self, uri: Url) -> Self {
        self.remove_uris.insert(uri);
        self
    }

    pub fn added(&self) -> &[Property] {
        &self.add
    }

    pub fn sets(&self) -> &[Property] {
        &self.set
    }

    pub fn removed(&self) -> &[Property] {
        &self.remove
    }

    pub fn removed_uris(&self) -> &BTreeSet<Url> {
        &self.remove_uris
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty()
            && self.set.is_empty()
            && self.remove.is_empty()
            && self.remove_uris.is_empty()
    }

    /// Property URIs replaced by this alteration.
    pub fn set_uris(&self) -> BTreeSet<&Url> {
        self.set.iter().map(|property| &property.uri).collect()
    }

    /// Whether the request is well formed.
    ///
    /// A property cannot be both replaced and removed wholesale in one
    /// request.
    pub fn validate(&self) -> Result<()> {
        if let Some(uri) = self
            .set
            .iter()
            .map(|property| &property.uri)
            .find(|uri| self.remove_uris.contains(*uri))
        {
            return Err(Error::invalid(format!(
                "property {} is both set and removed in one alteration",
                uri
            )));
        }
        Ok(())
    }

    /// A copy of this request with every live property dropped.
    pub fn without_live(&self, live: &LiveProperties) -> Self {
        let keep = |property: &&Property| !live.is_live(&property.uri);
        Self {
            add: self.add.iter().filter(keep).cloned().collect(),
            set: self.set.iter().filter(keep).cloned().collect(),
            remove: self.remove.iter().filter(keep).cloned().collect(),
            remove_uris: self
                .remove_uris
                .iter()
                .filter(|uri| !live.is_live(uri))
                .cloned()
                .collect(),
        }
    }

    /// Apply the request to a description in place.
    ///
    /// Removals happen first, then replacements, then additions.
    pub fn apply(&self, resource: &mut Resource) {
        let properties = resource.properties_mut();
        for uri in &self.remove_uris {
            properties.remove_all(uri);
        }
        for property in &self.remove {
            properties.remove_value(&property.uri, &property.value);
        }
        for uri in self.set_uris() {
            let values = self
                .set
                .iter()
                .filter(|property| &property.uri == uri)
                .map(|property| property.value.clone())
                .collect();
            properties.set(uri.clone(), values);
        }
        for property in &self.add {
            properties.add(property.uri.clone(), property.value.clone());
        }
    }
}
