//! # Alter Command Implementation
//!
//! Adds, sets and removes properties of a resource in one alteration.
//!
//! Assignments take the form `PROPERTY=VALUE`. A value prefix selects its
//! type: `int:42`, `time:2024-05-01T12:00:00Z`, `uri:http://...`, `ref:id`
//! or `text:...`; anything else is plain text.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use std::path::Path;
use url::Url;

use resource_repo::alteration::ResourceAlteration;
use resource_repo::property::PropertyValue;
use resource_repo::suggestions;

use super::{open_repository, resolve};

/// Alter the properties of a resource
#[derive(Args, Debug)]
pub struct AlterArgs {
    /// Resource to alter, relative to the repository root or an absolute URI.
    #[arg(value_name = "RESOURCE")]
    pub resource: String,

    /// Add a value to a property (PROPERTY=VALUE).
    #[arg(long, value_name = "PROPERTY=VALUE")]
    pub add: Vec<String>,

    /// Replace all values of a property (PROPERTY=VALUE).
    #[arg(long, value_name = "PROPERTY=VALUE")]
    pub set: Vec<String>,

    /// Remove one value (PROPERTY=VALUE) or every value (PROPERTY).
    #[arg(long, value_name = "PROPERTY[=VALUE]")]
    pub remove: Vec<String>,
}

impl AlterArgs {
    fn alteration(&self) -> Result<ResourceAlteration> {
        let mut alteration = ResourceAlteration::new();
        for assignment in &self.add {
            let (property, value) = parse_assignment(assignment)?;
            alteration = alteration.add(property, value);
        }
        for assignment in &self.set {
            let (property, value) = parse_assignment(assignment)?;
            alteration = alteration.set(property, value);
        }
        for removal in &self.remove {
            alteration = if removal.contains('=') {
                let (property, value) = parse_assignment(removal)?;
                alteration.remove(property, value)
            } else {
                alteration.remove_uri(parse_property(removal)?)
            };
        }
        Ok(alteration)
    }
}

/// Execute the `alter` command.
pub fn execute(config_path: &Path, args: AlterArgs) -> Result<()> {
    let alteration = args.alteration()?;
    if alteration.is_empty() {
        anyhow::bail!(
            "Nothing to alter\n\n\
             hint: Use --add, --set or --remove"
        );
    }
    let repository = open_repository(config_path)?;
    let uri = resolve(&repository, &args.resource)?;
    let altered = repository
        .alter_properties(&uri, &alteration)
        .map_err(suggestions::explain)?;
    log::info!(
        "Altered {}: {} properties",
        altered.uri(),
        altered.properties().len()
    );
    Ok(())
}

fn parse_property(text: &str) -> Result<Url> {
    Url::parse(text).with_context(|| format!("Invalid property URI: {}", text))
}

fn parse_assignment(assignment: &str) -> Result<(Url, PropertyValue)> {
    // Values may contain '='; the first one after the scheme splits
    let scheme_end = assignment.find(':').map_or(0, |index| index + 1);
    let split = assignment[scheme_end..]
        .find('=')
        .map(|index| index + scheme_end)
        .with_context(|| format!("Expected PROPERTY=VALUE, got: {}", assignment))?;
    let property = parse_property(&assignment[..split])?;
    let value = parse_value(&assignment[split + 1..])?;
    Ok((property, value))
}

fn parse_value(text: &str) -> Result<PropertyValue> {
    if let Some(integer) = text.strip_prefix("int:") {
        let value: i64 = integer
            .parse()
            .with_context(|| format!("Invalid integer: {}", integer))?;
        return Ok(PropertyValue::Integer(value));
    }
    if let Some(timestamp) = text.strip_prefix("time:") {
        let value = DateTime::parse_from_rfc3339(timestamp)
            .with_context(|| format!("Invalid RFC 3339 timestamp: {}", timestamp))?;
        return Ok(PropertyValue::Timestamp(value.with_timezone(&Utc)));
    }
    if let Some(uri) = text.strip_prefix("uri:") {
        let value = Url::parse(uri).with_context(|| format!("Invalid resource URI: {}", uri))?;
        return Ok(PropertyValue::Resource(value));
    }
    if let Some(reference) = text.strip_prefix("ref:") {
        return Ok(PropertyValue::Reference(reference.to_string()));
    }
    let text = text.strip_prefix("text:").unwrap_or(text);
    Ok(PropertyValue::Text(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_value_prefixes() {
        assert_eq!(parse_value("int:42").unwrap(), PropertyValue::Integer(42));
        assert_eq!(
            parse_value("time:2024-05-01T12:00:00Z").unwrap(),
            PropertyValue::Timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        );
        assert_eq!(
            parse_value("uri:http://example.com/a").unwrap(),
            PropertyValue::Resource(Url::parse("http://example.com/a").unwrap())
        );
        assert_eq!(
            parse_value("ref:node1").unwrap(),
            PropertyValue::Reference("node1".to_string())
        );
        assert_eq!(
            parse_value("text:int:1").unwrap(),
            PropertyValue::Text("int:1".to_string())
        );
        assert_eq!(
            parse_value("plain").unwrap(),
            PropertyValue::Text("plain".to_string())
        );
        assert!(parse_value("int:abc").is_err());
    }

    #[test]
    fn test_parse_assignment_splits_on_first_equals() {
        let (property, value) =
            parse_assignment("http://purl.org/dc/elements/1.1/title=a=b").unwrap();
        assert_eq!(property.as_str(), "http://purl.org/dc/elements/1.1/title");
        assert_eq!(value, PropertyValue::Text("a=b".to_string()));
        assert!(parse_assignment("http://purl.org/dc/elements/1.1/title").is_err());
    }

    #[test]
    fn test_alteration_from_args() {
        let args = AlterArgs {
            resource: "a.txt".to_string(),
            add: vec!["http://example.com/ns#tag=x".to_string()],
            set: vec!["http://example.com/ns#title=T".to_string()],
            remove: vec![
                "http://example.com/ns#old".to_string(),
                "http://example.com/ns#tag=y".to_string(),
            ],
        };
        let alteration = args.alteration().unwrap();
        assert_eq!(alteration.added().len(), 1);
        assert_eq!(alteration.sets().len(), 1);
        assert_eq!(alteration.removed().len(), 1);
        assert_eq!(alteration.removed_uris().len(), 1);
    }
}
