//! # Describe Command Implementation
//!
//! Prints the description of a resource: every property URI with its
//! values, live properties included.

use anyhow::Result;
use clap::Args;
use serde_json::{json, Map, Value};
use std::path::Path;

use resource_repo::output::{self, OutputConfig};
use resource_repo::property::{PropertyValue, Resource};
use resource_repo::suggestions;

use super::{open_repository, resolve};

/// Show the properties of a resource
#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Resource to describe, relative to the repository root or an absolute URI.
    #[arg(value_name = "RESOURCE")]
    pub resource: String,

    /// Print the description as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the `describe` command.
pub fn execute(config_path: &Path, output: &OutputConfig, args: DescribeArgs) -> Result<()> {
    let repository = open_repository(config_path)?;
    let uri = resolve(&repository, &args.resource)?;
    let resource = repository.describe(&uri).map_err(suggestions::explain)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&to_json(&resource))?);
        return Ok(());
    }
    println!("{}", resource.uri());
    for (property, value) in resource.properties().iter() {
        println!(
            "  {} = {}",
            output::property_name(output, property.as_str()),
            value
        );
    }
    Ok(())
}

fn value_to_json(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Text(text) => json!(text),
        PropertyValue::Integer(integer) => json!(integer),
        PropertyValue::Timestamp(timestamp) => json!({ "timestamp": timestamp.to_rfc3339() }),
        PropertyValue::Resource(uri) => json!({ "resource": uri.as_str() }),
        PropertyValue::Reference(id) => json!({ "reference": id }),
    }
}

fn to_json(resource: &Resource) -> Value {
    let mut properties = Map::new();
    for uri in resource.properties().property_uris() {
        let values = resource
            .properties()
            .values(uri)
            .iter()
            .map(value_to_json)
            .collect();
        properties.insert(uri.to_string(), Value::Array(values));
    }
    json!({
        "uri": resource.uri().as_str(),
        "collection": resource.is_collection(),
        "properties": properties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_to_json_groups_values_by_property() {
        let title = Url::parse("http://purl.org/dc/elements/1.1/title").unwrap();
        let mut resource = Resource::new(Url::parse("http://example.com/repo/a.txt").unwrap());
        resource.add_property(title.clone(), "first");
        resource.add_property(title.clone(), "second");
        resource.add_property(
            Url::parse("http://example.com/ns#see").unwrap(),
            Url::parse("http://example.com/repo/b.txt").unwrap(),
        );

        let value = to_json(&resource);
        assert_eq!(value["uri"], "http://example.com/repo/a.txt");
        assert_eq!(value["collection"], false);
        assert_eq!(
            value["properties"][title.as_str()],
            json!(["first", "second"])
        );
        assert_eq!(
            value["properties"]["http://example.com/ns#see"][0]["resource"],
            "http://example.com/repo/b.txt"
        );
    }
}
