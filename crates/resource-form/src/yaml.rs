//! Utility functions for converting resource values from and to the YAML
//! text view.
use std::io::Write;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use snafu::{ResultExt, Snafu};

type Result<T, E = Error> = std::result::Result<T, E>;

/// Represents every error which can be encountered during YAML conversion.
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to parse YAML document"))]
    ParseYaml { source: serde_yaml::Error },

    #[snafu(display("failed to serialize YAML"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("failed to write YAML document separator"))]
    WriteDocumentSeparator { source: std::io::Error },

    #[snafu(display("failed to parse bytes as valid UTF-8 string"))]
    ParseUtf8Bytes { source: std::string::FromUtf8Error },
}

/// Provides configurable options during YAML serialization.
///
/// The default implementation [`SerializeOptions::default()`] renders a plain
/// document without leading separator, which is what the text view shows.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerializeOptions {
    /// Adds leading triple dashes (`---`) to the output string.
    pub explicit_document: bool,
}

/// Parses the text view into a resource value.
///
/// Only the first document is used, further documents are ignored with a
/// warning. Empty input and documents which are neither a mapping nor a
/// sequence yield an empty mapping.
pub fn parse_resource(input: &str) -> Result<Value> {
    let mut documents = serde_yaml::Deserializer::from_str(input);

    let Some(first) = documents.next() else {
        return Ok(Value::Object(Map::new()));
    };
    let resource = Value::deserialize(first).context(ParseYamlSnafu)?;

    let ignored = documents.count();
    if ignored > 0 {
        tracing::warn!(ignored, "only a single resource is supported, ignoring further documents");
    }

    Ok(match resource {
        resource @ (Value::Object(_) | Value::Array(_)) => resource,
        _ => Value::Object(Map::new()),
    })
}

/// Serializes the given data structure and writes it to a [`Writer`](Write).
pub fn serialize<T, W>(value: &T, mut writer: W, options: SerializeOptions) -> Result<()>
where
    T: Serialize,
    W: Write,
{
    if options.explicit_document {
        writer
            .write_all(b"---\n")
            .context(WriteDocumentSeparatorSnafu)?;
    }

    let mut serializer = serde_yaml::Serializer::new(writer);
    value
        .serialize(&mut serializer)
        .context(SerializeYamlSnafu)?;

    Ok(())
}

/// Serializes the given data structure into a YAML string.
pub fn to_string<T: Serialize>(value: &T, options: SerializeOptions) -> Result<String> {
    let mut buffer = Vec::new();
    serialize(value, &mut buffer, options)?;
    String::from_utf8(buffer).context(ParseUtf8BytesSnafu)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_first_document() {
        let input = indoc! {"
            apiVersion: apps/v1
            kind: Deployment
            metadata:
              name: web
            ---
            apiVersion: v1
            kind: Service
        "};

        assert_eq!(
            parse_resource(input).unwrap(),
            json!({
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "metadata": { "name": "web" },
            })
        );
    }

    #[rstest]
    #[case("")]
    #[case("just a string")]
    #[case("42")]
    #[case("~")]
    fn parse_non_resources(#[case] input: &str) {
        assert_eq!(parse_resource(input).unwrap(), json!({}));
    }

    #[rstest]
    #[case("metadata: [unclosed")]
    #[case("key: value\n  bad indentation: here")]
    fn parse_invalid(#[case] input: &str) {
        assert!(matches!(parse_resource(input), Err(Error::ParseYaml { .. })));
    }

    #[test]
    fn serialize_resource() {
        let value = json!({
            "metadata": { "name": "web", "labels": { "app": "web" } },
            "spec": { "replicas": 2 },
        });

        assert_eq!(
            to_string(&value, SerializeOptions::default()).unwrap(),
            indoc! {"
                metadata:
                  labels:
                    app: web
                  name: web
                spec:
                  replicas: 2
            "}
        );

        let explicit = to_string(&value, SerializeOptions {
            explicit_document: true,
        })
        .unwrap();
        assert!(explicit.starts_with("---\nmetadata:\n"));
    }
}
