//! `fabric.mod.json` parsing.
//!
//! Several keys accept either a plain string or an object; the raw shapes are
//! deserialised with untagged enums and then normalised.

use super::{MetadataError, DEFAULT_ADAPTER_ID as DEFAULT_ADAPTER};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::warn;

pub const FABRIC_METADATA_PATH: &str = "fabric.mod.json";

/// Which physical side a mod or mixin config applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Client,
    Server,
    Both,
}

impl FromStr for Side {
    type Err = MetadataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "" | "*" => Ok(Side::Both),
            other if other.eq_ignore_ascii_case("client") => Ok(Side::Client),
            other if other.eq_ignore_ascii_case("server") => Ok(Side::Server),
            other => Err(MetadataError::UnknownEnvironment {
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrypoint {
    pub adapter: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixinConfig {
    pub config: String,
    pub environment: Side,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Person {
    pub name: String,
    pub contact: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Contact {
    pub homepage: Option<String>,
    pub sources: Option<String>,
    pub issues: Option<String>,
}

/// Normalised source metadata of one mod archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FabricModData {
    pub schema_version: u64,
    pub id: String,
    pub version: String,
    pub environment: Side,
    /// Entry points per entry-point key (`main`, `client`, ...), in key order.
    pub entrypoints: BTreeMap<String, Vec<Entrypoint>>,
    pub nested_jars: Vec<String>,
    pub mixins: Vec<MixinConfig>,
    pub access_widener: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub authors: Vec<Person>,
    pub contributors: Vec<Person>,
    pub contact: Contact,
    pub licenses: Vec<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawModJson {
    #[serde(default)]
    schema_version: u64,
    id: String,
    version: String,
    #[serde(default)]
    environment: String,
    #[serde(default)]
    entrypoints: BTreeMap<String, Vec<RawEntrypoint>>,
    #[serde(default)]
    jars: Vec<RawJar>,
    #[serde(default)]
    mixins: Vec<RawMixin>,
    #[serde(default)]
    access_widener: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    authors: Vec<RawPerson>,
    #[serde(default)]
    contributors: Vec<RawPerson>,
    #[serde(default)]
    contact: Contact,
    #[serde(default)]
    license: Option<RawLicense>,
    #[serde(default)]
    icon: Option<RawIcon>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntrypoint {
    Value(String),
    Object {
        #[serde(default)]
        adapter: Option<String>,
        value: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawJar {
    file: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawMixin {
    Path(String),
    Object {
        config: String,
        #[serde(default)]
        environment: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPerson {
    Name(String),
    Object {
        name: String,
        #[serde(default)]
        contact: BTreeMap<String, String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLicense {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawIcon {
    Path(String),
    Sizes(BTreeMap<String, String>),
}

impl FabricModData {
    pub fn parse(bytes: &[u8]) -> Result<Self, MetadataError> {
        let raw: RawModJson = serde_json::from_slice(bytes)?;
        if raw.schema_version != 1 {
            warn!(
                schema_version = raw.schema_version,
                mod_id = %raw.id,
                "unexpected fabric.mod.json schema version"
            );
        }

        let entrypoints = raw
            .entrypoints
            .into_iter()
            .map(|(key, entries)| {
                let entries = entries
                    .into_iter()
                    .map(|entry| match entry {
                        RawEntrypoint::Value(value) => Entrypoint {
                            adapter: DEFAULT_ADAPTER.to_string(),
                            value,
                        },
                        RawEntrypoint::Object { adapter, value } => Entrypoint {
                            adapter: adapter.unwrap_or_else(|| DEFAULT_ADAPTER.to_string()),
                            value,
                        },
                    })
                    .collect();
                (key, entries)
            })
            .collect();

        let mixins = raw
            .mixins
            .into_iter()
            .map(|mixin| match mixin {
                RawMixin::Path(config) => Ok(MixinConfig {
                    config,
                    environment: Side::Both,
                }),
                RawMixin::Object {
                    config,
                    environment,
                } => Ok(MixinConfig {
                    config,
                    environment: environment.parse()?,
                }),
            })
            .collect::<Result<Vec<_>, MetadataError>>()?;

        let licenses = match raw.license {
            Some(RawLicense::One(license)) => vec![license],
            Some(RawLicense::Many(licenses)) => licenses,
            None => Vec::new(),
        };

        Ok(Self {
            schema_version: raw.schema_version,
            id: raw.id,
            version: raw.version,
            environment: raw.environment.parse()?,
            entrypoints,
            nested_jars: raw.jars.into_iter().map(|jar| jar.file).collect(),
            mixins,
            access_widener: raw
                .access_widener
                .filter(|path| !path.trim().is_empty()),
            name: raw.name,
            description: raw.description,
            authors: raw.authors.into_iter().map(Person::from).collect(),
            contributors: raw.contributors.into_iter().map(Person::from).collect(),
            contact: raw.contact,
            licenses,
            icon: raw.icon.and_then(largest_icon),
        })
    }

    /// Every entry point across all keys, with its key.
    pub fn all_entrypoints(&self) -> impl Iterator<Item = (&str, &Entrypoint)> {
        self.entrypoints
            .iter()
            .flat_map(|(key, entries)| entries.iter().map(move |entry| (key.as_str(), entry)))
    }
}

impl From<RawPerson> for Person {
    fn from(raw: RawPerson) -> Self {
        match raw {
            RawPerson::Name(name) => Person {
                name,
                contact: BTreeMap::new(),
            },
            RawPerson::Object { name, contact } => Person { name, contact },
        }
    }
}

/// A size → path icon map resolves to the largest size; unparsable sizes
/// sort lowest.
fn largest_icon(icon: RawIcon) -> Option<String> {
    match icon {
        RawIcon::Path(path) => Some(path),
        RawIcon::Sizes(sizes) => sizes
            .into_iter()
            .max_by_key(|(size, _)| size.parse::<u32>().unwrap_or(0))
            .map(|(_, path)| path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const FULL: &str = r#"{
        "schemaVersion": 1,
        "id": "example-mod",
        "version": "1.2.3",
        "environment": "*",
        "entrypoints": {
            "main": ["com.example.ExampleMod", {"adapter": "kotlin", "value": "com.example.Kt"}],
            "client": [{"value": "com.example.Client::init"}]
        },
        "jars": [{"file": "META-INF/jars/lib.jar"}],
        "mixins": ["example.mixins.json", {"config": "example.client.mixins.json", "environment": "client"}],
        "accessWidener": "example.accesswidener",
        "name": "Example Mod",
        "description": "Does things",
        "authors": ["Alice", {"name": "Bob", "contact": {"email": "bob@example.com"}}],
        "contributors": ["Carol"],
        "contact": {"homepage": "https://example.com", "issues": "https://example.com/issues"},
        "license": ["MIT", "Apache-2.0"],
        "icon": {"16": "icon16.png", "128": "icon128.png", "64": "icon64.png"}
    }"#;

    #[test]
    fn parses_every_supported_field() {
        let data = FabricModData::parse(FULL.as_bytes()).expect("parse metadata");
        assert_eq!(data.id, "example-mod");
        assert_eq!(data.version, "1.2.3");
        assert_eq!(data.environment, Side::Both);
        assert_eq!(
            data.entrypoints["main"],
            vec![
                Entrypoint {
                    adapter: "default".to_string(),
                    value: "com.example.ExampleMod".to_string()
                },
                Entrypoint {
                    adapter: "kotlin".to_string(),
                    value: "com.example.Kt".to_string()
                },
            ]
        );
        assert_eq!(data.entrypoints["client"][0].adapter, "default");
        assert_eq!(data.nested_jars, vec!["META-INF/jars/lib.jar".to_string()]);
        assert_eq!(
            data.mixins,
            vec![
                MixinConfig {
                    config: "example.mixins.json".to_string(),
                    environment: Side::Both
                },
                MixinConfig {
                    config: "example.client.mixins.json".to_string(),
                    environment: Side::Client
                },
            ]
        );
        assert_eq!(data.access_widener.as_deref(), Some("example.accesswidener"));
        assert_eq!(data.authors[0].name, "Alice");
        assert_eq!(data.authors[1].contact["email"], "bob@example.com");
        assert_eq!(data.contributors[0].name, "Carol");
        assert_eq!(data.contact.homepage.as_deref(), Some("https://example.com"));
        assert_eq!(data.licenses, vec!["MIT".to_string(), "Apache-2.0".to_string()]);
        assert_eq!(data.icon.as_deref(), Some("icon128.png"));
        assert_eq!(data.all_entrypoints().count(), 3);
    }

    #[test]
    fn minimal_metadata_uses_defaults() {
        let data = FabricModData::parse(br#"{"id": "m", "version": "1"}"#).unwrap();
        assert_eq!(data.schema_version, 0);
        assert_eq!(data.environment, Side::Both);
        assert!(data.entrypoints.is_empty());
        assert!(data.access_widener.is_none());
        assert!(data.licenses.is_empty());
        assert!(data.icon.is_none());
    }

    #[test]
    fn blank_access_widener_is_absent() {
        let data =
            FabricModData::parse(br#"{"id": "m", "version": "1", "accessWidener": "  "}"#).unwrap();
        assert!(data.access_widener.is_none());
    }

    #[test_case(r#"{"version": "1"}"# ; "missing id")]
    #[test_case(r#"{"id": "m", "version": "1", "environment": "both"}"# ; "unknown environment")]
    #[test_case(r#"{"id": "m", "version": "1", "mixins": [7]}"# ; "mixin of wrong type")]
    #[test_case("not json" ; "not json")]
    fn rejects_invalid_metadata(input: &str) {
        assert!(FabricModData::parse(input.as_bytes()).is_err());
    }

    #[test_case("", Side::Both ; "empty")]
    #[test_case("*", Side::Both ; "wildcard")]
    #[test_case("CLIENT", Side::Client ; "client upper case")]
    #[test_case("server", Side::Server ; "server")]
    fn side_parsing(value: &str, expected: Side) {
        assert_eq!(value.parse::<Side>().unwrap(), expected);
    }
}
