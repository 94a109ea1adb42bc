//! Generated `META-INF/mods.toml`.

use super::{FabricModData, Person};
use crate::config::LoaderSettings;
use serde::Serialize;

pub const FORGE_METADATA_PATH: &str = "META-INF/mods.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgeModsToml {
    pub mod_loader: String,
    pub loader_version: String,
    pub license: String,
    pub mods: Vec<ForgeModEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgeModEntry {
    pub mod_id: String,
    pub version: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<String>,
    #[serde(rename = "displayURL", skip_serializing_if = "Option::is_none")]
    pub display_url: Option<String>,
}

impl ForgeModsToml {
    pub fn from_metadata(data: &FabricModData, loader: &LoaderSettings) -> Self {
        let join_names = |people: &[Person]| {
            (!people.is_empty()).then(|| {
                people
                    .iter()
                    .map(|person| person.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
        };
        let license = if data.licenses.is_empty() {
            loader.license.clone()
        } else {
            data.licenses.join(", ")
        };

        Self {
            mod_loader: loader.mod_loader.clone(),
            loader_version: loader.loader_version.clone(),
            license,
            mods: vec![ForgeModEntry {
                mod_id: data.id.clone(),
                version: data.version.clone(),
                display_name: data.name.clone().unwrap_or_else(|| data.id.clone()),
                description: data.description.clone(),
                logo_file: data.icon.clone(),
                authors: join_names(&data.authors),
                credits: join_names(&data.contributors),
                display_url: data.contact.homepage.clone(),
            }],
        }
    }
}

/// Render the target manifest for `data`.
pub fn render_mods_toml(
    data: &FabricModData,
    loader: &LoaderSettings,
) -> Result<String, toml::ser::Error> {
    toml::to_string(&ForgeModsToml::from_metadata(data, loader))
}
