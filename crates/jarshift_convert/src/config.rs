use crate::error::ConfigError;
use jarshift_mappings::{NetworkPolicy, DEFAULT_MANIFEST_URL};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything a conversion run needs besides the archives themselves.
///
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConversionConfig {
    /// Directory converted archives are written to. Cleared at the start of
    /// every batch.
    pub output_dir: PathBuf,
    /// Mapping cache root; `None` uses the default cache location.
    pub cache_dir: Option<PathBuf>,
    /// Worker threads for archive conversion; `None` lets rayon decide.
    pub workers: Option<usize>,
    pub mappings: MappingSources,
    pub fetch: FetchSettings,
    pub loader: LoaderSettings,
    pub marker: MarkerSettings,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(".jarshift/mods"),
            cache_dir: None,
            workers: None,
            mappings: MappingSources::default(),
            fetch: FetchSettings::default(),
            loader: LoaderSettings::default(),
            marker: MarkerSettings::default(),
        }
    }
}

/// The platform version and the two raw datasets joined into the symbol
/// tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MappingSources {
    pub version: String,
    /// Source namespace → anchor namespace dataset.
    pub source: PathBuf,
    /// Anchor namespace → target namespace dataset.
    pub target: PathBuf,
}

impl Default for MappingSources {
    fn default() -> Self {
        Self {
            version: "1.18.2".to_string(),
            source: PathBuf::from("mappings/source.tiny"),
            target: PathBuf::from("mappings/target.tiny"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchSettings {
    pub manifest_url: String,
    pub timeout_secs: u64,
    pub network: NetworkPolicy,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            timeout_secs: 30,
            network: NetworkPolicy::Allow,
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Values written into the generated `META-INF/mods.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoaderSettings {
    pub mod_loader: String,
    pub loader_version: String,
    /// Used when the source metadata declares no license.
    pub license: String,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            mod_loader: "javafml".to_string(),
            loader_version: "[40,)".to_string(),
            license: "Unknown".to_string(),
        }
    }
}

/// Marker class and container-manifest marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MarkerSettings {
    /// Package (internal form) the marker classes are generated under.
    pub package: String,
    /// Descriptor of the annotation the host loader looks for.
    pub annotation: String,
    pub manifest_attribute: String,
    pub manifest_value: String,
}

impl Default for MarkerSettings {
    fn default() -> Self {
        Self {
            package: "jarshift/generated".to_string(),
            annotation: "Lnet/minecraftforge/fml/common/Mod;".to_string(),
            manifest_attribute: "Transformed-With-Jarshift".to_string(),
            manifest_value: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ConversionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == Some(0) {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        if self.mappings.version.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "mappings.version must not be empty".to_string(),
            ));
        }
        let annotation = &self.marker.annotation;
        if !(annotation.len() > 2 && annotation.starts_with('L') && annotation.ends_with(';')) {
            return Err(ConfigError::Invalid(format!(
                "marker.annotation `{annotation}` is not an object type descriptor"
            )));
        }
        if self.marker.manifest_attribute.is_empty()
            || !self
                .marker
                .manifest_attribute
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        {
            return Err(ConfigError::Invalid(format!(
                "marker.manifest-attribute `{}` is not a valid manifest header",
                self.marker.manifest_attribute
            )));
        }
        Ok(())
    }
}
