use crate::correspondence::TypeCorrespondence;
use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::time::Duration;
use tracing::{debug, info};
use ureq::{Agent, AgentBuilder};

pub const DEFAULT_MANIFEST_URL: &str =
    "https://launchermeta.mojang.com/mc/game/version_manifest.json";

/// Whether a cache miss may reach out to the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkPolicy {
    #[default]
    Allow,
    Deny,
}

/// Source of the anchor → target type-name correspondence for one platform
/// version.
pub trait CorrespondenceFetcher: Send + Sync {
    fn fetch(&self, version: &str) -> Result<TypeCorrespondence, FetchError>;
}

/// Downloads the vendor's client and server obfuscation maps via the
/// version manifest and merges them.
#[derive(Debug, Clone)]
pub struct ManifestFetcher {
    manifest_url: String,
    timeout: Duration,
    policy: NetworkPolicy,
}

#[derive(Debug, Deserialize)]
struct VersionManifest {
    versions: Vec<VersionEntry>,
}

#[derive(Debug, Deserialize)]
struct VersionEntry {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct VersionDetails {
    #[serde(default)]
    downloads: Downloads,
}

#[derive(Debug, Default, Deserialize)]
struct Downloads {
    client_mappings: Option<Download>,
    server_mappings: Option<Download>,
}

#[derive(Debug, Deserialize)]
struct Download {
    url: String,
}

impl ManifestFetcher {
    pub fn new(manifest_url: impl Into<String>) -> Self {
        Self {
            manifest_url: manifest_url.into(),
            timeout: Duration::from_secs(30),
            policy: NetworkPolicy::Allow,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: NetworkPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn get_bytes(&self, agent: &Agent, uri: &str) -> Result<Vec<u8>, FetchError> {
        debug!(uri, "fetching");
        let response = agent.get(uri).call().map_err(|err| match err {
            ureq::Error::Status(status, _) => FetchError::HttpResponse {
                uri: uri.to_string(),
                status,
            },
            ureq::Error::Transport(transport) => FetchError::HttpRequest {
                uri: uri.to_string(),
                message: transport.to_string(),
            },
        })?;

        let mut reader = response.into_reader();
        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .map_err(|err| FetchError::HttpRequest {
                uri: uri.to_string(),
                message: err.to_string(),
            })?;
        Ok(buffer)
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        agent: &Agent,
        uri: &str,
    ) -> Result<T, FetchError> {
        let bytes = self.get_bytes(agent, uri)?;
        serde_json::from_slice(&bytes).map_err(|source| FetchError::InvalidJson {
            uri: uri.to_string(),
            source,
        })
    }

    fn get_correspondence(&self, agent: &Agent, uri: &str) -> Result<TypeCorrespondence, FetchError> {
        let bytes = self.get_bytes(agent, uri)?;
        let text = String::from_utf8(bytes)
            .map_err(|err| FetchError::Malformed(format!("{}: {}", uri, err)))?;
        TypeCorrespondence::parse_obfuscation_map(&text)
    }
}

impl Default for ManifestFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_MANIFEST_URL)
    }
}

impl CorrespondenceFetcher for ManifestFetcher {
    fn fetch(&self, version: &str) -> Result<TypeCorrespondence, FetchError> {
        if self.policy == NetworkPolicy::Deny {
            return Err(FetchError::NetworkDisabled);
        }

        let agent = AgentBuilder::new().timeout(self.timeout).build();
        let manifest: VersionManifest = self.get_json(&agent, &self.manifest_url)?;
        let entry = manifest
            .versions
            .into_iter()
            .find(|entry| entry.id == version)
            .ok_or_else(|| FetchError::UnknownVersion {
                version: version.to_string(),
            })?;

        let details: VersionDetails = self.get_json(&agent, &entry.url)?;
        let client = details
            .downloads
            .client_mappings
            .ok_or_else(|| FetchError::MissingDownload {
                version: version.to_string(),
                download: "client_mappings",
            })?;
        let server = details
            .downloads
            .server_mappings
            .ok_or_else(|| FetchError::MissingDownload {
                version: version.to_string(),
                download: "server_mappings",
            })?;

        let mut correspondence = self.get_correspondence(&agent, &client.url)?;
        correspondence.merge(self.get_correspondence(&agent, &server.url)?)?;
        info!(
            version,
            entries = correspondence.len(),
            "fetched type-name correspondence"
        );
        Ok(correspondence)
    }
}
