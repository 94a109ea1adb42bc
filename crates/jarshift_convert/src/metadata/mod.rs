//! Mod metadata: the source descriptor document, entry points and the
//! generated target manifest.

mod entrypoint;
mod fabric;
mod forge;

pub use entrypoint::{
    AdapterRegistry, ClassIndex, DefaultLanguageAdapter, EntrypointError, EntrypointOutcome,
    EntrypointTarget, LanguageAdapter, ResolvedEntrypoint, DEFAULT_ADAPTER_ID,
};
pub use fabric::{
    Contact, Entrypoint, FabricModData, MixinConfig, Person, Side, FABRIC_METADATA_PATH,
};
pub use forge::{render_mods_toml, ForgeModEntry, ForgeModsToml, FORGE_METADATA_PATH};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown environment `{value}`")]
    UnknownEnvironment { value: String },
}
