// jarshift_mappings - Symbol tables and mapping dataset handling
mod builder;
mod cache;
mod correspondence;
pub mod descriptor;
mod error;
mod fetch;
mod table;
pub mod text;
mod tiny;

pub use builder::MappingTableBuilder;
pub use cache::{MappingCache, MappingInputs, GENERATED_FILE_NAME, TYPE_NAMES_FILE_NAME};
pub use correspondence::TypeCorrespondence;
pub use error::{FetchError, MappingError, SymbolKind};
pub use fetch::{CorrespondenceFetcher, ManifestFetcher, NetworkPolicy, DEFAULT_MANIFEST_URL};
pub use table::{MappingSet, OwnerOverrideTable, SymbolTable};
pub use text::{SymbolPatterns, TextRemapper};
pub use tiny::{RawDataset, RawMember, RawType};

#[cfg(test)]
mod tests;
