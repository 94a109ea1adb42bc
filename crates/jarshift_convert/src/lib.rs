// jarshift_convert - Archive conversion: metadata, text artifacts and class rewriting
pub mod access;
mod batch;
mod config;
mod error;
mod job;
pub mod manifest;
pub mod metadata;
pub mod refmap;
mod transformer;

pub use access::{convert_access_widener, AccessConversion, ACCESS_TRANSFORMER_PATH};
pub use batch::{ArchiveFailure, BatchConverter, BatchReport};
pub use config::{ConversionConfig, FetchSettings, LoaderSettings, MappingSources, MarkerSettings};
pub use error::{ConfigError, ConvertError};
pub use job::ArchiveJob;
pub use manifest::{JarManifest, MANIFEST_PATH};
pub use metadata::{FabricModData, MetadataError};
pub use refmap::{convert_refmap, convert_refmap_bytes};
pub use transformer::{ArchiveReport, ArchiveTransformer};
