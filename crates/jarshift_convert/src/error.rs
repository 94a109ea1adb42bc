use crate::metadata::MetadataError;
use jarshift_bytecode::{ClassParseError, HierarchyError, RewriteError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use zip::result::ZipError;

/// Failure converting one archive (or setting up a batch).
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("ZIP error in {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
    #[error("{archive} has no fabric.mod.json")]
    MissingMetadata { archive: PathBuf },
    #[error("invalid mod metadata in {archive}: {source}")]
    Metadata {
        archive: PathBuf,
        #[source]
        source: MetadataError,
    },
    #[error("malformed class {entry} in {archive}: {source}")]
    MalformedUnit {
        archive: PathBuf,
        entry: String,
        #[source]
        source: RewriteError,
    },
    #[error("class {entry} in {archive} would be written as {written}, which another class already occupies")]
    EntryCollision {
        archive: PathBuf,
        entry: String,
        written: String,
    },
    #[error("failed to generate marker class for {archive}: {source}")]
    Marker {
        archive: PathBuf,
        #[source]
        source: ClassParseError,
    },
    #[error("failed to write mods.toml for {archive}: {source}")]
    TargetManifest {
        archive: PathBuf,
        #[source]
        source: toml::ser::Error,
    },
    #[error("hierarchy indexing failed: {0}")]
    Hierarchy(#[from] HierarchyError),
    #[error("{archive} would overwrite output {output} already claimed by another archive")]
    DuplicateOutput { archive: PathBuf, output: PathBuf },
    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}

impl ConvertError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn zip(path: impl Into<PathBuf>, source: ZipError) -> Self {
        Self::Zip {
            path: path.into(),
            source,
        }
    }
}

/// Failure loading a [`crate::ConversionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}
