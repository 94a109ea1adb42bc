use crate::error::ConvertError;
use crate::metadata::{FabricModData, FABRIC_METADATA_PATH};
use crate::refmap::refmaps_named_by;
use serde_json::Value;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

/// One input archive and the metadata its conversion needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveJob {
    pub path: PathBuf,
    pub metadata: FabricModData,
    /// Refmap entries named by the archive's mixin configs.
    pub refmaps: BTreeSet<String>,
}

impl ArchiveJob {
    /// Read the descriptor document and the mixin configs of `path`.
    pub fn from_archive(path: &Path) -> Result<Self, ConvertError> {
        let file = File::open(path).map_err(|source| ConvertError::io(path, source))?;
        let mut archive =
            ZipArchive::new(BufReader::new(file)).map_err(|source| ConvertError::zip(path, source))?;

        let bytes = match read_entry(&mut archive, FABRIC_METADATA_PATH) {
            Ok(bytes) => bytes,
            Err(ZipError::FileNotFound) => {
                return Err(ConvertError::MissingMetadata {
                    archive: path.to_path_buf(),
                })
            }
            Err(source) => return Err(ConvertError::zip(path, source)),
        };
        let metadata = FabricModData::parse(&bytes).map_err(|source| ConvertError::Metadata {
            archive: path.to_path_buf(),
            source,
        })?;

        let mut refmaps = BTreeSet::new();
        for mixin in &metadata.mixins {
            let bytes = match read_entry(&mut archive, &mixin.config) {
                Ok(bytes) => bytes,
                Err(ZipError::FileNotFound) => {
                    warn!(archive = %path.display(), config = %mixin.config, "mixin config not found");
                    continue;
                }
                Err(source) => return Err(ConvertError::zip(path, source)),
            };
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(config) => refmaps.extend(refmaps_named_by(&config)),
                Err(err) => {
                    warn!(archive = %path.display(), config = %mixin.config, error = %err, "unreadable mixin config")
                }
            }
        }

        debug!(
            archive = %path.display(),
            mod_id = %metadata.id,
            mixins = metadata.mixins.len(),
            refmaps = refmaps.len(),
            "loaded archive job"
        );
        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            refmaps,
        })
    }

    pub fn mod_id(&self) -> &str {
        &self.metadata.id
    }

    /// Output file name: the input file name.
    pub fn output_name(&self) -> OsString {
        self.path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from(format!("{}.jar", self.metadata.id)))
    }

    pub fn has_mixins(&self) -> bool {
        !self.metadata.mixins.is_empty()
    }
}

fn read_entry<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, ZipError> {
    let mut entry = archive.by_name(name.trim_start_matches('/'))?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}
