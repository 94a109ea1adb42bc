use crate::builder::MappingTableBuilder;
use crate::correspondence::TypeCorrespondence;
use crate::error::MappingError;
use crate::fetch::CorrespondenceFetcher;
use crate::table::MappingSet;
use crate::tiny::RawDataset;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const GENERATED_FILE_NAME: &str = "mappings.tiny";
pub const TYPE_NAMES_FILE_NAME: &str = "type_names.tsv";

const HEADER_TAG: &str = "# jarshift-mappings";
const TYPE_NAMES_TAG: &str = "# jarshift-type-names";

/// The raw inputs a generated table is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingInputs {
    pub version: String,
    pub source: PathBuf,
    pub target: PathBuf,
}

impl MappingInputs {
    pub fn new(version: impl Into<String>, source: PathBuf, target: PathBuf) -> Self {
        Self {
            version: version.into(),
            source,
            target,
        }
    }
}

/// On-disk cache of the generated mapping tables and the fetched type-name
/// correspondence.
#[derive(Debug, Clone)]
pub struct MappingCache {
    root: PathBuf,
}

impl MappingCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache rooted at `JARSHIFT_CACHE_DIR`, or `.jarshift/cache` under the
    /// working directory.
    pub fn with_default_location() -> Self {
        Self::new(default_cache_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn generated_path(&self) -> PathBuf {
        self.root.join(GENERATED_FILE_NAME)
    }

    pub fn type_names_path(&self) -> PathBuf {
        self.root.join(TYPE_NAMES_FILE_NAME)
    }

    /// Reuse the generated tables when they match `inputs`, otherwise join the
    /// raw datasets (fetching the correspondence if it is not cached) and
    /// persist the result.
    pub fn load_or_build(
        &self,
        inputs: &MappingInputs,
        fetcher: &dyn CorrespondenceFetcher,
    ) -> Result<MappingSet, MappingError> {
        let source_text = read_text(&inputs.source)?;
        let target_text = read_text(&inputs.target)?;
        let fingerprint = fingerprint(&inputs.version, &source_text, &target_text);

        if let Some(dataset) = self.load_generated(&inputs.version, &fingerprint) {
            info!(path = %self.generated_path().display(), "reusing cached mapping tables");
            return MappingSet::from_dataset(&dataset);
        }

        let correspondence = match self.load_correspondence(&inputs.version) {
            Some(correspondence) => correspondence,
            None => {
                let correspondence = fetcher.fetch(&inputs.version)?;
                self.store_correspondence(&inputs.version, &correspondence)?;
                correspondence
            }
        };

        let source = RawDataset::parse(&source_text)?;
        let target = RawDataset::parse(&target_text)?;
        let joined = MappingTableBuilder::new(source, target)
            .with_correspondence(correspondence)
            .join();
        let set = MappingSet::from_dataset(&joined)?;

        let mut contents = format!("{}\t{}\t{}\n", HEADER_TAG, inputs.version, fingerprint);
        contents.push_str(&joined.to_text());
        self.write_atomic(GENERATED_FILE_NAME, contents.as_bytes())?;
        info!(path = %self.generated_path().display(), "generated mapping tables");

        Ok(set)
    }

    /// Read the generated dataset. Missing, stale or unparsable files are
    /// reported as absent.
    pub fn load_generated(&self, version: &str, fingerprint: &str) -> Option<RawDataset> {
        let path = self.generated_path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "no cached mapping tables");
                return None;
            }
        };

        let expected = format!("{}\t{}\t{}", HEADER_TAG, version, fingerprint);
        if text.lines().next() != Some(expected.as_str()) {
            debug!(path = %path.display(), "cached mapping tables are stale");
            return None;
        }

        match RawDataset::parse(&text) {
            Ok(dataset) => Some(dataset),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "discarding unreadable mapping cache");
                None
            }
        }
    }

    /// Read the type-name correspondence cached for `version`. A file written
    /// for another version, or one that is empty or unparsable, is absent.
    pub fn load_correspondence(&self, version: &str) -> Option<TypeCorrespondence> {
        let path = self.type_names_path();
        let text = fs::read_to_string(&path).ok()?;
        let (header, body) = text.split_once('\n').unwrap_or((text.as_str(), ""));
        if header != format!("{}\t{}", TYPE_NAMES_TAG, version) {
            debug!(path = %path.display(), version, "cached type-name correspondence is for another version");
            return None;
        }
        match TypeCorrespondence::from_tsv(body) {
            Ok(correspondence) if !correspondence.is_empty() => Some(correspondence),
            Ok(_) => {
                warn!(path = %path.display(), "cached type-name correspondence is empty");
                None
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "discarding unreadable type-name correspondence");
                None
            }
        }
    }

    /// Persist `correspondence` as the cached type names for `version`.
    pub fn store_correspondence(
        &self,
        version: &str,
        correspondence: &TypeCorrespondence,
    ) -> Result<(), MappingError> {
        let mut contents = format!("{}\t{}\n", TYPE_NAMES_TAG, version);
        contents.push_str(&correspondence.to_tsv());
        self.write_atomic(TYPE_NAMES_FILE_NAME, contents.as_bytes())
    }

    fn write_atomic(&self, file_name: &str, contents: &[u8]) -> Result<(), MappingError> {
        fs::create_dir_all(&self.root).map_err(|source| MappingError::io(&self.root, source))?;
        let destination = self.root.join(file_name);
        let mut temp =
            NamedTempFile::new_in(&self.root).map_err(|source| MappingError::io(&self.root, source))?;
        temp.write_all(contents)
            .map_err(|source| MappingError::io(temp.path(), source))?;
        temp.persist(&destination)
            .map_err(|err| MappingError::io(&destination, err.error))?;
        Ok(())
    }
}

fn read_text(path: &Path) -> Result<String, MappingError> {
    fs::read_to_string(path).map_err(|source| MappingError::io(path, source))
}

fn fingerprint(version: &str, source: &str, target: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [version, source, target] {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn default_cache_dir() -> PathBuf {
    match std::env::var_os("JARSHIFT_CACHE_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(".jarshift").join("cache"),
    }
}
