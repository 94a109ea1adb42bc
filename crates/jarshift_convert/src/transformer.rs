//! Per-archive transformation.
//!
//! An archive moves through open, entry walk, metadata finalisation and
//! marker synthesis before it is closed. Output is written to a temporary
//! file next to the target and only renamed into place once every step has
//! succeeded, so a failed archive leaves nothing at its output path.

use crate::access::{convert_access_widener, ACCESS_TRANSFORMER_PATH};
use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::job::ArchiveJob;
use crate::manifest::{JarManifest, MANIFEST_PATH};
use crate::metadata::{
    render_mods_toml, AdapterRegistry, ClassIndex, EntrypointOutcome, EntrypointTarget,
    FORGE_METADATA_PATH,
};
use crate::refmap::{convert_refmap_bytes, is_refmap_entry};
use jarshift_bytecode::{
    synthesize_marker, ClassFile, ClassRewriter, MarkerSpec, RewriteError, SymbolRemapper,
    TypeGraph,
};
use jarshift_mappings::{MappingSet, TextRemapper};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, trace, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Open,
    WalkEntries,
    FinalizeMetadata,
    SynthesizeMarker,
    Close,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Phase::Open => "open",
            Phase::WalkEntries => "walk-entries",
            Phase::FinalizeMetadata => "finalize-metadata",
            Phase::SynthesizeMarker => "synthesize-marker",
            Phase::Close => "close",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub mod_id: String,
    pub classes: usize,
    pub classes_changed: usize,
    pub classes_renamed: usize,
    pub refmaps: usize,
    pub refmap_references: usize,
    pub access_lines: usize,
    pub access_lines_dropped: usize,
    pub signatures_dropped: usize,
    pub entrypoints: Vec<EntrypointOutcome>,
    pub marker_class: String,
}

impl ArchiveReport {
    fn new(job: &ArchiveJob, output: &Path) -> Self {
        Self {
            source: job.path.clone(),
            output: output.to_path_buf(),
            mod_id: job.mod_id().to_string(),
            classes: 0,
            classes_changed: 0,
            classes_renamed: 0,
            refmaps: 0,
            refmap_references: 0,
            access_lines: 0,
            access_lines_dropped: 0,
            signatures_dropped: 0,
            entrypoints: Vec::new(),
            marker_class: String::new(),
        }
    }

    pub fn unresolved_entrypoints(&self) -> usize {
        self.entrypoints
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .count()
    }
}

/// Converts archives against one mapping set and one batch hierarchy.
pub struct ArchiveTransformer<'a> {
    rewriter: ClassRewriter<'a>,
    text: TextRemapper<'a>,
    config: &'a ConversionConfig,
    adapters: &'a AdapterRegistry,
}

impl<'a> ArchiveTransformer<'a> {
    pub fn new(
        mappings: &'a MappingSet,
        graph: &'a TypeGraph,
        config: &'a ConversionConfig,
        adapters: &'a AdapterRegistry,
    ) -> Self {
        Self {
            rewriter: ClassRewriter::new(SymbolRemapper::new(mappings, graph)),
            text: TextRemapper::new(mappings),
            config,
            adapters,
        }
    }

    /// Convert `job` into `output`. On failure nothing is left at `output`.
    pub fn transform(&self, job: &ArchiveJob, output: &Path) -> Result<ArchiveReport, ConvertError> {
        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir).map_err(|source| ConvertError::io(dir, source))?;
        let report = self.write_archive(job, temp.as_file_mut(), output)?;
        temp.persist(output)
            .map_err(|err| ConvertError::io(output, err.error))?;

        trace!(archive = %job.path.display(), phase = %Phase::Close, "archive closed");
        info!(
            archive = %job.path.display(),
            output = %output.display(),
            classes = report.classes,
            changed = report.classes_changed,
            "converted archive"
        );
        Ok(report)
    }

    fn write_archive<W: Write + Seek>(
        &self,
        job: &ArchiveJob,
        sink: W,
        output: &Path,
    ) -> Result<ArchiveReport, ConvertError> {
        let source = job.path.as_path();
        trace!(archive = %source.display(), phase = %Phase::Open, "opening archive");
        let file = File::open(source).map_err(|err| ConvertError::io(source, err))?;
        let mut archive = ZipArchive::new(BufReader::new(file))
            .map_err(|err| ConvertError::zip(source, err))?;
        let mut writer = ZipWriter::new(sink);
        let mut report = ArchiveReport::new(job, output);
        let metadata = &job.metadata;

        let marker = synthesize_marker(
            &MarkerSpec {
                package: &self.config.marker.package,
                annotation: &self.config.marker.annotation,
            },
            &metadata.id,
        )
        .map_err(|err| ConvertError::Marker {
            archive: source.to_path_buf(),
            source: err,
        })?;

        // The container manifest goes first so stream readers find it.
        trace!(archive = %source.display(), phase = %Phase::FinalizeMetadata, "writing manifests");
        let mut manifest = match read_named(&mut archive, MANIFEST_PATH) {
            Some(bytes) => JarManifest::parse(&String::from_utf8_lossy(&bytes)),
            None => JarManifest::new(),
        };
        manifest.set(
            &self.config.marker.manifest_attribute,
            self.config.marker.manifest_value.as_str(),
        );
        if job.has_mixins() {
            let configs: Vec<&str> = metadata.mixins.iter().map(|mixin| mixin.config.as_str()).collect();
            manifest.set("MixinConfigs", configs.join(","));
        }
        put(&mut writer, MANIFEST_PATH, &manifest.to_bytes(), output)?;

        let mods_toml = render_mods_toml(metadata, &self.config.loader).map_err(|err| {
            ConvertError::TargetManifest {
                archive: source.to_path_buf(),
                source: err,
            }
        })?;
        put(&mut writer, FORGE_METADATA_PATH, mods_toml.as_bytes(), output)?;

        let widener = metadata
            .access_widener
            .as_deref()
            .map(|path| path.trim_start_matches('/'));
        let mut reserved: HashSet<&str> =
            HashSet::from([MANIFEST_PATH, FORGE_METADATA_PATH, marker.entry_name.as_str()]);
        if widener.is_some() {
            reserved.insert(ACCESS_TRANSFORMER_PATH);
        }

        let wanted: HashSet<String> = metadata
            .all_entrypoints()
            .filter_map(|(_, entry)| EntrypointTarget::parse(&entry.value).ok())
            .map(|target| format!("{}.class", target.class()))
            .collect();
        let mut classes = ClassIndex::new();
        let mut class_entries: HashSet<String> = HashSet::new();
        let mut widener_seen = false;

        trace!(archive = %source.display(), phase = %Phase::WalkEntries, entries = archive.len(), "walking entries");
        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|err| ConvertError::zip(source, err))?;
            let name = entry.name().to_string();

            if entry.is_dir() {
                writer
                    .add_directory(name, entry_options())
                    .map_err(|err| ConvertError::zip(output, err))?;
                continue;
            }
            if is_signature_file(&name) {
                debug!(archive = %source.display(), entry = %name, "dropping signature file");
                report.signatures_dropped += 1;
                continue;
            }
            if reserved.contains(name.as_str()) {
                debug!(archive = %source.display(), entry = %name, "replacing generated entry");
                continue;
            }

            if name.ends_with(".class") {
                let bytes = read_all(&mut entry).map_err(|err| ConvertError::io(source, err))?;
                let malformed = |err: RewriteError| ConvertError::MalformedUnit {
                    archive: source.to_path_buf(),
                    entry: name.clone(),
                    source: err,
                };
                let rewritten = self.rewriter.rewrite(&bytes).map_err(malformed)?;
                if wanted.contains(&name) {
                    let class = ClassFile::parse(&bytes).map_err(|err| malformed(err.into()))?;
                    classes.insert(&class).map_err(|err| malformed(err.into()))?;
                }

                report.classes += 1;
                if rewritten.changed {
                    report.classes_changed += 1;
                }
                let out_name = if rewritten.name != rewritten.original_name
                    && name == format!("{}.class", rewritten.original_name)
                {
                    report.classes_renamed += 1;
                    format!("{}.class", rewritten.name)
                } else {
                    name.clone()
                };
                if !class_entries.insert(out_name.clone()) {
                    return Err(ConvertError::EntryCollision {
                        archive: source.to_path_buf(),
                        entry: name,
                        written: out_name,
                    });
                }
                trace!(entry = %name, output = %out_name, changed = rewritten.changed, "rewrote class");
                put(&mut writer, &out_name, &rewritten.bytes, output)?;
            } else if widener == Some(name.as_str()) {
                widener_seen = true;
                let bytes = read_all(&mut entry).map_err(|err| ConvertError::io(source, err))?;
                let conversion = convert_access_widener(&String::from_utf8_lossy(&bytes), &self.text);
                report.access_lines = conversion.converted;
                report.access_lines_dropped = conversion.dropped;
                put(&mut writer, ACCESS_TRANSFORMER_PATH, conversion.text.as_bytes(), output)?;
            } else if is_refmap_entry(&name, &job.refmaps) {
                let bytes = read_all(&mut entry).map_err(|err| ConvertError::io(source, err))?;
                match convert_refmap_bytes(&bytes, &self.text) {
                    Some((converted, changed)) => {
                        report.refmaps += 1;
                        report.refmap_references += changed;
                        put(&mut writer, &name, &converted, output)?;
                    }
                    None => {
                        warn!(archive = %source.display(), entry = %name, "refmap is not valid JSON, copying unchanged");
                        put(&mut writer, &name, &bytes, output)?;
                    }
                }
            } else {
                writer
                    .raw_copy_file(entry)
                    .map_err(|err| ConvertError::zip(output, err))?;
            }
        }

        if let (Some(path), false) = (widener, widener_seen) {
            warn!(archive = %source.display(), path, "declared access widener not found");
        }

        report.entrypoints = metadata
            .all_entrypoints()
            .map(|(key, entry)| {
                let result = self.adapters.resolve(entry, &classes);
                if let Err(err) = &result {
                    warn!(archive = %source.display(), key, value = %entry.value, error = %err, "unresolved entry point");
                }
                EntrypointOutcome {
                    key: key.to_string(),
                    entrypoint: entry.clone(),
                    result,
                }
            })
            .collect();

        trace!(archive = %source.display(), phase = %Phase::SynthesizeMarker, class = %marker.entry_name, "writing marker");
        put(&mut writer, &marker.entry_name, &marker.bytes, output)?;
        report.marker_class = marker.entry_name.trim_end_matches(".class").to_string();

        writer
            .finish()
            .map_err(|err| ConvertError::zip(output, err))?;
        Ok(report)
    }
}

fn entry_options() -> FileOptions {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
}

fn put<W: Write + Seek>(
    writer: &mut ZipWriter<W>,
    name: &str,
    bytes: &[u8],
    output: &Path,
) -> Result<(), ConvertError> {
    writer
        .start_file(name, entry_options())
        .map_err(|err| ConvertError::zip(output, err))?;
    writer
        .write_all(bytes)
        .map_err(|err| ConvertError::io(output, err))
}

fn read_all(reader: &mut impl Read) -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn read_named<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Option<Vec<u8>> {
    let mut entry = archive.by_name(name).ok()?;
    read_all(&mut entry).ok()
}

/// Jar signature files directly under `META-INF/`.
fn is_signature_file(name: &str) -> bool {
    let Some(file) = name.strip_prefix("META-INF/") else {
        return false;
    };
    if file.contains('/') {
        return false;
    }
    let upper = file.to_ascii_uppercase();
    [".SF", ".RSA", ".DSA", ".EC"]
        .iter()
        .any(|suffix| upper.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("META-INF/CERT.SF", true ; "signature manifest")]
    #[test_case("META-INF/CERT.RSA", true ; "rsa block")]
    #[test_case("META-INF/key.dsa", true ; "lower case dsa")]
    #[test_case("META-INF/SIGNER.EC", true ; "ec block")]
    #[test_case("META-INF/MANIFEST.MF", false ; "manifest")]
    #[test_case("META-INF/services/a.SF", false ; "nested")]
    #[test_case("assets/CERT.SF", false ; "outside meta-inf")]
    fn signature_files(name: &str, expected: bool) {
        assert_eq!(is_signature_file(name), expected);
    }

    #[test]
    fn phases_render_in_kebab_case() {
        assert_eq!(Phase::WalkEntries.to_string(), "walk-entries");
        assert_eq!(Phase::Open.as_str(), "open");
    }
}
