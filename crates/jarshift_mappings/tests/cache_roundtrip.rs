use jarshift_mappings::{
    CorrespondenceFetcher, FetchError, MappingCache, MappingError, MappingInputs,
    TypeCorrespondence, GENERATED_FILE_NAME, TYPE_NAMES_FILE_NAME,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

const SOURCE: &str = "tiny\t2\t0\tofficial\tintermediary\n\
c\ta\tnet/minecraft/class_1\n\
\tf\tI\tb\tfield_1\n\
\tm\t()V\tc\tmethod_1\n\
c\td\tnet/minecraft/class_2\n";

const TARGET: &str = "tiny\t2\t0\tofficial\tsrg\n\
c\ta\tnet/minecraft/world/Thing\n\
\tf\tI\tb\tf_1_\n\
\tm\t()V\tc\tm_1_\n\
c\td\tnet/minecraft/world/Other\n";

struct CountingFetcher {
    calls: AtomicUsize,
}

impl CountingFetcher {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CorrespondenceFetcher for CountingFetcher {
    fn fetch(&self, _version: &str) -> Result<TypeCorrespondence, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut correspondence = TypeCorrespondence::new();
        correspondence.insert("a", "net/minecraft/world/level/Thing");
        Ok(correspondence)
    }
}

struct FailingFetcher;

impl CorrespondenceFetcher for FailingFetcher {
    fn fetch(&self, _version: &str) -> Result<TypeCorrespondence, FetchError> {
        Err(FetchError::HttpRequest {
            uri: "https://example.invalid/manifest.json".to_string(),
            message: "connection refused".to_string(),
        })
    }
}

fn write_inputs(dir: &Path) -> MappingInputs {
    let source = dir.join("source.tiny");
    let target = dir.join("target.tiny");
    fs::write(&source, SOURCE).expect("write source");
    fs::write(&target, TARGET).expect("write target");
    MappingInputs::new("1.20.1", source, target)
}

fn cache_in(dir: &Path) -> (MappingCache, PathBuf) {
    let root = dir.join("cache");
    (MappingCache::new(&root), root)
}

#[test]
fn builds_then_reuses_cached_tables() {
    let temp = tempfile::tempdir().expect("temp dir");
    let inputs = write_inputs(temp.path());
    let (cache, root) = cache_in(temp.path());
    let fetcher = CountingFetcher::new();

    let first = cache.load_or_build(&inputs, &fetcher).expect("first build");
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(
        first.symbols.map_type("net/minecraft/class_1"),
        Some("net/minecraft/world/level/Thing")
    );
    assert_eq!(
        first.symbols.map_type("net/minecraft/class_2"),
        Some("net/minecraft/world/Other")
    );
    assert_eq!(first.symbols.map_field("field_1"), Some("f_1_"));

    let generated = fs::read(root.join(GENERATED_FILE_NAME)).expect("generated file");
    let second = cache.load_or_build(&inputs, &fetcher).expect("second load");
    assert_eq!(fetcher.calls(), 1, "cached tables must not trigger a fetch");
    assert_eq!(first, second);
    assert_eq!(fs::read(root.join(GENERATED_FILE_NAME)).unwrap(), generated);
}

#[test]
fn regeneration_is_byte_identical() {
    let temp = tempfile::tempdir().expect("temp dir");
    let inputs = write_inputs(temp.path());
    let (cache, root) = cache_in(temp.path());
    let fetcher = CountingFetcher::new();

    cache.load_or_build(&inputs, &fetcher).expect("first build");
    let first = fs::read(root.join(GENERATED_FILE_NAME)).unwrap();

    fs::remove_file(root.join(GENERATED_FILE_NAME)).unwrap();
    cache.load_or_build(&inputs, &fetcher).expect("rebuild");
    let second = fs::read(root.join(GENERATED_FILE_NAME)).unwrap();

    assert_eq!(first, second);
    // the correspondence file was still readable, so no second fetch
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn corrupt_generated_file_is_regenerated() {
    let temp = tempfile::tempdir().expect("temp dir");
    let inputs = write_inputs(temp.path());
    let (cache, root) = cache_in(temp.path());
    let fetcher = CountingFetcher::new();

    cache.load_or_build(&inputs, &fetcher).expect("first build");
    fs::write(root.join(GENERATED_FILE_NAME), "not a mapping file\n").unwrap();

    let set = cache.load_or_build(&inputs, &fetcher).expect("regenerate");
    assert_eq!(set.symbols.map_method("method_1"), Some("m_1_"));
}

#[test]
fn fetch_failure_is_fatal_and_writes_nothing() {
    let temp = tempfile::tempdir().expect("temp dir");
    let inputs = write_inputs(temp.path());
    let (cache, root) = cache_in(temp.path());

    let error = cache
        .load_or_build(&inputs, &FailingFetcher)
        .expect_err("fetch failure");

    assert!(matches!(error, MappingError::Fetch(FetchError::HttpRequest { .. })));
    assert!(!root.join(GENERATED_FILE_NAME).exists());
    assert!(!root.join(TYPE_NAMES_FILE_NAME).exists());
}

#[test]
fn changed_inputs_invalidate_the_cache() {
    let temp = tempfile::tempdir().expect("temp dir");
    let inputs = write_inputs(temp.path());
    let (cache, _root) = cache_in(temp.path());
    let fetcher = CountingFetcher::new();

    cache.load_or_build(&inputs, &fetcher).expect("first build");
    fs::write(
        &inputs.target,
        TARGET.replace("m_1_", "m_2_"),
    )
    .unwrap();

    let set = cache.load_or_build(&inputs, &fetcher).expect("rebuild");
    assert_eq!(set.symbols.map_method("method_1"), Some("m_2_"));
}

struct VersionedFetcher {
    calls: AtomicUsize,
}

impl CorrespondenceFetcher for VersionedFetcher {
    fn fetch(&self, version: &str) -> Result<TypeCorrespondence, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut correspondence = TypeCorrespondence::new();
        correspondence.insert("a", format!("net/minecraft/v{version}/Thing"));
        Ok(correspondence)
    }
}

#[test]
fn switching_versions_fetches_fresh_type_names() {
    let temp = tempfile::tempdir().expect("temp dir");
    let first_inputs = write_inputs(temp.path());
    let (cache, _root) = cache_in(temp.path());
    let fetcher = VersionedFetcher {
        calls: AtomicUsize::new(0),
    };

    let first = cache
        .load_or_build(&MappingInputs { version: "1".to_string(), ..first_inputs.clone() }, &fetcher)
        .expect("version 1");
    assert_eq!(
        first.symbols.map_type("net/minecraft/class_1"),
        Some("net/minecraft/v1/Thing")
    );

    let second = cache
        .load_or_build(&MappingInputs { version: "2".to_string(), ..first_inputs }, &fetcher)
        .expect("version 2");
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        second.symbols.map_type("net/minecraft/class_1"),
        Some("net/minecraft/v2/Thing")
    );
}
