use super::*;
use jarshift_convert::{ArchiveFailure, ArchiveReport, ConvertError};
use std::path::Path;
use test_case::test_case;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).expect("arguments parse")
}

#[test]
fn convert_accepts_overrides_and_archives() {
    let cli = parse(&[
        "jarshift",
        "convert",
        "--output",
        "out",
        "--cache-dir",
        "cache",
        "--target-version",
        "1.19.2",
        "--source-mappings",
        "src.tiny",
        "--target-mappings",
        "dst.tiny",
        "--offline",
        "--workers",
        "3",
        "--log-level",
        "debug",
        "a.jar",
        "b.jar",
    ]);
    assert_eq!(cli.log_level, Some(LogLevel::Debug));
    let Commands::Convert {
        mappings,
        output,
        workers,
        archives,
    } = cli.command
    else {
        panic!("expected convert command");
    };
    assert_eq!(output, Some(PathBuf::from("out")));
    assert_eq!(workers, Some(3));
    assert_eq!(archives, vec![PathBuf::from("a.jar"), PathBuf::from("b.jar")]);

    let config = mappings.resolve_config().expect("resolve config");
    assert_eq!(config.cache_dir, Some(PathBuf::from("cache")));
    assert_eq!(config.mappings.version, "1.19.2");
    assert_eq!(config.mappings.source, PathBuf::from("src.tiny"));
    assert_eq!(config.mappings.target, PathBuf::from("dst.tiny"));
    assert_eq!(config.fetch.network, NetworkPolicy::Deny);
}

#[test]
fn convert_requires_an_archive() {
    assert!(Cli::try_parse_from(["jarshift", "convert"]).is_err());
}

#[test]
fn flags_override_config_file_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jarshift.toml");
    std::fs::write(
        &path,
        "cache-dir = \"from-file\"\n[mappings]\nversion = \"1.18.2\"\nsource = \"file-source.tiny\"\n",
    )
    .unwrap();

    let args = MappingArgs {
        config: Some(path),
        target_version: Some("1.20.1".to_string()),
        ..MappingArgs::default()
    };
    let config = args.resolve_config().unwrap();
    assert_eq!(config.cache_dir, Some(PathBuf::from("from-file")));
    assert_eq!(config.mappings.version, "1.20.1");
    assert_eq!(config.mappings.source, PathBuf::from("file-source.tiny"));
    assert_eq!(config.fetch.network, NetworkPolicy::Allow);
}

#[test]
fn missing_config_file_is_reported_with_path() {
    let args = MappingArgs {
        config: Some(PathBuf::from("does/not/exist.toml")),
        ..MappingArgs::default()
    };
    let message = format!("{:#}", args.resolve_config().unwrap_err());
    assert!(message.contains("does/not/exist.toml"), "{message}");
}

#[test_case("trace", LogLevel::Trace ; "trace")]
#[test_case("DEBUG", LogLevel::Debug ; "upper case")]
#[test_case(" info ", LogLevel::Info ; "padded")]
#[test_case("warning", LogLevel::Warn ; "warning alias")]
#[test_case("Error", LogLevel::Error ; "mixed case")]
fn log_levels_parse(input: &str, expected: LogLevel) {
    assert_eq!(input.parse::<LogLevel>().unwrap(), expected);
}

#[test]
fn unknown_log_level_lists_choices() {
    let err = " loud ".parse::<LogLevel>().unwrap_err();
    assert_eq!(
        err.to_string(),
        "unknown log level `loud` (expected one of trace, debug, info, warn, error)"
    );
    assert!(Cli::try_parse_from(["jarshift", "--log-level", "loud", "remap-string", "x"]).is_err());
}

#[test]
fn log_levels_map_onto_level_filters() {
    use tracing::level_filters::LevelFilter;

    assert_eq!(LevelFilter::from(LogLevel::Trace), LevelFilter::TRACE);
    assert_eq!(LevelFilter::from(LogLevel::Warn), LevelFilter::WARN);
    assert_eq!(LevelFilter::from(LogLevel::default()), LevelFilter::INFO);
    assert_eq!(LogLevel::Error.to_string(), "error");
}

#[test]
fn log_level_converts_from_owned_strings() {
    assert_eq!(LogLevel::try_from("Trace".to_string()), Ok(LogLevel::Trace));
    let err: UnknownLogLevel = LogLevel::try_from("chatty".to_string()).unwrap_err();
    assert!(err.to_string().contains("`chatty`"));
    assert_eq!(String::from(LogLevel::Debug), "debug");
}

#[test]
fn log_level_round_trips_through_toml() {
    #[derive(serde::Serialize, serde::Deserialize)]
    struct Holder {
        level: LogLevel,
    }
    let text = toml::to_string(&Holder {
        level: LogLevel::Warn,
    })
    .unwrap();
    assert_eq!(text.trim(), "level = \"warn\"");
    let holder: Holder = toml::from_str("level = \"WARNING\"").unwrap();
    assert_eq!(holder.level, LogLevel::Warn);
    assert!(toml::from_str::<Holder>("level = \"verbose\"").is_err());
}

#[test]
fn report_lines_cover_successes_and_failures() {
    let report = BatchReport {
        converted: vec![ArchiveReport {
            source: PathBuf::from("mods/a.jar"),
            output: PathBuf::from("out/a.jar"),
            mod_id: "a".to_string(),
            classes: 4,
            classes_changed: 3,
            classes_renamed: 0,
            refmaps: 0,
            refmap_references: 0,
            access_lines: 2,
            access_lines_dropped: 1,
            signatures_dropped: 0,
            entrypoints: Vec::new(),
            marker_class: "jarshift/generated/a/Mod".to_string(),
        }],
        failures: vec![ArchiveFailure {
            archive: PathBuf::from("mods/b.jar"),
            error: ConvertError::MissingMetadata {
                archive: Path::new("mods/b.jar").to_path_buf(),
            },
        }],
    };
    assert_eq!(
        render_report(&report),
        vec![
            "converted mods/a.jar -> out/a.jar (4 classes, 3 rewritten, 1 access line(s) dropped)"
                .to_string(),
            "failed mods/b.jar: mods/b.jar has no fabric.mod.json".to_string(),
        ]
    );
}
