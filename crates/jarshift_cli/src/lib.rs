// jarshift CLI - argument parsing and command dispatch
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use jarshift_convert::{BatchConverter, BatchReport, ConversionConfig};
use jarshift_mappings::{
    ManifestFetcher, MappingCache, MappingInputs, MappingSet, NetworkPolicy, TextRemapper,
};
use std::path::PathBuf;
use tracing::info;

pub mod logging;

pub use logging::{LogLevel, UnknownLogLevel};

#[derive(Parser, Debug)]
#[command(name = "jarshift", version, about = "Convert Fabric mod jars into Forge mod jars")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error); defaults to RUST_LOG, then info
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert mod archives into the output directory
    Convert {
        #[command(flatten)]
        mappings: MappingArgs,
        /// Output directory (cleared before conversion)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Worker threads
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
        /// Archives to convert
        #[arg(required = true, value_name = "ARCHIVE")]
        archives: Vec<PathBuf>,
    },
    /// Print a value after best-effort symbol remapping
    RemapString {
        #[command(flatten)]
        mappings: MappingArgs,
        value: String,
    },
}

/// Options shared by every command that needs the mapping tables.
#[derive(Args, Debug, Clone, Default)]
pub struct MappingArgs {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Mapping cache directory
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
    /// Target platform version
    #[arg(long, value_name = "VERSION")]
    pub target_version: Option<String>,
    /// Source → anchor mapping dataset
    #[arg(long, value_name = "FILE")]
    pub source_mappings: Option<PathBuf>,
    /// Anchor → target mapping dataset
    #[arg(long, value_name = "FILE")]
    pub target_mappings: Option<PathBuf>,
    /// Never download the type-name correspondence
    #[arg(long)]
    pub offline: bool,
}

impl MappingArgs {
    /// Load the config file (or defaults) and apply flag overrides.
    pub fn resolve_config(&self) -> Result<ConversionConfig> {
        let mut config = match &self.config {
            Some(path) => ConversionConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ConversionConfig::default(),
        };
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        if let Some(version) = &self.target_version {
            config.mappings.version = version.clone();
        }
        if let Some(path) = &self.source_mappings {
            config.mappings.source = path.clone();
        }
        if let Some(path) = &self.target_mappings {
            config.mappings.target = path.clone();
        }
        if self.offline {
            config.fetch.network = NetworkPolicy::Deny;
        }
        Ok(config)
    }
}

/// Build or reuse the mapping tables described by `config`.
pub fn load_mappings(config: &ConversionConfig) -> Result<MappingSet> {
    let cache = match &config.cache_dir {
        Some(dir) => MappingCache::new(dir.clone()),
        None => MappingCache::with_default_location(),
    };
    let fetcher = ManifestFetcher::new(config.fetch.manifest_url.clone())
        .with_timeout(config.fetch.timeout())
        .with_policy(config.fetch.network);
    let inputs = MappingInputs::new(
        config.mappings.version.clone(),
        config.mappings.source.clone(),
        config.mappings.target.clone(),
    );
    cache
        .load_or_build(&inputs, &fetcher)
        .with_context(|| format!("failed to prepare mapping tables in {}", cache.root().display()))
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Convert {
            mappings,
            output,
            workers,
            archives,
        } => {
            let mut config = mappings.resolve_config()?;
            if let Some(dir) = output {
                config.output_dir = dir;
            }
            if workers.is_some() {
                config.workers = workers;
            }
            config.validate().context("invalid configuration")?;

            let set = load_mappings(&config)?;
            info!(
                version = %config.mappings.version,
                types = set.symbols.types().len(),
                "mapping tables ready"
            );
            let report = BatchConverter::new(&set, &config)
                .run(&archives)
                .with_context(|| format!("failed to prepare {}", config.output_dir.display()))?;
            print_report(&report);
            if !report.is_success() {
                bail!("{} of {} archive(s) failed", report.failures.len(), archives.len());
            }
            Ok(())
        }
        Commands::RemapString { mappings, value } => {
            let config = mappings.resolve_config()?;
            config.validate().context("invalid configuration")?;
            let set = load_mappings(&config)?;
            println!("{}", TextRemapper::new(&set).remap_string(&value));
            Ok(())
        }
    }
}

/// One line per converted archive, then one per failure.
pub fn render_report(report: &BatchReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(report.converted.len() + report.failures.len());
    for archive in &report.converted {
        let mut line = format!(
            "converted {} -> {} ({} classes, {} rewritten",
            archive.source.display(),
            archive.output.display(),
            archive.classes,
            archive.classes_changed
        );
        if archive.access_lines_dropped > 0 {
            line.push_str(&format!(
                ", {} access line(s) dropped",
                archive.access_lines_dropped
            ));
        }
        let unresolved = archive.unresolved_entrypoints();
        if unresolved > 0 {
            line.push_str(&format!(", {unresolved} unresolved entry point(s)"));
        }
        line.push(')');
        lines.push(line);
    }
    for failure in &report.failures {
        lines.push(format!("failed {}: {}", failure.archive.display(), failure.error));
    }
    lines
}

fn print_report(report: &BatchReport) {
    for line in render_report(report) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests;
