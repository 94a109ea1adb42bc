//! Batch orchestration.
//!
//! The output directory is cleared and re-created, every archive is indexed
//! into one type graph, and only then are archives transformed on a worker
//! pool. Failures are collected per archive.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::job::ArchiveJob;
use crate::metadata::AdapterRegistry;
use crate::transformer::{ArchiveReport, ArchiveTransformer};
use jarshift_bytecode::TypeGraph;
use jarshift_mappings::MappingSet;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct ArchiveFailure {
    pub archive: PathBuf,
    pub error: ConvertError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub converted: Vec<ArchiveReport>,
    pub failures: Vec<ArchiveFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Converts a set of archives with one mapping set.
pub struct BatchConverter<'a> {
    mappings: &'a MappingSet,
    config: &'a ConversionConfig,
    adapters: AdapterRegistry,
}

impl<'a> BatchConverter<'a> {
    pub fn new(mappings: &'a MappingSet, config: &'a ConversionConfig) -> Self {
        Self {
            mappings,
            config,
            adapters: AdapterRegistry::default(),
        }
    }

    pub fn with_adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = adapters;
        self
    }

    /// Convert `archives` into the configured output directory.
    ///
    /// Returns `Err` only when the batch cannot start at all; per-archive
    /// problems are reported in [`BatchReport::failures`].
    pub fn run(&self, archives: &[PathBuf]) -> Result<BatchReport, ConvertError> {
        let output_dir = self.config.output_dir.as_path();
        reset_output_dir(output_dir)?;

        let mut report = BatchReport::default();
        let mut jobs = Vec::with_capacity(archives.len());
        for path in archives {
            match ArchiveJob::from_archive(path) {
                Ok(job) => jobs.push(job),
                Err(error) => {
                    warn!(archive = %path.display(), error = %error, "skipping archive");
                    report.failures.push(ArchiveFailure {
                        archive: path.clone(),
                        error,
                    });
                }
            }
        }

        let mut graph = TypeGraph::new();
        jobs.retain(|job| match graph.index_archive(&job.path) {
            Ok(_) => true,
            Err(error) => {
                warn!(archive = %job.path.display(), error = %error, "failed to index archive");
                report.failures.push(ArchiveFailure {
                    archive: job.path.clone(),
                    error: error.into(),
                });
                false
            }
        });
        info!(types = graph.len(), archives = jobs.len(), "type graph ready");

        let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
        let mut planned = Vec::with_capacity(jobs.len());
        for job in jobs {
            let output = output_dir.join(job.output_name());
            if let Some(first) = claimed.get(&output) {
                debug!(archive = %job.path.display(), first = %first.display(), "duplicate output name");
                report.failures.push(ArchiveFailure {
                    archive: job.path.clone(),
                    error: ConvertError::DuplicateOutput {
                        archive: job.path.clone(),
                        output,
                    },
                });
                continue;
            }
            claimed.insert(output.clone(), job.path.clone());
            planned.push((job, output));
        }

        let transformer = ArchiveTransformer::new(self.mappings, &graph, self.config, &self.adapters);
        let mut builder = ThreadPoolBuilder::new();
        if let Some(workers) = self.config.workers {
            builder = builder.num_threads(workers);
        }
        let pool = builder
            .build()
            .map_err(|err| ConvertError::WorkerPool(err.to_string()))?;

        let results: Vec<_> = pool.install(|| {
            planned
                .par_iter()
                .map(|(job, output)| (job.path.clone(), transformer.transform(job, output)))
                .collect()
        });

        for (archive, result) in results {
            match result {
                Ok(converted) => report.converted.push(converted),
                Err(error) => {
                    warn!(archive = %archive.display(), error = %error, "archive conversion failed");
                    report.failures.push(ArchiveFailure { archive, error });
                }
            }
        }

        info!(
            converted = report.converted.len(),
            failed = report.failures.len(),
            "batch finished"
        );
        Ok(report)
    }
}

fn reset_output_dir(dir: &Path) -> Result<(), ConvertError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => debug!(dir = %dir.display(), "cleared output directory"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConvertError::io(dir, err)),
    }
    fs::create_dir_all(dir).map_err(|err| ConvertError::io(dir, err))
}
