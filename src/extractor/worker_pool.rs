use crate::error::{AutoPsarcError, Result};
use crate::extractor::extraction_log::ExtractionLog;
use crate::extractor::psarc_tool::ArchiveExtractor;
use crate::scanner::ArchiveFile;
use crate::ui::GracefulShutdown;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveOutcome {
    Extracted,
    Failed {
        error: String,
        stdout: String,
        stderr: String,
    },
    /// Not started because shutdown was requested first.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ArchiveResult {
    pub archive: ArchiveFile,
    pub destination: PathBuf,
    pub outcome: ArchiveOutcome,
    pub duration: Duration,
}

impl ArchiveResult {
    pub fn is_success(&self) -> bool {
        self.outcome == ArchiveOutcome::Extracted
    }
}

/// Hooks invoked from worker threads as archives move through the pool.
pub trait PoolObserver: Sync {
    fn started(&self, _archive: &ArchiveFile, _destination: &Path) {}
    fn finished(&self, _result: &ArchiveResult) {}
}

/// Observer that ignores every event.
pub struct SilentObserver;

impl PoolObserver for SilentObserver {}

/// Fixed-size pool running one extractor invocation per archive.
pub struct ExtractionPool {
    workers: usize,
}

impl ExtractionPool {
    /// `0` sizes the pool to the number of logical CPUs.
    pub fn new(workers: usize) -> Self {
        let workers = if workers == 0 { num_cpus::get() } else { workers };
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Extracts every archive, never running more than `workers` at once.
    /// Results come back in input order.
    pub fn run<E>(
        &self,
        archives: &[ArchiveFile],
        output_root: &Path,
        extractor: &E,
        log: Option<&ExtractionLog>,
        shutdown: &GracefulShutdown,
        observer: &dyn PoolObserver,
    ) -> Result<Vec<ArchiveResult>>
    where
        E: ArchiveExtractor + ?Sized,
    {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|index| format!("psarc-worker-{}", index))
            .build()?;

        tracing::info!(
            archives = archives.len(),
            workers = self.workers,
            "starting extraction pool"
        );

        let results = pool.install(|| {
            archives
                .par_iter()
                .map(|archive| {
                    let result = process_archive(archive, output_root, extractor, log, shutdown, observer);
                    observer.finished(&result);
                    result
                })
                .collect()
        });

        Ok(results)
    }
}

impl Default for ExtractionPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

fn process_archive<E>(
    archive: &ArchiveFile,
    output_root: &Path,
    extractor: &E,
    log: Option<&ExtractionLog>,
    shutdown: &GracefulShutdown,
    observer: &dyn PoolObserver,
) -> ArchiveResult
where
    E: ArchiveExtractor + ?Sized,
{
    let destination = archive.output_dir(output_root);
    let start = Instant::now();

    let outcome = if !shutdown.is_running() {
        ArchiveOutcome::Cancelled
    } else {
        observer.started(archive, &destination);
        match extract_one(archive, &destination, extractor) {
            Ok(()) => {
                if let Some(log) = log {
                    if let Err(e) = log.record(archive) {
                        tracing::warn!(
                            archive = %archive.display_path(),
                            error = %e,
                            "failed to append to extraction log"
                        );
                    }
                }
                ArchiveOutcome::Extracted
            }
            Err(AutoPsarcError::ToolFailed {
                status_code,
                stdout,
                stderr,
                ..
            }) => ArchiveOutcome::Failed {
                error: match status_code {
                    Some(code) => format!("PSARC tool exited with code {}", code),
                    None => "PSARC tool was terminated by a signal".to_string(),
                },
                stdout,
                stderr,
            },
            Err(e) => ArchiveOutcome::Failed {
                error: e.to_string(),
                stdout: String::new(),
                stderr: String::new(),
            },
        }
    };

    let duration = start.elapsed();
    tracing::debug!(
        archive = %archive.display_path(),
        outcome = ?outcome,
        elapsed_ms = duration.as_millis() as u64,
        "archive finished"
    );

    ArchiveResult {
        archive: archive.clone(),
        destination,
        outcome,
        duration,
    }
}

fn extract_one<E>(archive: &ArchiveFile, destination: &Path, extractor: &E) -> Result<()>
where
    E: ArchiveExtractor + ?Sized,
{
    fs::create_dir_all(destination)?;
    extractor.extract(&archive.source_path, destination)?;
    Ok(())
}
