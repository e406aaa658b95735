use crate::extractor::worker_pool::{ArchiveOutcome, ArchiveResult};
use crate::scanner::ArchiveFile;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct FailedArchive {
    pub path: String,
    pub error: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

impl FailedArchive {
    pub fn from_result(result: &ArchiveResult) -> Option<Self> {
        match &result.outcome {
            ArchiveOutcome::Failed {
                error,
                stdout,
                stderr,
            } => Some(Self {
                path: result.archive.source_path.display().to_string(),
                error: error.clone(),
                stdout: stdout.clone(),
                stderr: stderr.clone(),
            }),
            _ => None,
        }
    }
}

/// Outcome of one batch run, printed as the final summary.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub discovered: usize,
    pub skipped: usize,
    pub extracted: usize,
    pub failed: Vec<FailedArchive>,
    pub cancelled: usize,
    pub workers: usize,
    pub log_file: Option<PathBuf>,
    pub duration_ms: u128,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn new(input_dir: PathBuf, output_dir: PathBuf, workers: usize) -> Self {
        Self {
            input_dir,
            output_dir,
            discovered: 0,
            skipped: 0,
            extracted: 0,
            failed: Vec::new(),
            cancelled: 0,
            workers,
            log_file: None,
            duration_ms: 0,
            finished_at: Utc::now(),
        }
    }

    pub fn with_skipped(mut self, discovered: usize, skipped: &[ArchiveFile]) -> Self {
        self.discovered = discovered;
        self.skipped = skipped.len();
        self
    }

    pub fn with_log_file(mut self, log_file: Option<PathBuf>) -> Self {
        self.log_file = log_file;
        self
    }

    pub fn record_results(&mut self, results: &[ArchiveResult]) {
        for result in results {
            match result.outcome {
                ArchiveOutcome::Extracted => self.extracted += 1,
                ArchiveOutcome::Cancelled => self.cancelled += 1,
                ArchiveOutcome::Failed { .. } => {
                    self.failed.extend(FailedArchive::from_result(result))
                }
            }
        }
    }

    pub fn finish(&mut self, elapsed: Duration) {
        self.duration_ms = elapsed.as_millis();
        self.finished_at = Utc::now();
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms as u64)
    }

    pub fn attempted(&self) -> usize {
        self.discovered - self.skipped
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled > 0
    }
}
