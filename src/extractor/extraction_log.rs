use crate::error::Result;
use crate::scanner::ArchiveFile;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const LOG_FILE_NAME: &str = "extraction.log";

/// Line-delimited record of archives that were extracted successfully.
/// Entries loaded at open time are read-only; new entries are appended to
/// disk as workers finish.
pub struct ExtractionLog {
    path: PathBuf,
    entries: HashSet<String>,
    writer: Mutex<()>,
}

impl ExtractionLog {
    pub fn open(output_root: &Path) -> Result<Self> {
        fs::create_dir_all(output_root)?;
        let path = output_root.join(LOG_FILE_NAME);

        let entries = if path.exists() {
            fs::read_to_string(&path)?
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            OpenOptions::new().create(true).append(true).open(&path)?;
            HashSet::new()
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "opened extraction log");

        Ok(Self {
            path,
            entries,
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, archive: &ArchiveFile) -> bool {
        self.entries.contains(&archive.log_key())
    }

    /// Splits the work list into `(pending, already_extracted)`.
    pub fn partition(&self, archives: Vec<ArchiveFile>) -> (Vec<ArchiveFile>, Vec<ArchiveFile>) {
        archives.into_iter().partition(|a| !self.contains(a))
    }

    pub fn record(&self, archive: &ArchiveFile) -> Result<()> {
        let line = format!("{}\n", archive.log_key());

        // A poisoned lock only means another worker panicked mid-append.
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
