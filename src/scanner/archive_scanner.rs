use crate::error::{AutoPsarcError, Result};
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

pub const ARCHIVE_EXTENSION: &str = "psarc";

#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveFile {
    pub source_path: PathBuf,
    pub relative_path: PathBuf,
    pub filename: String,
    pub size: u64,
}

impl ArchiveFile {
    pub fn new(source_path: PathBuf, relative_path: PathBuf, size: u64) -> Self {
        let filename = source_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();

        Self {
            source_path,
            relative_path,
            filename,
            size,
        }
    }

    /// Destination directory for this archive: the relative path under
    /// `output_root`, minus the archive extension.
    pub fn output_dir(&self, output_root: &Path) -> PathBuf {
        output_root.join(self.relative_path.with_extension(""))
    }

    /// Key written to the extraction log. Uses the canonical path when the
    /// file still resolves, so reruns with a different cwd match.
    pub fn log_key(&self) -> String {
        self.source_path
            .canonicalize()
            .unwrap_or_else(|_| self.source_path.clone())
            .display()
            .to_string()
    }

    pub fn display_path(&self) -> String {
        self.relative_path.display().to_string()
    }

    pub fn format_size(&self) -> String {
        format_bytes(self.size)
    }
}

pub struct ArchiveScanner {
    extension: String,
}

impl ArchiveScanner {
    pub fn new() -> Self {
        Self::with_extension(ARCHIVE_EXTENSION)
    }

    pub fn with_extension<S: Into<String>>(extension: S) -> Self {
        Self {
            extension: extension.into().trim_start_matches('.').to_lowercase(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }

    pub fn scan_directory<P: AsRef<Path>>(&self, root: P) -> Result<Vec<ArchiveFile>> {
        let root_path = root.as_ref();

        if !root_path.exists() {
            return Err(AutoPsarcError::InvalidPath {
                path: root_path.display().to_string(),
            });
        }

        if !root_path.is_dir() {
            return Err(AutoPsarcError::InvalidPath {
                path: format!("{} is not a directory", root_path.display()),
            });
        }

        let mut archives = Vec::new();
        let mut scan_errors = Vec::new();

        let walker = WalkDir::new(root_path).follow_links(false).into_iter();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable entry");
                    scan_errors.push(err.to_string());
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.matches(entry.path()) {
                continue;
            }

            match self.process_file(&entry, root_path) {
                Ok(archive) => archives.push(archive),
                Err(err) => {
                    tracing::warn!(path = %entry.path().display(), error = %err, "skipping archive");
                    scan_errors.push(format!("{}: {}", entry.path().display(), err));
                }
            }
        }

        if !scan_errors.is_empty() && archives.is_empty() {
            return Err(AutoPsarcError::InvalidPath {
                path: format!("Scan errors: {}", scan_errors.join(", ")),
            });
        }

        archives.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        tracing::debug!(
            root = %root_path.display(),
            found = archives.len(),
            "archive scan finished"
        );

        Ok(archives)
    }

    fn process_file(&self, entry: &DirEntry, root_path: &Path) -> Result<ArchiveFile> {
        let path = entry.path();
        let metadata = entry
            .metadata()
            .map_err(|e| AutoPsarcError::Io(e.into()))?;
        let relative_path = relative_to(path, root_path)?;

        Ok(ArchiveFile::new(
            path.to_path_buf(),
            relative_path,
            metadata.len(),
        ))
    }

    pub fn get_statistics(&self, archives: &[ArchiveFile]) -> ScanStatistics {
        let (largest_file_size, largest_file_path) = archives
            .iter()
            .max_by_key(|a| a.size)
            .map(|a| (a.size, a.relative_path.clone()))
            .unwrap_or((0, PathBuf::new()));

        ScanStatistics {
            total_files: archives.len(),
            total_size: archives.iter().map(|a| a.size).sum(),
            largest_file_size,
            largest_file_path,
        }
    }
}

impl Default for ArchiveScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn relative_to(file_path: &Path, root_path: &Path) -> Result<PathBuf> {
    let relative = file_path
        .strip_prefix(root_path)
        .map_err(|_| AutoPsarcError::InvalidPath {
            path: format!(
                "Cannot calculate relative path for {} from root {}",
                file_path.display(),
                root_path.display()
            ),
        })?;

    if relative
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(AutoPsarcError::InvalidPath {
            path: format!(
                "Path contains parent directory references: {}",
                relative.display()
            ),
        });
    }

    Ok(relative.to_path_buf())
}

#[derive(Debug, Default)]
pub struct ScanStatistics {
    pub total_files: usize,
    pub total_size: u64,
    pub largest_file_size: u64,
    pub largest_file_path: PathBuf,
}

impl ScanStatistics {
    pub fn display_summary(&self) -> String {
        let mut summary = format!(
            "Scan Results:\n  Archives: {}\n  Total size: {}\n",
            self.total_files,
            format_bytes(self.total_size)
        );

        if self.largest_file_size > 0 {
            summary.push_str(&format!(
                "  Largest archive: {} ({})\n",
                self.largest_file_path.display(),
                format_bytes(self.largest_file_size)
            ));
        }

        summary
    }
}

pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
