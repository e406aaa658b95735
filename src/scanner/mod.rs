pub mod archive_scanner;

pub use archive_scanner::{ArchiveFile, ArchiveScanner, ScanStatistics, ARCHIVE_EXTENSION};
