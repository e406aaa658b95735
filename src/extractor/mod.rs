pub mod extraction_log;
pub mod psarc_tool;
pub mod report;
pub mod worker_pool;

pub use extraction_log::{ExtractionLog, LOG_FILE_NAME};
pub use psarc_tool::{ArchiveExtractor, PsarcTool, ToolOutput};
pub use report::{BatchReport, FailedArchive};
pub use worker_pool::{
    ArchiveOutcome, ArchiveResult, ExtractionPool, PoolObserver, SilentObserver, DEFAULT_WORKERS,
};
