use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutoPsarcError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("PSARC executable is not configured")]
    ExecutableNotConfigured,

    #[error("Invalid PSARC executable: {path} ({reason})")]
    InvalidExecutable { path: String, reason: String },

    #[error("PSARC tool failed on {archive}")]
    ToolFailed {
        archive: String,
        status_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("No {extension} files found in {path}")]
    NoArchivesFound { path: String, extension: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Worker pool error: {message}")]
    WorkerPool { message: String },

    #[error("Operation was cancelled by user")]
    Cancelled,
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for AutoPsarcError {
    fn user_message(&self) -> String {
        match self {
            AutoPsarcError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            AutoPsarcError::ExecutableNotConfigured => {
                "PSARC.exe not found".to_string()
            }
            AutoPsarcError::InvalidExecutable { path, reason } => {
                format!("Provided PSARC.exe path is invalid: {} ({})", path, reason)
            }
            AutoPsarcError::ToolFailed {
                archive,
                status_code,
                ..
            } => match status_code {
                Some(code) => format!("Error extracting {} (exit code {})", archive, code),
                None => format!("Error extracting {} (terminated by signal)", archive),
            },
            AutoPsarcError::NoArchivesFound { path, extension } => {
                format!("No .{} files found under {}", extension, path)
            }
            AutoPsarcError::InvalidPath { path } => {
                format!("Invalid path: {}", path)
            }
            AutoPsarcError::Cancelled => "Operation was cancelled by user".to_string(),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            AutoPsarcError::ExecutableNotConfigured | AutoPsarcError::InvalidExecutable { .. } => {
                Some("Run with --psarc to set the path to PSARC.exe.".to_string())
            }
            AutoPsarcError::Config { .. } => Some(
                "Check the JSON syntax of the configuration file, or delete it to start over."
                    .to_string(),
            ),
            AutoPsarcError::NoArchivesFound { .. } => Some(
                "Check that --input points at the directory holding your archives.".to_string(),
            ),
            AutoPsarcError::InvalidPath { .. } => {
                Some("Ensure the directory exists and is readable.".to_string())
            }
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AutoPsarcError {
    fn from(error: serde_json::Error) -> Self {
        AutoPsarcError::Config {
            message: error.to_string(),
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for AutoPsarcError {
    fn from(error: rayon::ThreadPoolBuildError) -> Self {
        AutoPsarcError::WorkerPool {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AutoPsarcError>;
