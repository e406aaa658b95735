use crate::error::{AutoPsarcError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = ".autopsarc_config.json";
pub const BUNDLED_EXECUTABLE: &str = "PSARC.exe";

/// Persisted settings, stored as JSON in the user's home directory.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psarc_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_enabled: Option<bool>,
}

/// Where the executable came from after [`Config::resolve_executable`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutableLookup {
    Configured(PathBuf),
    /// Found next to our own binary and adopted into the config.
    Bundled(PathBuf),
    /// Nothing usable; carries the rejection message for a configured path.
    Missing { rejected: Option<String> },
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| AutoPsarcError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(CONFIG_FILE_NAME))
    }

    /// A missing file is not an error; it yields the default config.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| AutoPsarcError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config =
            serde_json::from_str(&content).map_err(|e| AutoPsarcError::Config {
                message: format!("Failed to parse config file {}: {}", path.display(), e),
            })?;

        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self).map_err(|e| AutoPsarcError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| AutoPsarcError::Config {
                    message: format!(
                        "Failed to create config directory {}: {}",
                        parent.display(),
                        e
                    ),
                })?;
            }
        }

        std::fs::write(path, content).map_err(|e| AutoPsarcError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        tracing::debug!(path = %path.display(), "saved config");
        Ok(())
    }

    /// Looks for a usable executable: the configured path first, then a
    /// `PSARC.exe` shipped next to the running binary.
    pub fn resolve_executable(&mut self) -> ExecutableLookup {
        let bundled_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        self.resolve_executable_in(bundled_dir.as_deref())
    }

    pub fn resolve_executable_in(&mut self, bundled_dir: Option<&Path>) -> ExecutableLookup {
        let mut rejected = None;

        if let Some(ref path) = self.psarc_path {
            match validate_executable(path) {
                Ok(()) => return ExecutableLookup::Configured(path.clone()),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "configured executable rejected");
                    rejected = Some(e.to_string());
                }
            }
        }

        if let Some(dir) = bundled_dir {
            let bundled = dir.join(BUNDLED_EXECUTABLE);
            if validate_executable(&bundled).is_ok() {
                self.psarc_path = Some(bundled.clone());
                return ExecutableLookup::Bundled(bundled);
            }
        }

        ExecutableLookup::Missing { rejected }
    }

    pub fn set_executable<P: Into<PathBuf>>(&mut self, path: P) -> Result<()> {
        let path = path.into();
        validate_executable(&path)?;
        self.psarc_path = Some(path);
        Ok(())
    }

    /// Returns true when the flag was unset and has just been defaulted.
    pub fn ensure_progress_flag(&mut self) -> bool {
        if self.progress_enabled.is_none() {
            self.progress_enabled = Some(true);
            return true;
        }
        false
    }

    pub fn progress_enabled(&self) -> bool {
        self.progress_enabled.unwrap_or(true)
    }
}

pub fn validate_executable(path: &Path) -> Result<()> {
    let invalid = |reason: &str| AutoPsarcError::InvalidExecutable {
        path: path.display().to_string(),
        reason: reason.to_string(),
    };

    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(invalid("file does not exist"))
        }
        Err(e) => return Err(invalid(&e.to_string())),
    };

    if !metadata.is_file() {
        return Err(invalid("not a regular file"));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(invalid("file is not executable"));
        }
    }

    Ok(())
}
