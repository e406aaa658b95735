use crate::error::{AutoPsarcError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Captured result of a successful tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub status_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Something that can unpack one archive into a destination directory.
pub trait ArchiveExtractor: Send + Sync {
    fn extract(&self, archive: &Path, destination: &Path) -> Result<ToolOutput>;
}

/// The external PSARC tool, run once per archive as
/// `<exe> extract --input=<archive> --to=<destination> -y`.
#[derive(Debug, Clone)]
pub struct PsarcTool {
    executable: PathBuf,
}

impl PsarcTool {
    pub fn new<P: Into<PathBuf>>(executable: P) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn command(&self, archive: &Path, destination: &Path) -> Command {
        let mut input_arg = std::ffi::OsString::from("--input=");
        input_arg.push(archive);
        let mut to_arg = std::ffi::OsString::from("--to=");
        to_arg.push(destination);

        let mut cmd = Command::new(&self.executable);
        cmd.arg("extract")
            .arg(input_arg)
            .arg(to_arg)
            .arg("-y")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Keep the tool out of our process group so a terminal Ctrl+C only
        // reaches us and in-flight archives can finish.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
        }

        cmd
    }
}

impl ArchiveExtractor for PsarcTool {
    fn extract(&self, archive: &Path, destination: &Path) -> Result<ToolOutput> {
        let mut cmd = self.command(archive, destination);
        tracing::debug!(command = ?cmd, "running PSARC tool");

        let output = cmd.output()?;
        let result = ToolOutput {
            status_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if output.status.success() {
            Ok(result)
        } else {
            Err(AutoPsarcError::ToolFailed {
                archive: archive.display().to_string(),
                status_code: result.status_code,
                stdout: result.stdout,
                stderr: result.stderr,
            })
        }
    }
}
