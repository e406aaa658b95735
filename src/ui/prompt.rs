use crate::config::validate_executable;
use crate::error::{AutoPsarcError, Result};
use console::Term;
use std::io::IsTerminal;
use std::path::PathBuf;

pub const DEFAULT_PROMPT_ATTEMPTS: usize = 3;

/// Source of answers for interactive path questions.
pub trait PathPrompt {
    /// `Ok(None)` means the user has nothing more to give (EOF).
    fn ask_path(&mut self, message: &str) -> Result<Option<String>>;

    /// Shown after an answer is rejected.
    fn report_invalid(&mut self, _reason: &str) {}
}

pub struct TerminalPrompt {
    term: Term,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    /// Prompting only makes sense with a person on the other end.
    pub fn is_interactive() -> bool {
        console::user_attended_stderr() && std::io::stdin().is_terminal()
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl PathPrompt for TerminalPrompt {
    fn ask_path(&mut self, message: &str) -> Result<Option<String>> {
        self.term.write_str(message)?;
        match self.term.read_line() {
            Ok(line) => Ok(Some(line)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn report_invalid(&mut self, reason: &str) {
        let _ = self.term.write_line(&format!("✗ {}", reason));
    }
}

/// Strips whitespace and one pair of surrounding quotes, as left behind by
/// "copy as path" on Windows.
pub fn clean_path_input(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

/// Keeps asking until a valid executable is given. An empty answer or EOF
/// gives up with `ExecutableNotConfigured`.
pub fn prompt_for_executable(
    prompt: &mut dyn PathPrompt,
    max_attempts: usize,
) -> Result<PathBuf> {
    let mut last_error = AutoPsarcError::ExecutableNotConfigured;

    for _ in 0..max_attempts.max(1) {
        let answer = match prompt.ask_path("Enter full path to PSARC.exe: ")? {
            Some(answer) => clean_path_input(&answer),
            None => return Err(AutoPsarcError::ExecutableNotConfigured),
        };

        if answer.is_empty() {
            return Err(AutoPsarcError::ExecutableNotConfigured);
        }

        let candidate = PathBuf::from(&answer);
        match validate_executable(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) => {
                tracing::debug!(path = %answer, error = %e, "prompted path rejected");
                prompt.report_invalid(&e.to_string());
                last_error = e;
            }
        }
    }

    Err(last_error)
}
