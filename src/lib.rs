pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod scanner;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{Config, ExecutableLookup};
pub use error::{AutoPsarcError, Result, UserFriendlyError};

// Core functionality re-exports
pub use extractor::{
    ArchiveExtractor, ArchiveOutcome, ArchiveResult, BatchReport, ExtractionLog, ExtractionPool,
    FailedArchive, PoolObserver, PsarcTool,
};
pub use scanner::{ArchiveFile, ArchiveScanner};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, PathPrompt, ProgressManager};

use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::time::Instant;
use ui::{prompt, ProgressAwareOutput};

/// Per-run switches that don't live in the persisted config.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub workers: usize,
    pub log_mode: bool,
    pub show_progress: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            workers: extractor::DEFAULT_WORKERS,
            log_mode: false,
            show_progress: true,
        }
    }
}

/// Main library interface for AutoPSARC functionality
pub struct AutoPsarc {
    config: Config,
    config_path: PathBuf,
    config_dirty: bool,
    settings: RunSettings,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl AutoPsarc {
    pub fn new(
        config: Config,
        config_path: PathBuf,
        settings: RunSettings,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
    ) -> Result<Self> {
        let shutdown = GracefulShutdown::new()?;
        Ok(Self::with_shutdown(
            config,
            config_path,
            settings,
            output_mode,
            verbose,
            quiet,
            shutdown,
        ))
    }

    /// Same as [`AutoPsarc::new`] without installing the Ctrl+C handler.
    pub fn new_for_test(
        config: Config,
        config_path: PathBuf,
        settings: RunSettings,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
    ) -> Self {
        Self::with_shutdown(
            config,
            config_path,
            settings,
            output_mode,
            verbose,
            quiet,
            GracefulShutdown::new_for_test(),
        )
    }

    fn with_shutdown(
        mut config: Config,
        config_path: PathBuf,
        settings: RunSettings,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
        shutdown: GracefulShutdown,
    ) -> Self {
        let config_dirty = config.ensure_progress_flag();
        let show_progress = settings.show_progress
            && config.progress_enabled()
            && !quiet
            && output_mode == OutputMode::Human;

        Self {
            config,
            config_path,
            config_dirty,
            settings: RunSettings {
                show_progress,
                ..settings
            },
            output_formatter: OutputFormatter::new(output_mode, verbose, quiet),
            progress_manager: ProgressManager::new(show_progress),
            shutdown,
        }
    }

    /// Create AutoPsarc instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let (config, config_path) = cli_args.load_config()?;
        let settings = RunSettings {
            workers: cli_args.workers,
            log_mode: cli_args.log,
            show_progress: !cli_args.no_progress,
        };

        Self::new(
            config,
            config_path,
            settings,
            cli_args.output_mode(),
            cli_args.verbose,
            cli_args.quiet,
        )
    }

    /// Handles `--psarc`: an empty value asks for the path interactively.
    pub fn set_executable_path(
        &mut self,
        raw: &str,
        path_prompt: &mut dyn PathPrompt,
    ) -> Result<PathBuf> {
        let cleaned = prompt::clean_path_input(raw);
        let path = if cleaned.is_empty() {
            prompt::prompt_for_executable(path_prompt, 1)?
        } else {
            PathBuf::from(cleaned)
        };

        self.config.set_executable(&path)?;
        self.config_dirty = true;
        self.persist_config()?;

        self.output_formatter
            .success(&format!("PSARC.exe path saved: {}", path.display()));
        Ok(path)
    }

    /// Finds the executable, falling back to asking the user when a prompt
    /// is available. Any newly found path is saved.
    pub fn ensure_executable(
        &mut self,
        path_prompt: Option<&mut dyn PathPrompt>,
    ) -> Result<PathBuf> {
        self.ensure_executable_in(path_prompt, None)
    }

    fn ensure_executable_in(
        &mut self,
        path_prompt: Option<&mut dyn PathPrompt>,
        bundled_dir: Option<&Path>,
    ) -> Result<PathBuf> {
        let lookup = match bundled_dir {
            Some(dir) => self.config.resolve_executable_in(Some(dir)),
            None => self.config.resolve_executable(),
        };

        match lookup {
            ExecutableLookup::Configured(path) => Ok(path),
            ExecutableLookup::Bundled(path) => {
                self.output_formatter
                    .info(&format!("Using bundled PSARC.exe: {}", path.display()));
                self.config_dirty = true;
                self.persist_config()?;
                Ok(path)
            }
            ExecutableLookup::Missing { rejected } => {
                let Some(path_prompt) = path_prompt else {
                    return Err(match (rejected, self.config.psarc_path.as_ref()) {
                        (Some(reason), Some(path)) => AutoPsarcError::InvalidExecutable {
                            path: path.display().to_string(),
                            reason,
                        },
                        _ => AutoPsarcError::ExecutableNotConfigured,
                    });
                };

                match rejected {
                    Some(reason) => self.output_formatter.warning(&reason),
                    None => self.output_formatter.warning("PSARC.exe path is not configured"),
                }

                let path = prompt::prompt_for_executable(
                    path_prompt,
                    prompt::DEFAULT_PROMPT_ATTEMPTS,
                )?;
                self.config.set_executable(&path)?;
                self.config_dirty = true;
                self.persist_config()?;
                self.output_formatter
                    .success(&format!("PSARC.exe path saved: {}", path.display()));
                Ok(path)
            }
        }
    }

    /// Discover archives under `input_dir` and extract them into `output_dir`.
    pub fn run_batch(
        &mut self,
        input_dir: &Path,
        output_dir: &Path,
        extractor: &dyn ArchiveExtractor,
    ) -> Result<BatchReport> {
        let start_time = Instant::now();
        self.shutdown.check_shutdown()?;

        let input_dir = input_dir
            .canonicalize()
            .map_err(|_| AutoPsarcError::InvalidPath {
                path: input_dir.display().to_string(),
            })?;
        std::fs::create_dir_all(output_dir)?;
        let output_dir = output_dir.canonicalize()?;

        self.persist_config()?;

        // Step 1: Discover archives
        let archives = self.scan_archives(&input_dir)?;
        self.shutdown.check_shutdown()?;

        if archives.is_empty() {
            return Err(AutoPsarcError::NoArchivesFound {
                path: input_dir.display().to_string(),
                extension: scanner::ARCHIVE_EXTENSION.to_string(),
            });
        }

        // Step 2: Drop archives already in the extraction log
        let discovered = archives.len();
        let log = if self.settings.log_mode {
            let log = ExtractionLog::open(&output_dir)?;
            self.output_formatter.debug(&format!(
                "Loaded {} entries from {}",
                log.len(),
                log.path().display()
            ));
            Some(log)
        } else {
            None
        };
        let (pending, skipped) = match log {
            Some(ref log) => log.partition(archives),
            None => (archives, Vec::new()),
        };

        for archive in &skipped {
            self.output_formatter.info(&format!(
                "Skipping already extracted: {}",
                archive.source_path.display()
            ));
        }

        let pool = ExtractionPool::new(self.settings.workers);
        let mut report = BatchReport::new(input_dir.clone(), output_dir.clone(), pool.workers())
            .with_skipped(discovered, &skipped)
            .with_log_file(log.as_ref().map(|l| l.path().to_path_buf()));

        if pending.is_empty() {
            self.output_formatter
                .info("All archives are already in the extraction log");
            report.finish(start_time.elapsed());
            return Ok(report);
        }

        // Step 3: Run the worker pool
        let results = self.extract_archives(&pending, &output_dir, extractor, log.as_ref(), &pool)?;
        report.record_results(&results);
        report.finish(start_time.elapsed());

        Ok(report)
    }

    fn scan_archives(&self, input_dir: &Path) -> Result<Vec<ArchiveFile>> {
        self.output_formatter.start_operation("Scanning for PSARC files");

        let spinner = self.progress_manager.create_spinner("Scanning...");
        let scanner = ArchiveScanner::new();
        let archives = scanner.scan_directory(input_dir);
        spinner.finish_and_clear();
        let archives = archives?;

        let stats = scanner.get_statistics(&archives);
        self.output_formatter.debug(&stats.display_summary());
        self.output_formatter
            .info(&format!("Found {} PSARC files", archives.len()));

        Ok(archives)
    }

    fn extract_archives(
        &self,
        archives: &[ArchiveFile],
        output_dir: &Path,
        extractor: &dyn ArchiveExtractor,
        log: Option<&ExtractionLog>,
        pool: &ExtractionPool,
    ) -> Result<Vec<ArchiveResult>> {
        self.output_formatter.start_operation(&format!(
            "Extracting {} PSARC files with {} workers",
            archives.len(),
            pool.workers()
        ));

        let progress_bar = self
            .progress_manager
            .create_archive_progress(archives.len() as u64);
        let observer = BatchObserver {
            output: ProgressAwareOutput::new(&self.output_formatter, Some(&self.progress_manager)),
            progress_bar: progress_bar.clone(),
        };

        let start = Instant::now();
        let results = pool.run(archives, output_dir, extractor, log, &self.shutdown, &observer)?;

        let extracted = results.iter().filter(|r| r.is_success()).count();
        ui::progress::finish_progress_with_summary(
            &progress_bar,
            &format!("Extracted {}/{} archives", extracted, archives.len()),
            start.elapsed(),
        );
        self.progress_manager.clear();

        Ok(results)
    }

    fn persist_config(&mut self) -> Result<()> {
        if self.config_dirty {
            self.config.save_to_file(&self.config_path)?;
            self.config_dirty = false;
        }
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &AutoPsarcError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Bridges pool events to the console and the progress bar.
struct BatchObserver<'a> {
    output: ProgressAwareOutput<'a>,
    progress_bar: ProgressBar,
}

impl PoolObserver for BatchObserver<'_> {
    fn started(&self, archive: &ArchiveFile, destination: &Path) {
        self.output.info(&format!(
            "Extracting: {} ({}) -> {}",
            archive.source_path.display(),
            archive.format_size(),
            destination.display()
        ));
    }

    fn finished(&self, result: &ArchiveResult) {
        ui::progress::update_archive_progress(&self.progress_bar, result);
        if let Some(failure) = FailedArchive::from_result(result) {
            self.output.archive_failure(&failure);
        }
    }
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::make_executable;
    use crate::extractor::ToolOutput;
    use crate::ui::prompt::tests::ScriptedPrompt;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Writes a marker into each destination instead of running a real tool.
    struct MarkerExtractor {
        calls: Mutex<Vec<PathBuf>>,
    }

    impl MarkerExtractor {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl ArchiveExtractor for MarkerExtractor {
        fn extract(&self, archive: &Path, destination: &Path) -> Result<ToolOutput> {
            self.calls.lock().unwrap().push(archive.to_path_buf());
            fs::write(destination.join("extracted.txt"), archive.display().to_string())?;
            Ok(ToolOutput::default())
        }
    }

    fn app(temp_dir: &TempDir, config: Config, settings: RunSettings) -> AutoPsarc {
        AutoPsarc::new_for_test(
            config,
            temp_dir.path().join("config.json"),
            settings,
            OutputMode::Plain,
            0,
            true,
        )
    }

    fn write_tree(root: &Path, files: &[&str]) {
        for file in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "psarc").unwrap();
        }
    }

    #[test]
    fn test_run_batch_mirrors_tree() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in");
        let output = temp_dir.path().join("out");
        write_tree(&input, &["a.psarc", "dlc/b.psarc", "dlc/deep/c.psarc", "notes.txt"]);

        let mut autopsarc = app(&temp_dir, Config::default(), RunSettings::default());
        let extractor = MarkerExtractor::new();
        let report = autopsarc.run_batch(&input, &output, &extractor).unwrap();

        assert_eq!(report.discovered, 3);
        assert_eq!(report.extracted, 3);
        assert!(!report.has_failures());
        assert!(output.join("a/extracted.txt").exists());
        assert!(output.join("dlc/b/extracted.txt").exists());
        assert!(output.join("dlc/deep/c/extracted.txt").exists());
        assert!(!output.join(extractor::LOG_FILE_NAME).exists());
    }

    #[test]
    fn test_log_mode_skips_previous_extractions() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in");
        let output = temp_dir.path().join("out");
        write_tree(&input, &["a.psarc", "dlc/b.psarc"]);

        let settings = RunSettings {
            log_mode: true,
            ..RunSettings::default()
        };

        let first = MarkerExtractor::new();
        let report = app(&temp_dir, Config::default(), settings.clone())
            .run_batch(&input, &output, &first)
            .unwrap();
        assert_eq!(report.extracted, 2);
        assert_eq!(first.call_count(), 2);

        let second = MarkerExtractor::new();
        let report = app(&temp_dir, Config::default(), settings.clone())
            .run_batch(&input, &output, &second)
            .unwrap();
        assert_eq!(report.skipped, 2);
        assert_eq!(report.extracted, 0);
        assert_eq!(second.call_count(), 0);

        // A new archive is the only one processed on the next run.
        write_tree(&input, &["dlc/new.psarc"]);
        let third = MarkerExtractor::new();
        let report = app(&temp_dir, Config::default(), settings)
            .run_batch(&input, &output, &third)
            .unwrap();
        assert_eq!(report.skipped, 2);
        assert_eq!(report.extracted, 1);
        assert_eq!(third.call_count(), 1);
        assert!(third.calls.lock().unwrap()[0].ends_with("dlc/new.psarc"));
    }

    #[test]
    fn test_empty_input_reports_no_archives() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in");
        write_tree(&input, &["readme.txt"]);

        let err = app(&temp_dir, Config::default(), RunSettings::default())
            .run_batch(&input, &temp_dir.path().join("out"), &MarkerExtractor::new())
            .unwrap_err();
        assert!(matches!(err, AutoPsarcError::NoArchivesFound { .. }));
    }

    #[test]
    fn test_missing_input_is_invalid_path() {
        let temp_dir = TempDir::new().unwrap();
        let err = app(&temp_dir, Config::default(), RunSettings::default())
            .run_batch(
                &temp_dir.path().join("missing"),
                &temp_dir.path().join("out"),
                &MarkerExtractor::new(),
            )
            .unwrap_err();
        assert!(matches!(err, AutoPsarcError::InvalidPath { .. }));
    }

    #[test]
    fn test_progress_flag_is_persisted_on_first_run() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in");
        write_tree(&input, &["a.psarc"]);

        let mut autopsarc = app(&temp_dir, Config::default(), RunSettings::default());
        autopsarc
            .run_batch(&input, &temp_dir.path().join("out"), &MarkerExtractor::new())
            .unwrap();

        let saved = Config::load_from_file(autopsarc.config_path()).unwrap();
        assert_eq!(saved.progress_enabled, Some(true));
    }

    #[test]
    fn test_quiet_or_disabled_flag_hides_progress() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            psarc_path: None,
            progress_enabled: Some(false),
        };
        let autopsarc = AutoPsarc::new_for_test(
            config,
            temp_dir.path().join("config.json"),
            RunSettings::default(),
            OutputMode::Human,
            0,
            false,
        );
        assert!(!autopsarc.settings().show_progress);
    }

    #[test]
    fn test_invalid_configured_path_triggers_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let exe = temp_dir.path().join("PSARC.exe");
        make_executable(&exe);

        let config = Config {
            psarc_path: Some(temp_dir.path().join("moved/PSARC.exe")),
            progress_enabled: Some(false),
        };
        let mut autopsarc = app(&temp_dir, config, RunSettings::default());
        let mut prompt = ScriptedPrompt::new(&[exe.to_str().unwrap()]);

        let resolved = autopsarc
            .ensure_executable_in(Some(&mut prompt), Some(&temp_dir.path().join("empty")))
            .unwrap();
        assert_eq!(resolved, exe);
        assert_eq!(prompt.asked, 1);

        let saved = Config::load_from_file(autopsarc.config_path()).unwrap();
        assert_eq!(saved.psarc_path, Some(exe));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_configured_path_triggers_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let plain_file = temp_dir.path().join("PSARC.txt");
        fs::write(&plain_file, "not a program").unwrap();
        let exe = temp_dir.path().join("PSARC.exe");
        make_executable(&exe);

        let config = Config {
            psarc_path: Some(plain_file),
            progress_enabled: Some(false),
        };
        let mut autopsarc = app(&temp_dir, config, RunSettings::default());
        let mut prompt = ScriptedPrompt::new(&[exe.to_str().unwrap()]);

        let resolved = autopsarc
            .ensure_executable_in(Some(&mut prompt), Some(&temp_dir.path().join("empty")))
            .unwrap();
        assert_eq!(resolved, exe);
    }

    #[test]
    fn test_missing_executable_without_prompt_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut autopsarc = app(&temp_dir, Config::default(), RunSettings::default());

        let err = autopsarc
            .ensure_executable_in(None, Some(&temp_dir.path().join("empty")))
            .unwrap_err();
        assert!(matches!(err, AutoPsarcError::ExecutableNotConfigured));

        let config = Config {
            psarc_path: Some(temp_dir.path().join("gone.exe")),
            progress_enabled: None,
        };
        let mut autopsarc = app(&temp_dir, config, RunSettings::default());
        let err = autopsarc
            .ensure_executable_in(None, Some(&temp_dir.path().join("empty")))
            .unwrap_err();
        assert!(matches!(err, AutoPsarcError::InvalidExecutable { .. }));
    }

    #[test]
    fn test_set_executable_path_saves_config() {
        let temp_dir = TempDir::new().unwrap();
        let exe = temp_dir.path().join("PSARC.exe");
        make_executable(&exe);

        let mut autopsarc = app(&temp_dir, Config::default(), RunSettings::default());
        let mut prompt = ScriptedPrompt::new(&[]);
        let quoted = format!("\"{}\"", exe.display());

        let saved = autopsarc.set_executable_path(&quoted, &mut prompt).unwrap();
        assert_eq!(saved, exe);
        assert_eq!(prompt.asked, 0);

        let on_disk = Config::load_from_file(autopsarc.config_path()).unwrap();
        assert_eq!(on_disk.psarc_path, Some(exe));
    }

    #[test]
    fn test_set_invalid_executable_path_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut autopsarc = app(&temp_dir, Config::default(), RunSettings::default());
        let mut prompt = ScriptedPrompt::new(&[]);

        let err = autopsarc
            .set_executable_path("/no/such/PSARC.exe", &mut prompt)
            .unwrap_err();
        assert!(matches!(err, AutoPsarcError::InvalidExecutable { .. }));
        assert!(!autopsarc.config_path().exists());
    }

    #[test]
    fn test_shutdown_handling() {
        let temp_dir = TempDir::new().unwrap();
        let autopsarc = app(&temp_dir, Config::default(), RunSettings::default());

        assert!(autopsarc.is_running());
        autopsarc.request_shutdown();
        assert!(!autopsarc.is_running());
    }

    #[test]
    fn test_version_info() {
        assert!(!version_info().is_empty());
    }
}
