use crate::config::Config;
use crate::error::Result;
use crate::extractor::DEFAULT_WORKERS;
use crate::ui::OutputMode;
use clap::{CommandFactory, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "autopsarc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Batch-extract PSARC archives with PSARC.exe")]
#[command(
    long_about = "AutoPSARC scans a directory tree for .psarc archives and runs PSARC.exe on \
                  each one in parallel, mirroring the input layout under the output directory."
)]
#[command(after_long_help = "EXAMPLES:\n  \
    autopsarc --psarc \"C:\\Tools\\PSARC.exe\"\n  \
    autopsarc -i ./archives -o ./extracted\n  \
    autopsarc -i ./archives -o ./extracted -v -l --workers 6\n  \
    autopsarc -i ./dlc -o ./dlc_out --workers 0 --output-format json\n\n\
    Log mode (-l) keeps <output>/extraction.log and skips archives listed there on later runs.\n\
    The PSARC.exe path is stored in ~/.autopsarc_config.json.")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Directory to search for PSARC files
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Directory to extract files to
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable log mode to skip previously extracted files
    #[arg(short, long)]
    pub log: bool,

    /// Number of parallel extraction workers (0 = one per CPU)
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Set the path to PSARC.exe; prompts when no path is given. Must be run standalone
    #[arg(
        short,
        long,
        value_name = "PATH",
        num_args = 0..=1,
        default_missing_value = "",
        conflicts_with_all = ["input", "output", "log"]
    )]
    pub psarc: Option<String>,

    /// Disable the progress bar for this run
    #[arg(long)]
    pub no_progress: bool,

    /// Output format for messages and the final summary
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Configuration file path
    #[arg(long, env = "AUTOPSARC_CONFIG", help = "Path to the JSON configuration file")]
    pub config: Option<PathBuf>,

    /// Show detailed help and usage examples
    #[arg(long)]
    pub help_full: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl From<OutputFormat> for OutputMode {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        }
    }
}

impl Cli {
    pub fn config_path(&self) -> Result<PathBuf> {
        match self.config {
            Some(ref path) => Ok(path.clone()),
            None => Config::default_path(),
        }
    }

    pub fn load_config(&self) -> Result<(Config, PathBuf)> {
        let path = self.config_path()?;
        let config = Config::load_from_file(&path)?;
        Ok((config, path))
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_format.into()
    }

    /// `Some(path)` for `--psarc PATH`, `Some("")` for a bare `--psarc`.
    pub fn psarc_setter(&self) -> Option<&str> {
        self.psarc.as_deref()
    }

    pub fn directories(&self) -> Option<(PathBuf, PathBuf)> {
        match (&self.input, &self.output) {
            (Some(input), Some(output)) => Some((input.clone(), output.clone())),
            _ => None,
        }
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    pub fn print_full_help() -> Result<()> {
        Cli::command().print_long_help()?;
        Ok(())
    }

    pub fn print_short_help() -> Result<()> {
        Cli::command().print_help()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_extraction_arguments() {
        let cli = Cli::try_parse_from([
            "autopsarc", "-i", "archives", "-o", "extracted", "-v", "-l", "--workers", "6",
        ])
        .unwrap();

        assert_eq!(
            cli.directories(),
            Some((PathBuf::from("archives"), PathBuf::from("extracted")))
        );
        assert!(cli.log);
        assert_eq!(cli.verbosity_level(), 1);
        assert_eq!(cli.workers, 6);
        assert_eq!(cli.psarc_setter(), None);
        assert_eq!(cli.output_mode(), OutputMode::Human);
    }

    #[test]
    fn test_default_workers() {
        let cli = Cli::try_parse_from(["autopsarc", "-i", "a", "-o", "b"]).unwrap();
        assert_eq!(cli.workers, DEFAULT_WORKERS);
        assert!(!cli.log);
        assert!(!cli.no_progress);
    }

    #[test]
    fn test_psarc_with_and_without_value() {
        let cli = Cli::try_parse_from(["autopsarc", "--psarc", "/opt/PSARC.exe"]).unwrap();
        assert_eq!(cli.psarc_setter(), Some("/opt/PSARC.exe"));

        let cli = Cli::try_parse_from(["autopsarc", "-p"]).unwrap();
        assert_eq!(cli.psarc_setter(), Some(""));
    }

    #[test]
    fn test_psarc_must_be_standalone() {
        let result = Cli::try_parse_from(["autopsarc", "-p", "/opt/PSARC.exe", "-i", "archives"]);
        assert!(result.is_err());

        let result = Cli::try_parse_from(["autopsarc", "-o", "out", "--psarc"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["autopsarc", "-i", "a", "-o", "b", "-q", "-v"]).is_err());

        let cli = Cli::try_parse_from(["autopsarc", "-i", "a", "-o", "b", "-q"]).unwrap();
        assert_eq!(cli.verbosity_level(), 0);
    }

    #[test]
    fn test_output_format_parsing() {
        let cli =
            Cli::try_parse_from(["autopsarc", "-i", "a", "-o", "b", "--output-format", "json"])
                .unwrap();
        assert_eq!(cli.output_mode(), OutputMode::Json);
    }

    #[test]
    fn test_explicit_config_path() {
        let cli = Cli::try_parse_from(["autopsarc", "--config", "/tmp/cfg.json", "--help-full"])
            .unwrap();
        assert_eq!(cli.config_path().unwrap(), PathBuf::from("/tmp/cfg.json"));
        assert!(cli.help_full);
    }
}
