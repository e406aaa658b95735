use autopsarc::ui::TerminalPrompt;
use autopsarc::{
    AutoPsarc, AutoPsarcError, BatchReport, Cli, OutputFormatter, OutputMode, PathPrompt,
    PsarcTool,
};
use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    // Parse CLI arguments
    let cli = Cli::parse();
    setup_logging(cli.verbosity_level());

    if cli.help_full {
        return match Cli::print_full_help() {
            Ok(()) => 0,
            Err(_) => 1,
        };
    }

    let mut autopsarc = match AutoPsarc::from_cli(&cli) {
        Ok(autopsarc) => autopsarc,
        Err(e) => {
            print_startup_error(&e, cli.output_mode());
            return exit_code_for(&e);
        }
    };

    // Handle special commands first
    if let Some(raw) = cli.psarc_setter() {
        return handle_set_executable(&mut autopsarc, raw);
    }

    let executable = {
        let mut terminal = TerminalPrompt::new();
        let prompt: Option<&mut dyn PathPrompt> = if TerminalPrompt::is_interactive() {
            Some(&mut terminal)
        } else {
            None
        };

        match autopsarc.ensure_executable(prompt) {
            Ok(path) => path,
            Err(e) => {
                autopsarc.handle_error(&e);
                return exit_code_for(&e);
            }
        }
    };

    let Some((input, output)) = cli.directories() else {
        autopsarc
            .output_formatter()
            .error("Both --input and --output are required to extract archives");
        if let Err(e) = Cli::print_short_help() {
            tracing::warn!(error = %e, "failed to print help");
        }
        return 2;
    };

    autopsarc.output_formatter().print_header("AutoPSARC");
    tracing::debug!(executable = %executable.display(), "using PSARC tool");

    // Execute main extraction workflow
    let tool = PsarcTool::new(executable);
    match autopsarc.run_batch(&input, &output, &tool) {
        Ok(report) => {
            autopsarc.output_formatter().print_batch_report(&report);
            report_exit_code(&report)
        }
        Err(e) => {
            autopsarc.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn handle_set_executable(autopsarc: &mut AutoPsarc, raw: &str) -> i32 {
    let mut terminal = TerminalPrompt::new();
    match autopsarc.set_executable_path(raw, &mut terminal) {
        Ok(_) => 0,
        Err(e) => {
            autopsarc.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn report_exit_code(report: &BatchReport) -> i32 {
    if report.was_cancelled() {
        130
    } else if report.has_failures() {
        2 // Some archives failed
    } else {
        0
    }
}

// Map error types to appropriate exit codes
fn exit_code_for(error: &AutoPsarcError) -> i32 {
    match error {
        AutoPsarcError::Cancelled => 130, // Interrupted (SIGINT)
        AutoPsarcError::NoArchivesFound { .. } => 3,
        AutoPsarcError::ExecutableNotConfigured | AutoPsarcError::InvalidExecutable { .. } => 4,
        AutoPsarcError::InvalidPath { .. } => 5,
        _ => 1, // General error
    }
}

fn print_startup_error(error: &AutoPsarcError, mode: OutputMode) {
    let formatter = OutputFormatter::new(mode, 0, false);
    formatter.print_user_friendly_error(error);
}

/// `RUST_LOG` wins when set; otherwise `-vv` turns on crate debug logs.
fn setup_logging(verbosity: u8) {
    let default_directive = match verbosity {
        0 | 1 => "autopsarc=warn",
        2 => "autopsarc=debug",
        _ => "autopsarc=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
