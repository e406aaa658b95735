pub mod output;
pub mod progress;
pub mod prompt;
pub mod signals;

pub use output::{OutputFormatter, OutputMode, ProgressAwareOutput};
pub use progress::ProgressManager;
pub use prompt::{PathPrompt, TerminalPrompt};
pub use signals::GracefulShutdown;
