//! Command-line parsing and validation helpers.

#[cfg(test)]
mod tests;
mod validation;

use clap::{ArgAction, Parser};
use std::path::PathBuf;

pub use validation::{binary_on_path, default_output_path};

/// CLI options for the loopterm TUI. Validated values keep the subprocess
/// invocation safe; all path and environment resolution happens here, once,
/// at the boundary.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "loopterm",
    about = "Interactive TUI for continuous Claude Code sessions",
    version
)]
pub struct AppConfig {
    /// Initial prompt to send to Claude Code
    #[arg(short = 'p', long)]
    pub prompt: String,

    /// Start with --continue (preserve conversation context)
    #[arg(long = "continue", default_value_t = false)]
    pub continue_session: bool,

    /// Path to the Claude CLI binary
    #[arg(long = "claude-cmd", env = "CLAUDE_CMD", default_value = "claude")]
    pub claude_cmd: String,

    /// Extra arguments passed to every Claude invocation (repeatable)
    #[arg(
        long = "claude-arg",
        action = ArgAction::Append,
        value_name = "ARG",
        allow_hyphen_values = true
    )]
    pub claude_args: Vec<String>,

    /// Append log path for raw subprocess output
    #[arg(
        long = "output",
        env = "LOOPTERM_OUTPUT",
        default_value_os_t = validation::default_output_path()
    )]
    pub output_path: PathBuf,

    /// Disable file logging
    #[arg(long = "no-logs", env = "LOOPTERM_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,
}
