//! One supervised subprocess run: invocation, streaming reassembly, append log.
//!
//! Every raw output line is persisted to the append log before any
//! interpretation. Lines are then reassembled into complete JSON objects
//! under a hard line-count guard; anything that never becomes JSON is shown
//! as pass-through text. Errors inside a run degrade to display lines; only
//! startup-level failures propagate.

use crate::config::AppConfig;
use crate::event::StreamEvent;
use crate::render::Renderer;
use crate::tui::Tui;
use anyhow::{Context, Result};
use chrono::Local;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::os::unix::io::FromRawFd;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::{debug, error, info, warn};

/// Width of the session separator banner.
pub const SEPARATOR_WIDTH: usize = 60;
/// Reassembly guard: accumulating more lines than this forces a discard.
pub const MAX_JSON_BUFFER_LINES: usize = 100;

/// Prompt string, continuation flag, and the optional human interjection
/// attached to the next run.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub prompt: String,
    pub continue_session: bool,
    pub interjection: Option<String>,
}

impl SessionContext {
    /// The prompt actually sent, with any interjection appended under an
    /// explicit label.
    pub fn full_prompt(&self) -> String {
        match self.interjection.as_deref() {
            Some(extra) => format!(
                "{}\n\nAdditional context from user:\n{}",
                self.prompt, extra
            ),
            None => self.prompt.clone(),
        }
    }
}

/// Outcome of feeding one raw subprocess line into the reassembler.
#[derive(Debug, PartialEq)]
pub enum LineOutcome {
    /// Blank line, or a fragment of a still-incomplete object.
    Pending,
    /// Plain text outside any JSON object; display as-is.
    PassThrough,
    /// A complete JSON object was assembled.
    Complete(Value),
    /// The accumulation guard tripped; the buffer was discarded.
    Overflow {
        lines: usize,
        discarded_prefix: String,
    },
}

/// Incremental accumulation of output lines into one complete JSON object,
/// bounded by [`MAX_JSON_BUFFER_LINES`] against malformed input.
#[derive(Debug, Default)]
pub struct JsonReassembly {
    buffer: String,
    lines: usize,
}

impl JsonReassembly {
    pub fn feed(&mut self, line: &str) -> LineOutcome {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return LineOutcome::Pending;
        }
        if trimmed.starts_with('{') {
            self.buffer = trimmed.to_string();
            self.lines = 1;
        } else if self.lines > 0 {
            self.buffer.push_str(trimmed);
            self.lines += 1;
            if self.lines > MAX_JSON_BUFFER_LINES {
                let outcome = LineOutcome::Overflow {
                    lines: self.lines,
                    discarded_prefix: self.buffer.chars().take(100).collect(),
                };
                self.buffer.clear();
                self.lines = 0;
                return outcome;
            }
        } else {
            return LineOutcome::PassThrough;
        }
        match serde_json::from_str::<Value>(&self.buffer) {
            Ok(value) => {
                self.buffer.clear();
                self.lines = 0;
                LineOutcome::Complete(value)
            }
            // Incomplete object; keep accumulating. Expected, not an error.
            Err(_) => LineOutcome::Pending,
        }
    }

    pub fn pending_lines(&self) -> usize {
        self.lines
    }
}

/// Spawns the subprocess and streams its merged output into the display
/// buffer and the append log.
pub struct SessionRunner {
    claude_cmd: String,
    claude_args: Vec<String>,
    output_path: PathBuf,
    log: File,
}

impl SessionRunner {
    /// Open the append log once; the handle lives for the whole process.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.output_path)
            .with_context(|| {
                format!("cannot open output log {}", config.output_path.display())
            })?;
        Ok(Self {
            claude_cmd: config.claude_cmd.clone(),
            claude_args: config.claude_args.clone(),
            output_path: config.output_path.clone(),
            log,
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn build_command(&self, ctx: &SessionContext) -> Command {
        let mut cmd = Command::new(&self.claude_cmd);
        if ctx.continue_session {
            cmd.arg("--continue");
        }
        cmd.args(&self.claude_args);
        cmd.args([
            "--dangerously-skip-permissions",
            "--verbose",
            "--output-format",
            "stream-json",
            "-p",
        ]);
        cmd.arg(ctx.full_prompt());
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Run one session, bracketed by timestamped banners regardless of
    /// outcome.
    pub fn run(&mut self, tui: &mut Tui, renderer: &Renderer, ctx: &SessionContext) -> Result<()> {
        tui.draw_status(&format!("Running: {} ...", self.claude_cmd))?;
        self.banner(tui, "SESSION STARTED");
        tui.draw_output()?;
        info!(
            continue_session = ctx.continue_session,
            has_interjection = ctx.interjection.is_some(),
            "session starting"
        );

        let (mut child, reader) = match spawn_merged(self.build_command(ctx)) {
            Ok(pair) => pair,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let msg = format!(
                    "ERROR: '{}' command not found. Is Claude Code installed?",
                    self.claude_cmd
                );
                error!("{msg}");
                tui.add_line(msg);
                tui.draw_output()?;
                return Ok(());
            }
            Err(err) => {
                let msg = format!("ERROR: failed to start '{}': {err}", self.claude_cmd);
                error!("{msg}");
                tui.add_line(msg);
                tui.draw_output()?;
                return Ok(());
            }
        };

        let mut reassembly = JsonReassembly::default();
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!(%err, "subprocess read failed");
                    break;
                }
            };
            self.append_log(&line);
            match reassembly.feed(&line) {
                LineOutcome::Pending => {}
                LineOutcome::PassThrough => {
                    tui.add_line(sanitize_line(&line));
                    tui.draw_output()?;
                }
                LineOutcome::Overflow {
                    lines,
                    discarded_prefix,
                } => {
                    let msg = format!(
                        "ERROR: Malformed JSON after {lines} lines. Buffer: {discarded_prefix}..."
                    );
                    error!("{msg}");
                    tui.add_line(msg);
                    tui.draw_output()?;
                }
                LineOutcome::Complete(value) => {
                    match serde_json::from_value::<StreamEvent>(value) {
                        Ok(event) => {
                            for rendered in renderer.render(&event) {
                                tui.add_line(rendered);
                            }
                            tui.draw_output()?;
                            tui.draw_status("Running Claude session...")?;
                        }
                        Err(err) => {
                            debug!(%err, "unrecognized event shape");
                        }
                    }
                }
            }
        }

        match child.wait() {
            Ok(status) if !status.success() => {
                let code = status.code().unwrap_or(-1);
                warn!(code, "claude exited with non-zero status");
                tui.add_line(format!("WARNING: Claude exited with code {code}"));
            }
            Ok(_) => {}
            Err(err) => {
                warn!(%err, "failed to wait for claude");
            }
        }

        self.banner(tui, "SESSION ENDED");
        tui.draw_output()?;
        Ok(())
    }

    fn banner(&self, tui: &mut Tui, label: &str) {
        tui.add_line(String::new());
        tui.add_line("=".repeat(SEPARATOR_WIDTH));
        tui.add_line(format!(
            "{label}: {}",
            Local::now().format("%Y-%m-%dT%H:%M:%S")
        ));
        tui.add_line("=".repeat(SEPARATOR_WIDTH));
    }

    /// The raw line goes to the append log before any interpretation; a
    /// write failure downgrades to a warning and the run continues unlogged.
    fn append_log(&mut self, line: &str) {
        if let Err(err) = writeln!(self.log, "{line}") {
            warn!(%err, "failed to write output log");
        }
    }
}

/// Spawn with stdout and stderr sharing one pipe so the blocking reader sees
/// a single interleaved line stream, matching the subprocess contract.
fn spawn_merged(mut cmd: Command) -> io::Result<(Child, BufReader<File>)> {
    let mut fds = [0 as libc::c_int; 2];
    // SAFETY: plain pipe(2); both descriptors are owned immediately below.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let (read_fd, write_fd) = (fds[0], fds[1]);
    // SAFETY: write_fd is open; the dup gives stderr its own descriptor.
    let stderr_fd = unsafe { libc::dup(write_fd) };
    if stderr_fd < 0 {
        let err = io::Error::last_os_error();
        // SAFETY: both descriptors came from pipe(2) above and are unowned.
        unsafe {
            libc::close(read_fd);
            libc::close(write_fd);
        }
        return Err(err);
    }
    // SAFETY: each descriptor is open and ownership transfers exactly once.
    let (stdout, stderr, reader) = unsafe {
        (
            Stdio::from_raw_fd(write_fd),
            Stdio::from_raw_fd(stderr_fd),
            File::from_raw_fd(read_fd),
        )
    };
    cmd.stdout(stdout).stderr(stderr);
    // The Command drops its copies of the write ends when this function
    // returns, so the reader reaches EOF once the child exits.
    let child = cmd.spawn()?;
    Ok((child, BufReader::new(reader)))
}

/// Strip ANSI escapes from pass-through lines so raw subprocess control
/// sequences cannot corrupt the panes.
fn sanitize_line(line: &str) -> String {
    let stripped = strip_ansi_escapes::strip(line.as_bytes());
    String::from_utf8_lossy(&stripped).into_owned()
}
