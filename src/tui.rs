//! Three-pane terminal surface: scrollable output, status line, input box.
//!
//! The surface owns raw mode and the alternate screen for the life of the
//! process; dropping it restores the terminal even when an error unwinds.
//! Keystroke acquisition is split into a pure [`InputState`] machine driven
//! by a blocking [`KeySource`], so the bounded-input rules are testable
//! without a terminal.

use crate::buffer::{OutputBuffer, MAX_OUTPUT_LINES};
use anyhow::{bail, Context, Result};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{self, Stdout, Write};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Height of the status bar.
pub const STATUS_HEIGHT: u16 = 1;
/// Height of the input pane, border rows included.
pub const INPUT_HEIGHT: u16 = 4;
/// Rows of wrapped input text visible inside the input pane.
pub const INPUT_DISPLAY_LINES: usize = 2;
/// Minimum terminal size required for the three panes.
pub const MIN_TERMINAL_WIDTH: u16 = 40;
pub const MIN_TERMINAL_HEIGHT: u16 = 10;
/// Maximum characters accepted into the input accumulator.
pub const MAX_INPUT_CHARS: usize = 10_000;

const INPUT_TITLE: &str = " Your Input (press Enter to submit, Ctrl+D to skip) ";

/// A single decoded keystroke for the input pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKey {
    Char(char),
    Backspace,
    Submit,
    /// Esc, Ctrl+D, or Ctrl+C: finish immediately with "no input".
    Cancel,
}

/// Result of feeding one key into the accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputStep {
    /// Keep reading keys.
    Pending,
    /// Key refused by the length cap; ring the bell.
    Rejected,
    /// Input round finished; `None` means "no input".
    Done(Option<String>),
}

/// Bounded input accumulator. Callers only ever see committed input.
#[derive(Debug, Default)]
pub struct InputState {
    buffer: String,
    chars: usize,
}

impl InputState {
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn apply(&mut self, key: InputKey) -> InputStep {
        match key {
            InputKey::Char(ch) => {
                if self.chars >= MAX_INPUT_CHARS {
                    return InputStep::Rejected;
                }
                self.buffer.push(ch);
                self.chars += 1;
                InputStep::Pending
            }
            InputKey::Backspace => {
                if self.buffer.pop().is_some() {
                    self.chars -= 1;
                }
                InputStep::Pending
            }
            InputKey::Submit => {
                let trimmed = self.buffer.trim();
                InputStep::Done(if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                })
            }
            InputKey::Cancel => InputStep::Done(None),
        }
    }
}

/// Map a crossterm key event onto the input-pane alphabet. `None` means the
/// key is ignored.
pub fn decode_key(key: &KeyEvent) -> Option<InputKey> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('d') | KeyCode::Char('c') => Some(InputKey::Cancel),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Enter => Some(InputKey::Submit),
        KeyCode::Esc => Some(InputKey::Cancel),
        KeyCode::Backspace => Some(InputKey::Backspace),
        KeyCode::Char(ch) => Some(InputKey::Char(ch)),
        _ => None,
    }
}

/// Blocking source of key events, abstracted so the input loop can be driven
/// by scripted keys in tests.
pub trait KeySource {
    fn next_key(&mut self) -> Result<KeyEvent>;
}

/// Crossterm-backed key source used by the real TUI.
pub struct TerminalKeys;

impl KeySource for TerminalKeys {
    fn next_key(&mut self) -> Result<KeyEvent> {
        loop {
            match event::read().context("failed to read terminal event")? {
                Event::Key(key) if key.kind == KeyEventKind::Press => return Ok(key),
                _ => {}
            }
        }
    }
}

/// Terminal surface owning the three panes and the raw-mode session.
pub struct Tui {
    out: Stdout,
    cols: u16,
    output_rows: u16,
    buffer: OutputBuffer,
}

impl Tui {
    /// Take over the terminal: raw mode plus alternate screen. Fails before
    /// touching terminal state when the window is below the minimum layout.
    pub fn new() -> Result<Self> {
        let (cols, rows) = terminal::size().context("failed to query terminal size")?;
        if cols < MIN_TERMINAL_WIDTH || rows < MIN_TERMINAL_HEIGHT {
            bail!(
                "terminal {cols}x{rows} is too small; minimum is \
                 {MIN_TERMINAL_WIDTH}x{MIN_TERMINAL_HEIGHT}"
            );
        }
        terminal::enable_raw_mode().context("failed to enable raw mode")?;
        let mut out = io::stdout();
        queue!(out, EnterAlternateScreen, Hide)?;
        out.flush()?;
        Ok(Self {
            out,
            cols,
            output_rows: rows - STATUS_HEIGHT - INPUT_HEIGHT,
            buffer: OutputBuffer::new(MAX_OUTPUT_LINES),
        })
    }

    pub fn width(&self) -> usize {
        self.cols as usize
    }

    /// Append one display line to the scrollback. Callers redraw explicitly
    /// once a batch of lines has landed.
    pub fn add_line(&mut self, line: impl Into<String>) {
        self.buffer.push(line.into());
    }

    /// Repaint the output pane from the buffer's visible window.
    pub fn draw_output(&mut self) -> Result<()> {
        let visible = self.output_rows.saturating_sub(1) as usize;
        for row in 0..self.output_rows {
            queue!(self.out, MoveTo(0, row), Clear(ClearType::CurrentLine))?;
        }
        let max_width = (self.cols as usize).saturating_sub(1);
        let lines: Vec<String> = self
            .buffer
            .visible(visible)
            .map(|line| truncate_display(line, max_width))
            .collect();
        for (row, line) in lines.into_iter().enumerate() {
            queue!(self.out, MoveTo(0, row as u16), Print(line))?;
        }
        self.out.flush()?;
        Ok(())
    }

    /// Rewrite the status line in full, truncating with an ellipsis.
    pub fn draw_status(&mut self, message: &str) -> Result<()> {
        let text = truncate_display(&format!(" {message}"), (self.cols as usize).saturating_sub(1));
        queue!(
            self.out,
            MoveTo(0, self.output_rows),
            Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(text),
            ResetColor
        )?;
        self.out.flush()?;
        Ok(())
    }

    /// Repaint the bordered input pane with up to [`INPUT_DISPLAY_LINES`]
    /// wrapped rows of the in-progress input and a "(more)" indicator when
    /// further rows exist.
    pub fn draw_input(&mut self, input: &str) -> Result<()> {
        let top = self.output_rows + STATUS_HEIGHT;
        let width = self.cols as usize;
        let inner = width.saturating_sub(2);

        let title = truncate_display(INPUT_TITLE, inner);
        let mut top_border = String::from("╭");
        top_border.push_str(&title);
        for _ in title.width()..inner {
            top_border.push('─');
        }
        top_border.push('╮');

        let wrapped = wrap_input(input, width.saturating_sub(4));
        let mut rows = vec![top_border];
        for i in 0..INPUT_DISPLAY_LINES {
            let content = wrapped.get(i).map(String::as_str).unwrap_or("");
            let shown = truncate_display(content, width.saturating_sub(4));
            let mut row = format!("│ {shown}");
            while row.width() < width - 1 {
                row.push(' ');
            }
            row.push('│');
            rows.push(row);
        }

        let mut bottom_border = String::from("╰");
        if wrapped.len() > INPUT_DISPLAY_LINES && inner > 8 {
            for _ in 0..inner - 8 {
                bottom_border.push('─');
            }
            bottom_border.push_str("(more)──");
        } else {
            for _ in 0..inner {
                bottom_border.push('─');
            }
        }
        bottom_border.push('╯');
        rows.push(bottom_border);

        for (i, row) in rows.into_iter().enumerate() {
            queue!(
                self.out,
                MoveTo(0, top + i as u16),
                Clear(ClearType::CurrentLine),
                Print(row)
            )?;
        }
        self.out.flush()?;
        Ok(())
    }

    /// Block until the user commits or skips input. Interruptions and skip
    /// keys map to "no input"; partial input is never returned.
    pub fn read_input<K: KeySource>(&mut self, keys: &mut K) -> Result<Option<String>> {
        self.draw_status("Waiting for your input... (Ctrl+D to continue without input)")?;
        let mut state = InputState::default();
        self.draw_input(state.buffer())?;
        queue!(self.out, Show)?;
        self.out.flush()?;

        let result = loop {
            let key = keys.next_key()?;
            let Some(decoded) = decode_key(&key) else {
                continue;
            };
            match state.apply(decoded) {
                InputStep::Pending => self.draw_input(state.buffer())?,
                InputStep::Rejected => self.bell()?,
                InputStep::Done(result) => break result,
            }
        };

        queue!(self.out, Hide)?;
        self.out.flush()?;
        match &result {
            Some(text) => tracing::info!(chars = text.chars().count(), "user provided input"),
            None => tracing::info!("user skipped input"),
        }
        Ok(result)
    }

    fn bell(&mut self) -> Result<()> {
        queue!(self.out, Print('\u{7}'))?;
        self.out.flush()?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = queue!(self.out, Show, LeaveAlternateScreen);
        let _ = self.out.flush();
        let _ = terminal::disable_raw_mode();
    }
}

/// Truncate to a display width, appending an ellipsis when content was cut.
pub fn truncate_display(line: &str, max_width: usize) -> String {
    if line.width() <= max_width {
        return line.to_string();
    }
    let budget = max_width.saturating_sub(1);
    let mut out = String::new();
    let mut used = 0usize;
    for ch in line.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

/// Wrap in-progress input for the input pane; long words may be broken since
/// the pane must show exactly what was typed.
fn wrap_input(input: &str, width: usize) -> Vec<String> {
    if input.is_empty() {
        return Vec::new();
    }
    textwrap::wrap(input, width.max(1))
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}
