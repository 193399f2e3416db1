//! Bounded scrollback for rendered display lines.

use std::collections::VecDeque;

/// Default maximum retained display lines (roughly 500KB at 50 chars/line).
pub const MAX_OUTPUT_LINES: usize = 10_000;

/// FIFO ring of display lines plus the scroll offset for the output pane.
///
/// Invariant: `len() <= capacity`; pushing past capacity evicts exactly the
/// oldest entry. Appending resets the scroll offset so the newest output is
/// visible.
#[derive(Debug)]
pub struct OutputBuffer {
    lines: VecDeque<String>,
    capacity: usize,
    scroll_offset: isize,
}

impl OutputBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity: capacity.max(1),
            scroll_offset: 0,
        }
    }

    pub fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
        self.scroll_offset = 0;
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn scroll_offset(&self) -> isize {
        self.scroll_offset
    }

    /// Move the visible window relative to the bottom. Out-of-range offsets
    /// are tolerated; `window_start` clamps at query time.
    pub fn scroll_by(&mut self, delta: isize) {
        self.scroll_offset = self.scroll_offset.saturating_add(delta);
    }

    /// Starting index of the visible window for `visible` rows.
    pub fn window_start(&self, visible: usize) -> usize {
        window_start(self.lines.len(), visible, self.scroll_offset)
    }

    /// Lines visible in a pane of `visible` rows, honoring the scroll offset.
    pub fn visible(&self, visible: usize) -> impl Iterator<Item = &str> {
        let start = self.window_start(visible);
        self.lines
            .iter()
            .skip(start)
            .take(visible)
            .map(String::as_str)
    }
}

/// Scroll-window law: show the latest `visible` rows shifted by `offset`,
/// clamped into `[0, total - visible]`.
pub fn window_start(total: usize, visible: usize, offset: isize) -> usize {
    if total <= visible {
        return 0;
    }
    let max_start = (total - visible) as isize;
    (max_start + offset).clamp(0, max_start) as usize
}
