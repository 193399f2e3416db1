//! Human-friendly rendering of decoded stream events.
//!
//! Rendering is a pure transformation: every call to [`Renderer::render`]
//! builds a fresh [`RenderState`], so no visual state (open box, code fence)
//! can leak from one event into the next.

use crate::event::{ContentBlock, ContentItem, EventKind, StreamEvent};
use anyhow::{bail, Result};
use serde_json::Value;
use textwrap::{word_splitters::WordSplitter, Options};

/// Lines shown in tool input/result previews.
pub const PREVIEW_LINES: usize = 5;
/// Character width for preview truncation.
pub const PREVIEW_CHAR_WIDTH: usize = 70;
/// Columns reserved for box borders when wrapping.
pub const WRAP_WIDTH_OFFSET: usize = 10;

/// Which decoration box is currently open while walking content items.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum OpenBox {
    #[default]
    None,
    Assistant,
}

/// Transient state threaded through a single render pass.
#[derive(Debug, Default)]
struct RenderState {
    open_box: OpenBox,
    in_code_block: bool,
}

/// Renders one event into display lines sized for a terminal of fixed width.
pub struct Renderer {
    width: usize,
}

impl Renderer {
    pub fn new(width: usize) -> Result<Self> {
        if width <= WRAP_WIDTH_OFFSET {
            bail!("render width must be greater than {WRAP_WIDTH_OFFSET}, got {width}");
        }
        Ok(Self { width })
    }

    /// Render one event. Unrecognized events yield no lines; this is a
    /// silent no-op, not an error.
    pub fn render(&self, event: &StreamEvent) -> Vec<String> {
        let mut state = RenderState::default();
        match event.kind {
            EventKind::User => self.render_user(event),
            EventKind::Assistant => self.render_assistant(&mut state, event),
            EventKind::System => render_system(event),
            EventKind::Other if event.has_tool_result() => render_tool_results(event),
            EventKind::Other => Vec::new(),
        }
    }

    fn wrap(&self, text: &str) -> Vec<String> {
        wrap_plain(text, self.width - WRAP_WIDTH_OFFSET)
    }

    /// User messages show only their first text content item, boxed.
    fn render_user(&self, event: &StreamEvent) -> Vec<String> {
        let text = match event.content().first() {
            Some(ContentBlock::Item(ContentItem::Text { text })) => text.as_str(),
            Some(ContentBlock::Text(text)) => text.as_str(),
            _ => "",
        };
        if text.is_empty() {
            return Vec::new();
        }
        let mut lines = vec!["╭─── User".to_string()];
        for wrapped in self.wrap(text) {
            lines.push(format!("│  {wrapped}"));
        }
        lines.push("╰───".to_string());
        lines
    }

    /// Assistant messages interleave text and tool calls; text shares one
    /// "Assistant" box that closes whenever a tool call interrupts it.
    fn render_assistant(&self, state: &mut RenderState, event: &StreamEvent) -> Vec<String> {
        let mut lines = Vec::new();
        for block in event.content() {
            let ContentBlock::Item(item) = block else {
                continue;
            };
            match item {
                ContentItem::Text { text } => {
                    if state.open_box != OpenBox::Assistant {
                        lines.push("  ╭─── Assistant".to_string());
                        state.open_box = OpenBox::Assistant;
                    }
                    for line in self.render_assistant_text(state, text) {
                        lines.push(format!("  {line}"));
                    }
                }
                ContentItem::ToolUse { name, input } => {
                    if state.open_box == OpenBox::Assistant {
                        lines.push("  ╰───".to_string());
                        state.open_box = OpenBox::None;
                    }
                    lines.extend(render_tool_use(name, input));
                }
                ContentItem::ToolResult { .. } => {}
            }
        }
        if state.open_box == OpenBox::Assistant {
            lines.push("  ╰───".to_string());
            state.open_box = OpenBox::None;
        }
        lines
    }

    /// Markdown-ish text: code fences toggle preserved formatting, ATX
    /// headings map to three decorations, blank lines become empty box rows,
    /// everything else word-wraps.
    fn render_assistant_text(&self, state: &mut RenderState, text: &str) -> Vec<String> {
        let mut lines = Vec::new();
        for line in text.split('\n') {
            let stripped = line.trim();

            if let Some(rest) = stripped.strip_prefix("```") {
                state.in_code_block = !state.in_code_block;
                if state.in_code_block {
                    let lang = rest.trim();
                    if !lang.is_empty() {
                        lines.push(format!("│  ┌─[{lang}]"));
                    }
                }
                continue;
            }

            if stripped.is_empty() {
                lines.push("│  ".to_string());
                continue;
            }

            if state.in_code_block {
                lines.push(format!("│     │ {line}"));
            } else if let Some(heading) = stripped.strip_prefix("### ") {
                lines.push(format!("│  ▌ {heading}"));
            } else if let Some(heading) = stripped.strip_prefix("## ") {
                lines.push(format!("│  ━━ {heading}"));
            } else if let Some(heading) = stripped.strip_prefix("# ") {
                lines.push(format!("│  ═══ {heading} ═══"));
            } else {
                for wrapped in self.wrap(line) {
                    lines.push(format!("│  {wrapped}"));
                }
            }
        }
        lines
    }
}

fn render_tool_use(name: &str, input: &Value) -> Vec<String> {
    let mut lines = vec![format!("    ╭─── Tool: {name}")];
    let serialized =
        serde_json::to_string_pretty(input).unwrap_or_else(|_| input.to_string());
    lines.extend(preview_lines(&serialized));
    lines.push("    ╰───".to_string());
    lines
}

/// System init events show the model and working directory; other subtypes
/// produce no output.
fn render_system(event: &StreamEvent) -> Vec<String> {
    if event.subtype.as_deref() != Some("init") {
        return Vec::new();
    }
    let model = event.model.as_deref().unwrap_or("unknown");
    let mut lines = vec![
        "╭─── System Init".to_string(),
        format!("│  Model: {model}"),
    ];
    if let Some(cwd) = event.cwd.as_deref().filter(|cwd| !cwd.is_empty()) {
        lines.push(format!("│  CWD: {cwd}"));
    }
    lines.push("╰───".to_string());
    lines
}

fn render_tool_results(event: &StreamEvent) -> Vec<String> {
    let mut lines = Vec::new();
    for block in event.content() {
        let ContentBlock::Item(ContentItem::ToolResult { content, is_error }) = block else {
            continue;
        };
        let marker = if *is_error { "[ERROR]" } else { "[OK]" };
        lines.push(format!("    ╭─── Tool Result {marker}"));
        lines.extend(preview_lines(&tool_result_text(content)));
        lines.push("    ╰───".to_string());
    }
    lines
}

/// Tool result content may be a bare string or structured JSON.
fn tool_result_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Truncate a serialized payload to a bounded preview, each line capped at
/// [`PREVIEW_CHAR_WIDTH`] chars, with an explicit "more" marker when cut.
fn preview_lines(payload: &str) -> Vec<String> {
    let total = payload.lines().count();
    let mut out = Vec::new();
    for line in payload.lines().take(PREVIEW_LINES) {
        let shown = if line.chars().count() > PREVIEW_CHAR_WIDTH {
            let truncated: String = line.chars().take(PREVIEW_CHAR_WIDTH).collect();
            format!("{truncated}...")
        } else {
            line.to_string()
        };
        out.push(format!("    │  {shown}"));
    }
    if total > PREVIEW_LINES {
        out.push("    │  ...".to_string());
    }
    out
}

/// Word-wrap without breaking long words or splitting on hyphens.
fn wrap_plain(text: &str, width: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let options = Options::new(width)
        .break_words(false)
        .word_splitter(WordSplitter::NoHyphenation);
    textwrap::wrap(text, options)
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: Value) -> StreamEvent {
        serde_json::from_value(value).expect("event deserializes")
    }

    fn renderer() -> Renderer {
        Renderer::new(80).expect("width is valid")
    }

    #[test]
    fn rejects_width_at_or_below_border_allowance() {
        assert!(Renderer::new(WRAP_WIDTH_OFFSET).is_err());
        assert!(Renderer::new(WRAP_WIDTH_OFFSET + 1).is_ok());
    }

    #[test]
    fn user_message_renders_in_box() {
        let lines = renderer().render(&event(json!({
            "type": "user",
            "message": {"content": [{"type": "text", "text": "hello there"}]}
        })));
        assert_eq!(lines, vec!["╭─── User", "│  hello there", "╰───"]);
    }

    #[test]
    fn user_message_without_text_renders_nothing() {
        let lines = renderer().render(&event(json!({
            "type": "user",
            "message": {"content": []}
        })));
        assert!(lines.is_empty());
    }

    #[test]
    fn user_message_accepts_bare_string_content() {
        let lines = renderer().render(&event(json!({
            "type": "user",
            "message": {"content": ["plain words"]}
        })));
        assert_eq!(lines[1], "│  plain words");
    }

    #[test]
    fn assistant_text_wraps_without_breaking_long_words() {
        let long_word = "a".repeat(120);
        let lines = renderer().render(&event(json!({
            "type": "assistant",
            "message": {"content": [{"type": "text", "text": long_word}]}
        })));
        // Long words survive intact even past the wrap width.
        assert!(lines[1].contains(&"a".repeat(120)));
    }

    #[test]
    fn heading_levels_get_distinct_decorations() {
        let lines = renderer().render(&event(json!({
            "type": "assistant",
            "message": {"content": [{"type": "text", "text": "# one\n## two\n### three"}]}
        })));
        assert_eq!(lines[1], "  │  ═══ one ═══");
        assert_eq!(lines[2], "  │  ━━ two");
        assert_eq!(lines[3], "  │  ▌ three");
    }

    #[test]
    fn code_fence_preserves_formatting_and_labels_language() {
        let text = "```rust\n    let x = 1;\n```\nafter";
        let lines = renderer().render(&event(json!({
            "type": "assistant",
            "message": {"content": [{"type": "text", "text": text}]}
        })));
        assert_eq!(lines[1], "  │  ┌─[rust]");
        assert_eq!(lines[2], "  │     │     let x = 1;");
        assert_eq!(lines[3], "  │  after");
    }

    #[test]
    fn blank_lines_become_empty_box_rows() {
        let lines = renderer().render(&event(json!({
            "type": "assistant",
            "message": {"content": [{"type": "text", "text": "a\n\nb"}]}
        })));
        assert_eq!(lines[2], "  │  ");
    }

    #[test]
    fn code_block_state_does_not_leak_across_events() {
        let renderer = renderer();
        // First event leaves a fence unclosed.
        renderer.render(&event(json!({
            "type": "assistant",
            "message": {"content": [{"type": "text", "text": "```\ncode"}]}
        })));
        // Second event must render as plain wrapped text, not code.
        let lines = renderer.render(&event(json!({
            "type": "assistant",
            "message": {"content": [{"type": "text", "text": "plain text"}]}
        })));
        assert_eq!(lines[1], "  │  plain text");
    }

    #[test]
    fn tool_use_closes_assistant_box_first() {
        let lines = renderer().render(&event(json!({
            "type": "assistant",
            "message": {"content": [
                {"type": "text", "text": "running a command"},
                {"type": "tool_use", "name": "Bash", "input": {"command": "ls"}},
            ]}
        })));
        let close = lines
            .iter()
            .position(|line| line == "  ╰───")
            .expect("assistant box closes");
        let tool = lines
            .iter()
            .position(|line| line == "    ╭─── Tool: Bash")
            .expect("tool box opens");
        assert!(close < tool);
        // No dangling assistant close after the tool box.
        assert_eq!(lines.last().map(String::as_str), Some("    ╰───"));
    }

    #[test]
    fn tool_input_preview_is_bounded_with_more_marker() {
        // Six keys pretty-print to 8 lines (braces included).
        let input = json!({"a": 1, "b": 2, "c": 3, "d": 4, "e": 5, "f": 6});
        let lines = render_tool_use("Edit", &input);
        // Header + PREVIEW_LINES + "more" marker + close.
        assert_eq!(lines.len(), 1 + PREVIEW_LINES + 1 + 1);
        assert_eq!(lines[lines.len() - 2], "    │  ...");
    }

    #[test]
    fn preview_truncates_long_lines_with_ellipsis() {
        let long = "x".repeat(PREVIEW_CHAR_WIDTH + 20);
        let lines = preview_lines(&long);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("..."));
        assert_eq!(
            lines[0].chars().count(),
            "    │  ".chars().count() + PREVIEW_CHAR_WIDTH + 3
        );
    }

    #[test]
    fn system_init_shows_model_and_cwd() {
        let lines = renderer().render(&event(json!({
            "type": "system",
            "subtype": "init",
            "model": "claude-x",
            "cwd": "/work"
        })));
        assert_eq!(
            lines,
            vec![
                "╭─── System Init",
                "│  Model: claude-x",
                "│  CWD: /work",
                "╰───"
            ]
        );
    }

    #[test]
    fn system_other_subtypes_render_nothing() {
        let lines = renderer().render(&event(json!({
            "type": "system",
            "subtype": "status"
        })));
        assert!(lines.is_empty());
    }

    #[test]
    fn tool_result_marks_errors() {
        let lines = renderer().render(&event(json!({
            "type": "result",
            "message": {"content": [
                {"type": "tool_result", "content": "boom", "is_error": true}
            ]}
        })));
        assert_eq!(lines[0], "    ╭─── Tool Result [ERROR]");
        assert_eq!(lines[1], "    │  boom");
    }

    #[test]
    fn tool_result_without_error_flag_is_ok() {
        let lines = renderer().render(&event(json!({
            "type": "result",
            "message": {"content": [
                {"type": "tool_result", "content": "fine"}
            ]}
        })));
        assert_eq!(lines[0], "    ╭─── Tool Result [OK]");
    }

    #[test]
    fn unknown_event_renders_nothing() {
        let lines = renderer().render(&event(json!({"type": "result", "is_error": false})));
        assert!(lines.is_empty());
    }

    #[test]
    fn rendering_is_idempotent() {
        let renderer = renderer();
        let event = event(json!({
            "type": "assistant",
            "message": {"content": [
                {"type": "text", "text": "# head\n```py\nx\n```\ntail"},
                {"type": "tool_use", "name": "Read", "input": {"path": "/tmp/f"}},
            ]}
        }));
        assert_eq!(renderer.render(&event), renderer.render(&event));
    }
}
