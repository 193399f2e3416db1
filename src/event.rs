//! Decoded stream-json events emitted by the Claude CLI.
//!
//! One event arrives per complete JSON object on the subprocess stream.
//! Events are immutable once constructed and consumed exactly once by the
//! renderer. Unknown discriminants and content shapes deserialize into
//! catch-all variants rather than failing.

use serde::Deserialize;
use serde_json::Value;

/// Top-level discriminant of a stream event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    User,
    Assistant,
    System,
    #[default]
    #[serde(other)]
    Other,
}

/// One decoded structured message from the subprocess stream.
#[derive(Debug, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type", default)]
    pub kind: EventKind,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub message: Option<MessageBody>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// Content entries are usually typed objects but may be bare strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ContentBlock {
    Item(ContentItem),
    Text(String),
    Other(Value),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default = "unknown_tool_name")]
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        #[serde(default)]
        content: Value,
        #[serde(default)]
        is_error: bool,
    },
}

fn unknown_tool_name() -> String {
    "unknown".to_string()
}

impl StreamEvent {
    /// Content blocks, or an empty slice when the message body is missing.
    pub fn content(&self) -> &[ContentBlock] {
        self.message
            .as_ref()
            .map(|body| body.content.as_slice())
            .unwrap_or(&[])
    }

    /// True when any content block is an embedded tool result.
    pub fn has_tool_result(&self) -> bool {
        self.content()
            .iter()
            .any(|block| matches!(block, ContentBlock::Item(ContentItem::ToolResult { .. })))
    }
}
