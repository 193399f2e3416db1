//! Interactive supervisor TUI for continuous Claude Code sessions.
//!
//! Repeatedly launches the Claude CLI, streams its stream-json output into a
//! three-pane terminal display, persists raw output to an append log, sleeps
//! out self-reported rate limits while preserving conversation context, and
//! collects bounded human interjections between runs.

pub mod buffer;
pub mod config;
pub mod event;
pub mod logging;
pub mod ratelimit;
pub mod render;
pub mod run_loop;
pub mod session;
pub mod tui;
