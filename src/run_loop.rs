//! The run/sleep/interject control loop.
//!
//! One session runs at a time; rate-limit detection always happens after the
//! subprocess has exited and its output is flushed to the append log, so it
//! only ever inspects a final line. The loop has no terminal state: only an
//! external interrupt (or a startup failure surfacing from a draw call)
//! ends it.

use crate::config::AppConfig;
use crate::ratelimit;
use crate::render::Renderer;
use crate::session::{SessionContext, SessionRunner};
use crate::tui::{TerminalKeys, Tui};
use anyhow::Result;
use chrono::{Local, TimeZone};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::info;

/// Pause between sessions so an unattended prompt cannot spin the loop.
pub const SESSION_PAUSE: Duration = Duration::from_secs(2);

fn epoch_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn format_epoch(epoch: u64) -> String {
    Local
        .timestamp_opt(epoch as i64, 0)
        .single()
        .map(|time| time.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_else(|| epoch.to_string())
}

/// Run sessions forever. After each run, either sleep out a reported rate
/// limit with the continuation flag forced on, or collect a bounded human
/// interjection for the next run.
pub fn run(config: &AppConfig, tui: &mut Tui) -> Result<()> {
    let renderer = Renderer::new(tui.width())?;
    let mut runner = SessionRunner::new(config)?;
    let mut keys = TerminalKeys;
    let mut ctx = SessionContext {
        prompt: config.prompt.clone(),
        continue_session: config.continue_session,
        interjection: None,
    };

    tui.draw_status("Starting...")?;
    tui.draw_output()?;
    tui.draw_input("")?;

    loop {
        runner.run(tui, &renderer, &ctx)?;

        let last = ratelimit::last_log_line(runner.output_path());
        let now = epoch_now();
        if let Some(reset) = ratelimit::reset_epoch(&last, now) {
            // Rate limited: force context preservation and wait out the
            // window instead of prompting.
            ctx.continue_session = true;
            let wait = reset.saturating_sub(now);
            let msg = format!(
                "Rate limited. Sleeping until {} ({wait}s)",
                format_epoch(reset)
            );
            info!(reset, wait, "rate limited; sleeping");
            tui.add_line(msg);
            tui.draw_output()?;
            tui.draw_status(&format!("Rate limited - sleeping for {wait}s..."))?;
            thread::sleep(Duration::from_secs(wait));
            continue;
        }

        ctx.continue_session = false;
        ctx.interjection = tui.read_input(&mut keys)?;
        thread::sleep(SESSION_PAUSE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_never_goes_negative() {
        let reset: u64 = 100;
        let now: u64 = 250;
        assert_eq!(reset.saturating_sub(now), 0);
    }

    #[test]
    fn format_epoch_is_second_precision() {
        let formatted = format_epoch(1_700_000_000);
        // 2023-11-14 in every timezone; exact hour depends on the host.
        assert!(formatted.starts_with("2023-11-1"));
        assert_eq!(formatted.len(), "2023-11-14T22:13:20".len());
    }
}
