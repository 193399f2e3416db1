//! Detection of the subprocess's self-reported rate-limit window.
//!
//! The Claude CLI signals throttling with a final error event whose result
//! text reads like `"Claude usage limit reached|<epoch>"`. Parsing is
//! deliberately forgiving: every malformed or out-of-bounds variant degrades
//! to "not rate limited", visible only as a trace-log breadcrumb, and the
//! loop proceeds normally.

use regex::Regex;
use serde_json::Value;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Reset epochs further in the future than this are rejected.
pub const MAX_FUTURE_HOURS: u64 = 24;
/// Reset epochs further in the past than this are rejected.
pub const MIN_PAST_HOURS: u64 = 1;

fn sentinel_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)Claude.*(?:usage|use|limit).*reach").expect("valid sentinel regex")
    })
}

/// Extract the rate-limit reset epoch from the last persisted log line,
/// evaluated against `now` (seconds since the Unix epoch).
///
/// `None` always means "proceed normally"; the caller cannot distinguish a
/// parse failure from a genuinely absent signal.
pub fn reset_epoch(raw: &str, now: u64) -> Option<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let data: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(err) => {
            debug!(%err, "last log line is not JSON");
            return None;
        }
    };
    if !data.get("is_error").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }
    let result = data.get("result").and_then(Value::as_str)?;
    if !sentinel_pattern().is_match(result) {
        return None;
    }
    let Some((_, timestamp)) = result.split_once('|') else {
        warn!(result = %head(result, 100), "rate limit message without timestamp");
        return None;
    };
    let epoch: u64 = match timestamp.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(timestamp = timestamp.trim(), "could not parse rate limit timestamp");
            return None;
        }
    };

    // Sanity bounds: accept (now - 1h, now + 24h], both ends tested.
    let min_past = now.saturating_sub(MIN_PAST_HOURS * 3600);
    let max_future = now.saturating_add(MAX_FUTURE_HOURS * 3600);
    if epoch <= min_past {
        warn!(epoch, now, "rate limit timestamp too far in past");
        return None;
    }
    if epoch > max_future {
        warn!(epoch, now, "rate limit timestamp too far in future");
        return None;
    }

    info!(epoch, "rate limit detected");
    Some(epoch)
}

/// Last non-empty line of the append log, scanned backward byte by byte so
/// large logs are never loaded into memory. Missing or unreadable files
/// yield an empty string.
pub fn last_log_line(path: &Path) -> String {
    match read_last_line(path) {
        Ok(line) => line,
        Err(err) => {
            debug!(path = %path.display(), %err, "could not read last log line");
            String::new()
        }
    }
}

fn read_last_line(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let len = file.seek(SeekFrom::End(0))?;
    let mut collected: Vec<u8> = Vec::new();
    let mut pos = len;
    while pos > 0 {
        pos -= 1;
        file.seek(SeekFrom::Start(pos))?;
        let mut byte = [0u8; 1];
        file.read_exact(&mut byte)?;
        match byte[0] {
            // Newlines before any content are trailing or blank lines; keep
            // scanning until a non-empty line has been collected.
            b'\n' | b'\r' => {
                if !collected.is_empty() {
                    break;
                }
            }
            other => collected.push(other),
        }
    }
    collected.reverse();
    Ok(String::from_utf8_lossy(&collected).into_owned())
}

fn head(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    const NOW: u64 = 1_700_000_000;

    fn limit_line(epoch: u64) -> String {
        format!(r#"{{"is_error": true, "result": "Claude usage limit reached|{epoch}"}}"#)
    }

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("loopterm_test_{}_{name}", std::process::id()));
        fs::write(&path, contents).expect("write temp file");
        path
    }

    #[test]
    fn extracts_epoch_from_sentinel_line() {
        assert_eq!(reset_epoch(&limit_line(NOW), NOW), Some(NOW));
    }

    #[test]
    fn lower_bound_is_inclusive_reject() {
        // Exactly one hour in the past is rejected; one second later accepted.
        assert_eq!(reset_epoch(&limit_line(NOW - 3600), NOW), None);
        assert_eq!(reset_epoch(&limit_line(NOW - 3599), NOW), Some(NOW - 3599));
    }

    #[test]
    fn upper_bound_is_inclusive_accept() {
        assert_eq!(
            reset_epoch(&limit_line(NOW + 24 * 3600), NOW),
            Some(NOW + 24 * 3600)
        );
        assert_eq!(reset_epoch(&limit_line(NOW + 24 * 3600 + 1), NOW), None);
    }

    #[test]
    fn sentinel_match_is_case_insensitive() {
        let line = format!(
            r#"{{"is_error": true, "result": "CLAUDE USAGE LIMIT REACHED|{NOW}"}}"#
        );
        assert_eq!(reset_epoch(&line, NOW), Some(NOW));
    }

    #[test]
    fn missing_pipe_degrades_to_none() {
        let line = r#"{"is_error": true, "result": "Claude usage limit reached"}"#;
        assert_eq!(reset_epoch(line, NOW), None);
    }

    #[test]
    fn unparseable_timestamp_degrades_to_none() {
        let line = r#"{"is_error": true, "result": "Claude usage limit reached|soon"}"#;
        assert_eq!(reset_epoch(line, NOW), None);
    }

    #[test]
    fn non_error_result_is_not_rate_limited() {
        let line = format!(
            r#"{{"is_error": false, "result": "Claude usage limit reached|{NOW}"}}"#
        );
        assert_eq!(reset_epoch(&line, NOW), None);
    }

    #[test]
    fn error_without_result_field_is_not_rate_limited() {
        assert_eq!(reset_epoch(r#"{"is_error": true}"#, NOW), None);
    }

    #[test]
    fn unrelated_error_text_is_not_rate_limited() {
        let line = r#"{"is_error": true, "result": "network unreachable|12345"}"#;
        assert_eq!(reset_epoch(line, NOW), None);
    }

    #[test]
    fn garbage_input_degrades_to_none() {
        assert_eq!(reset_epoch("", NOW), None);
        assert_eq!(reset_epoch("not json at all", NOW), None);
        assert_eq!(reset_epoch("{\"is_error\": \"yes\"}", NOW), None);
    }

    #[test]
    fn last_log_line_skips_trailing_newlines() {
        let path = temp_file("trailing", "first\nsecond\n\n");
        assert_eq!(last_log_line(&path), "second");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn last_log_line_handles_single_line_without_newline() {
        let path = temp_file("single", "only line");
        assert_eq!(last_log_line(&path), "only line");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn last_log_line_of_missing_file_is_empty() {
        let path = std::env::temp_dir().join("loopterm_test_does_not_exist");
        assert_eq!(last_log_line(&path), "");
    }

    #[test]
    fn last_log_line_of_empty_file_is_empty() {
        let path = temp_file("empty", "");
        assert_eq!(last_log_line(&path), "");
        let _ = fs::remove_file(path);
    }
}
