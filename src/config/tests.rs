use super::*;
use clap::Parser;

fn parse(args: &[&str]) -> AppConfig {
    AppConfig::parse_from(args)
}

#[test]
fn prompt_is_required() {
    assert!(AppConfig::try_parse_from(["loopterm"]).is_err());
}

#[test]
fn continue_defaults_off() {
    let config = parse(&["loopterm", "-p", "do the thing"]);
    assert!(!config.continue_session);
    let config = parse(&["loopterm", "-p", "do the thing", "--continue"]);
    assert!(config.continue_session);
}

#[test]
fn claude_args_are_collected_in_order() {
    let config = parse(&[
        "loopterm",
        "-p",
        "x",
        "--claude-arg",
        "--model",
        "--claude-arg",
        "opus",
    ]);
    assert_eq!(config.claude_args, vec!["--model", "opus"]);
}

#[test]
fn validate_rejects_blank_prompt() {
    let config = parse(&["loopterm", "-p", "   "]);
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_blank_claude_cmd() {
    let mut config = parse(&["loopterm", "-p", "x"]);
    config.claude_cmd = " ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_oversized_claude_arg() {
    let mut config = parse(&["loopterm", "-p", "x"]);
    config.claude_args = vec!["y".repeat(validation::MAX_CLAUDE_ARG_BYTES + 1)];
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_too_many_claude_args() {
    let mut config = parse(&["loopterm", "-p", "x"]);
    config.claude_args = vec!["a".to_string(); validation::MAX_CLAUDE_ARGS + 1];
    assert!(config.validate().is_err());
}

#[test]
fn validate_accepts_plain_config() {
    let config = parse(&["loopterm", "-p", "keep the tests green"]);
    assert!(config.validate().is_ok());
}

#[cfg(unix)]
#[test]
fn binary_on_path_finds_sh() {
    assert!(binary_on_path("sh").is_some());
    assert!(binary_on_path("definitely-not-a-real-binary-loopterm").is_none());
}
