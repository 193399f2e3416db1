use std::process::Command;

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn loopterm_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_loopterm").expect("loopterm test binary not built")
}

#[test]
fn help_mentions_name_and_prompt_flag() {
    let output = Command::new(loopterm_bin())
        .arg("--help")
        .output()
        .expect("run loopterm --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("loopterm"));
    assert!(combined.contains("--prompt"));
    assert!(combined.contains("--continue"));
}

#[test]
fn missing_prompt_fails_with_usage() {
    let output = Command::new(loopterm_bin())
        .output()
        .expect("run loopterm without args");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("--prompt"));
}

#[test]
fn missing_claude_binary_fails_at_startup() {
    let output = Command::new(loopterm_bin())
        .args(["-p", "hello", "--claude-cmd", "loopterm-no-such-binary"])
        .output()
        .expect("run loopterm with bogus claude-cmd");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("not found in PATH"));
}
