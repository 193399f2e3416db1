use super::AppConfig;
use anyhow::{bail, Context, Result};
use std::{env, fs, path::PathBuf};

pub(super) const MAX_CLAUDE_ARGS: usize = 64;
pub(super) const MAX_CLAUDE_ARG_BYTES: usize = 4096;

/// Default append-log location in the platform temp directory.
pub fn default_output_path() -> PathBuf {
    env::temp_dir().join("loopterm_output.json")
}

impl AppConfig {
    /// Check CLI values before anything touches the terminal or spawns a
    /// subprocess.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            bail!("--prompt must not be empty");
        }
        if self.claude_cmd.trim().is_empty() {
            bail!("--claude-cmd must not be empty");
        }
        if self.claude_args.len() > MAX_CLAUDE_ARGS {
            bail!(
                "too many --claude-arg values ({}), maximum is {MAX_CLAUDE_ARGS}",
                self.claude_args.len()
            );
        }
        for arg in &self.claude_args {
            if arg.len() > MAX_CLAUDE_ARG_BYTES {
                bail!("--claude-arg value exceeds {MAX_CLAUDE_ARG_BYTES} bytes");
            }
            if arg.contains('\0') {
                bail!("--claude-arg value contains a NUL byte");
            }
        }
        Ok(())
    }

    /// Startup environment checks that must fail fast with exit code 1: the
    /// Claude binary must resolve on PATH and the output log must be
    /// creatable and appendable.
    pub fn check_environment(&self) -> Result<()> {
        if binary_on_path(&self.claude_cmd).is_none() {
            bail!(
                "'{}' command not found in PATH; is Claude Code installed?",
                self.claude_cmd
            );
        }
        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "cannot create output directory {} (set LOOPTERM_OUTPUT to a writable path)",
                        parent.display()
                    )
                })?;
            }
        }
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output_path)
            .with_context(|| {
                format!(
                    "cannot open output log {} for append (set LOOPTERM_OUTPUT to a writable path)",
                    self.output_path.display()
                )
            })?;
        Ok(())
    }
}

/// Resolve a command against PATH. Names containing a path separator are
/// checked directly.
pub fn binary_on_path(cmd: &str) -> Option<PathBuf> {
    let candidate = PathBuf::from(cmd);
    if candidate.components().count() > 1 {
        return candidate.is_file().then_some(candidate);
    }
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(cmd))
        .find(|full| full.is_file())
}
