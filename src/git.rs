//! Git command runner for phabstack.
//!
//! Provides a wrapper around git commands with captured stdout/stderr and
//! structured error handling. All git process invocations go through here.

use crate::error::{PhabError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Result of a successful git command execution.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    /// Returns true if stdout is empty.
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty()
    }

    /// Returns stdout lines as a vector.
    pub fn lines(&self) -> Vec<&str> {
        if self.stdout.is_empty() {
            Vec::new()
        } else {
            self.stdout.lines().collect()
        }
    }
}

/// Run a git command and return its trimmed textual output.
///
/// # Returns
///
/// * `Ok(GitOutput)` - On successful execution (exit code 0)
/// * `Err(PhabError::VcsError)` - On spawn failure or non-zero exit code
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<GitOutput> {
    run_git_env(cwd, args, &[])
}

/// Run a git command with extra environment variables set.
///
/// Used where git takes its input from the environment only, such as the
/// author identity of `git commit-tree`.
pub fn run_git_env<P: AsRef<Path>>(
    cwd: P,
    args: &[&str],
    envs: &[(&str, &str)],
) -> Result<GitOutput> {
    let output = spawn_git(cwd.as_ref(), args, envs)?;
    let git_output = GitOutput::from_output(&output);

    if output.status.success() {
        Ok(git_output)
    } else {
        Err(failure(args, &output, &git_output))
    }
}

/// Run a git command and return stdout untouched.
///
/// Blob contents and diff text must keep their exact bytes, including
/// trailing newlines, so they never go through [`run_git`].
pub fn run_git_bytes<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<Vec<u8>> {
    let output = spawn_git(cwd.as_ref(), args, &[])?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        let git_output = GitOutput::from_output(&output);
        Err(failure(args, &output, &git_output))
    }
}

fn spawn_git(cwd: &Path, args: &[&str], envs: &[(&str, &str)]) -> Result<Output> {
    Command::new("git")
        .current_dir(cwd)
        .args(args)
        .envs(envs.iter().copied())
        .output()
        .map_err(|e| {
            PhabError::VcsError(format!(
                "failed to execute git {}: {}",
                args.first().unwrap_or(&""),
                e
            ))
        })
}

fn failure(args: &[&str], output: &Output, git_output: &GitOutput) -> PhabError {
    let exit_code = output.status.code().unwrap_or(-1);
    let error_msg = if git_output.stderr.is_empty() {
        &git_output.stdout
    } else {
        &git_output.stderr
    };

    PhabError::VcsError(format!(
        "git {} failed (exit code {}): {}",
        args.first().unwrap_or(&""),
        exit_code,
        error_msg
    ))
}

/// Get the repository root directory using `git rev-parse --show-toplevel`.
///
/// "Not inside a repository" is reported as a `UserError` (exit 1) rather than
/// a VCS failure, since it is almost always a wrong working directory.
pub fn get_repo_root<P: AsRef<Path>>(cwd: P) -> Result<PathBuf> {
    let output = Command::new("git")
        .current_dir(cwd.as_ref())
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .map_err(|e| {
            PhabError::UserError(format!("failed to execute git: {} (is git installed?)", e))
        })?;

    let git_output = GitOutput::from_output(&output);

    if output.status.success() {
        return Ok(PathBuf::from(&git_output.stdout));
    }

    let stderr = &git_output.stderr;
    if stderr.contains("not a git repository") || stderr.contains("fatal:") {
        Err(PhabError::UserError(
            "not inside a git repository. Run this command from within a git repository."
                .to_string(),
        ))
    } else {
        Err(PhabError::UserError(format!(
            "git command failed: {}",
            if stderr.is_empty() {
                &git_output.stdout
            } else {
                stderr
            }
        )))
    }
}
