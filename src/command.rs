//! External command execution
//!
//! Everything the tool does to a repository goes through [`CommandRunner`], so
//! inspection and sync logic can be exercised against scripted runners.

use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

use crate::error::CommandError;

/// Runs a single shell command in a working directory
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Execute `command` inside `dir` and return its trimmed output.
    ///
    /// Stdout is preferred; when it is empty the trimmed stderr is returned
    /// instead (git reports some successful operations there).
    async fn run(&self, command: &str, dir: &Path) -> Result<String, CommandError>;
}

/// Runs commands through the platform shell
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }

    fn shell_command(command: &str) -> AsyncCommand {
        #[cfg(windows)]
        {
            let mut cmd = AsyncCommand::new("cmd");
            cmd.args(["/C", command]);
            cmd
        }

        #[cfg(not(windows))]
        {
            let mut cmd = AsyncCommand::new("sh");
            cmd.args(["-c", command]);
            cmd
        }
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, dir: &Path) -> Result<String, CommandError> {
        debug!("Running `{}` in {}", command, dir.display());

        let output = Self::shell_command(command)
            .current_dir(dir)
            .output()
            .await
            .map_err(|e| CommandError::new(command, e.to_string()))?;

        collect_output(command, output)
    }
}

/// Quote `arg` so the shell used by [`ShellRunner`] sees it as one literal word.
///
/// Needed for anything interpolated into a command line that did not come from
/// this crate, such as branch names.
pub fn quote(arg: &str) -> Result<String, CommandError> {
    if cfg!(windows) {
        return Ok(format!("\"{}\"", arg.replace('"', "\"\"")));
    }

    shlex::try_quote(arg)
        .map(|quoted| quoted.into_owned())
        .map_err(|e| CommandError::new(arg, e.to_string()))
}

/// Turn a finished process into trimmed text or a [`CommandError`]
fn collect_output(command: &str, output: Output) -> Result<String, CommandError> {
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !output.status.success() {
        let message = if stderr.is_empty() {
            format!("exited with {}", output.status)
        } else {
            stderr
        };
        return Err(CommandError::new(command, message));
    }

    if stdout.is_empty() {
        Ok(stderr)
    } else {
        Ok(stdout)
    }
}
