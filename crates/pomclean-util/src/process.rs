use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use crate::errors::PomcleanError;

/// A command line run as a child process, with its output captured.
///
/// The line is split on whitespace. There is no shell quoting.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

/// Captured result of an [`ExternalCommand`].
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ExternalCommand {
    /// `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
            cwd: None,
        })
    }

    /// Run in `dir` instead of the current directory.
    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Run to completion. A non-zero exit is not an error here; check
    /// [`CommandOutput::status`].
    pub fn run(&self) -> Result<CommandOutput, PomcleanError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        tracing::debug!(cwd = ?self.cwd, "Running {self}");
        let output = cmd.output()?;
        Ok(CommandOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl CommandOutput {
    /// The last `n` lines of stdout, joined with newlines.
    pub fn stdout_tail(&self, n: usize) -> String {
        let lines: Vec<&str> = self.stdout.lines().collect();
        let start = lines.len().saturating_sub(n);
        lines[start..].join("\n")
    }
}
