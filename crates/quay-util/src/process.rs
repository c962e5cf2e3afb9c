//! Process execution helpers for quay.
//!
//! Two modes: [`run_command`] captures output for probing and parsing,
//! [`run_passthrough`] hands the terminal to the child so its diagnostics
//! reach the operator untouched.

use std::process::{Child, Command, ExitStatus};

use crate::error::UtilError;

/// Structured output from a command execution.
#[derive(Debug)]
pub struct CommandOutput {
    /// Standard output as a string.
    pub stdout: String,
    /// Standard error as a string (empty if stderr was inherited).
    pub stderr: String,
    /// Whether the command exited successfully.
    pub success: bool,
    /// Exit code normalized by [`exit_code`].
    pub exit_code: i32,
}

/// Render a command as a shell-like line for logs and error messages.
pub fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Map an exit status to a process exit code.
///
/// A child killed by a signal maps to `128 + signal` on Unix, the shell
/// convention; anything else without a code maps to 1.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128_i32.saturating_add(signal);
        }
    }
    1
}

/// Execute a command and capture its output.
///
/// Stdio settings already applied to `cmd` (e.g. an inherited stderr) are
/// respected; unset streams are captured.
///
/// # Errors
/// Returns an error if the command cannot be spawned (e.g. binary not found).
/// A non-zero exit code is **not** an error; check `CommandOutput::success` instead.
pub fn run_command(cmd: &mut Command) -> Result<CommandOutput, UtilError> {
    let program = describe(cmd);
    tracing::debug!(command = %program, "capturing");

    let output = cmd
        .output()
        .map_err(|source| UtilError::CommandExec { program, source })?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
        exit_code: exit_code(output.status),
    })
}

/// Execute a command with inherited stdio and return its exit code.
///
/// The child is owned by a [`ChildGuard`] for its whole lifetime, so an early
/// return or unwind never leaves an orphaned process behind.
///
/// # Errors
/// Returns an error if the command cannot be spawned or waited on.
/// A non-zero exit code is **not** an error.
pub fn run_passthrough(cmd: &mut Command) -> Result<i32, UtilError> {
    let program = describe(cmd);
    tracing::debug!(command = %program, "spawning");

    let child = cmd.spawn().map_err(|source| UtilError::CommandExec {
        program: program.clone(),
        source,
    })?;
    let status = ChildGuard::new(child)
        .wait()
        .map_err(|source| UtilError::CommandExec { program, source })?;

    let code = exit_code(status);
    tracing::debug!(code, "child exited");
    Ok(code)
}

/// Owns a running child process; kills and reaps it on drop unless it was
/// waited on.
#[derive(Debug)]
pub struct ChildGuard {
    child: Option<Child>,
}

impl ChildGuard {
    /// Take ownership of a spawned child.
    pub fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    /// OS process id of the guarded child, if still held.
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Wait for the child to exit, consuming the guard.
    ///
    /// # Errors
    /// Returns an error if waiting fails; the child is then killed and reaped.
    pub fn wait(mut self) -> std::io::Result<ExitStatus> {
        let Some(mut child) = self.child.take() else {
            return Err(std::io::Error::other("child already reaped"));
        };
        match child.wait() {
            Ok(status) => Ok(status),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(e)
            }
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
