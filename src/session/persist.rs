//! Session-persistence hook.
//!
//! After a successful login or unlock the raw token is piped to a
//! user-configured shell command (for example one that exports it into a
//! keyring or a tmux environment). The hook is best-effort.

use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

use crate::errors::{Result, VaultError};

/// Run `command` through `sh -c` with `token` on stdin.
pub fn run_hook(command: &str, token: &str) -> Result<()> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut pipe) = child.stdin.take() {
        if let Err(e) = pipe.write_all(token.as_bytes()) {
            if e.kind() != ErrorKind::BrokenPipe {
                return Err(VaultError::Io(e));
            }
        }
    }

    let output = child.wait_with_output()?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let status = output
        .status
        .code()
        .map_or_else(|| "signal".to_string(), |c| c.to_string());
    Err(VaultError::CommandFailed(if stderr.is_empty() {
        format!("session persist command exited with status {status}")
    } else {
        format!("session persist command exited with status {status}: {stderr}")
    }))
}
