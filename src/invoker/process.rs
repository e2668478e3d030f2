//! One-shot subprocess backend.
//!
//! Uses `Command::new()` which executes the binary directly without a
//! shell, so query text and item ids never get interpreted.

use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::{redact_args, Invoker, RawOutput};
use crate::errors::{Result, VaultError};

/// Spawns the credential store binary for every call.
pub struct ProcessInvoker {
    binary: PathBuf,
    /// Extra environment for the child (e.g. `BW_NOINTERACTION`).
    envs: Vec<(String, String)>,
}

impl ProcessInvoker {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            envs: Vec::new(),
        }
    }

    /// Set an environment variable on every spawned child.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

impl Invoker for ProcessInvoker {
    fn invoke(&self, args: &[String], stdin: Option<&str>) -> Result<RawOutput> {
        tracing::debug!(
            binary = %self.binary.display(),
            args = ?redact_args(args),
            stdin_bytes = stdin.map_or(0, str::len),
            "invoking credential store"
        );

        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                VaultError::ToolNotFound(self.binary.display().to_string())
            }
            _ => VaultError::Io(e),
        })?;

        if let Some(payload) = stdin {
            // Dropping the handle closes the pipe so the child sees EOF.
            if let Some(mut pipe) = child.stdin.take() {
                if let Err(e) = pipe.write_all(payload.as_bytes()) {
                    // A child that exits without reading stdin is not our failure.
                    if e.kind() != ErrorKind::BrokenPipe {
                        return Err(VaultError::Io(e));
                    }
                }
            }
        }

        let output = child.wait_with_output()?;

        tracing::debug!(
            binary = %self.binary.display(),
            status = ?output.status.code(),
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "credential store exited"
        );

        Ok(RawOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn target(&self) -> String {
        self.binary.display().to_string()
    }
}
