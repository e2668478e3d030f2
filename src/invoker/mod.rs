//! Invokers: how an argument vector reaches the credential store.
//!
//! Every backend implements the same contract: take an argument vector
//! and an optional stdin payload, hand back the raw stdout/stderr text.
//! Launch failures become `VaultError::ToolNotFound`; a process that ran
//! but exited non-zero is NOT an error here, its output goes to the
//! response classifier.

#[cfg(feature = "http-service")]
pub mod http;
pub mod process;

#[cfg(feature = "http-service")]
pub use http::HttpInvoker;
pub use process::ProcessInvoker;

use crate::errors::Result;

/// Raw text captured from one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: String,
}

impl RawOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self::new(stdout, "")
    }

    pub fn stderr(stderr: impl Into<String>) -> Self {
        Self::new("", stderr)
    }
}

/// Executes the external credential store.
pub trait Invoker {
    /// Run the store with `args`, writing `stdin` (if any) before reading output.
    fn invoke(&self, args: &[String], stdin: Option<&str>) -> Result<RawOutput>;

    /// Human-readable name of what is being invoked (binary or endpoint).
    fn target(&self) -> String;
}

impl<T: Invoker + ?Sized> Invoker for Box<T> {
    fn invoke(&self, args: &[String], stdin: Option<&str>) -> Result<RawOutput> {
        (**self).invoke(args, stdin)
    }

    fn target(&self) -> String {
        (**self).target()
    }
}

/// Copy of `args` safe to log: the value after `--session` is masked.
pub fn redact_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut mask_next = false;
    for arg in args {
        if mask_next {
            out.push("<redacted>".to_string());
            mask_next = false;
        } else {
            mask_next = arg == "--session";
            out.push(arg.clone());
        }
    }
    out
}
