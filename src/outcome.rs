//! Response classifier: turns raw stdout/stderr into a `CliOutcome`.
//!
//! The credential store reports results inconsistently: JSON on stdout,
//! JSON on stderr, or a bare sentence on stderr, depending on the
//! subcommand and flags. Classification happens exactly once per
//! invocation; everything above this module matches on the tagged result
//! instead of re-inspecting streams.
//!
//! Order of precedence:
//! 1. stdout holding a JSON document
//! 2. stderr holding a JSON document
//! 3. non-empty stderr text (unstructured failure)
//! 4. non-empty stdout text (plain-text success)
//! 5. nothing at all (empty success)

use serde_json::Value;

use crate::errors::{Result, VaultError};
use crate::invoker::RawOutput;

/// Successful response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Json(Value),
    Text(String),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Tagged result of one external invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum CliOutcome {
    Success(Payload),
    /// The store answered with a JSON envelope whose success flag is false.
    StructuredFailure(String),
    /// The store printed plain text on stderr.
    UnstructuredFailure(String),
    /// The store could not be started (or reached).
    ToolNotFound(String),
}

impl CliOutcome {
    /// Classify the result of `Invoker::invoke`.
    ///
    /// `ToolNotFound` becomes an outcome so callers can match on it;
    /// any other invocation error is propagated.
    pub fn from_invocation(result: Result<RawOutput>) -> Result<Self> {
        match result {
            Ok(raw) => classify(&raw),
            Err(VaultError::ToolNotFound(target)) => Ok(Self::ToolNotFound(target)),
            Err(e) => Err(e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Failure text for either failure shape.
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Self::StructuredFailure(m) | Self::UnstructuredFailure(m) => Some(m),
            _ => None,
        }
    }

    /// Case-insensitive substring test on the failure text.
    pub fn failure_contains(&self, needle: &str) -> bool {
        self.failure_message()
            .is_some_and(|m| m.to_lowercase().contains(&needle.to_lowercase()))
    }

    /// Unwrap the success payload, turning failures into errors.
    pub fn into_payload(self) -> Result<Payload> {
        match self {
            Self::Success(payload) => Ok(payload),
            Self::StructuredFailure(m) | Self::UnstructuredFailure(m) => {
                Err(VaultError::CliError(m))
            }
            Self::ToolNotFound(target) => Err(VaultError::ToolNotFound(target)),
        }
    }
}

/// Classify one invocation's raw output.
///
/// A stream that looks like JSON but does not parse yields a
/// `VaultError::CliError` rather than a guess.
pub fn classify(raw: &RawOutput) -> Result<CliOutcome> {
    let stdout = raw.stdout.trim();
    let stderr = raw.stderr.trim();

    if looks_structured(stdout) {
        return interpret_json(parse_json(stdout, "stdout")?);
    }

    if looks_structured(stderr) {
        return interpret_json(parse_json(stderr, "stderr")?);
    }

    if !stderr.is_empty() {
        return Ok(CliOutcome::UnstructuredFailure(stderr.to_string()));
    }

    if !stdout.is_empty() {
        return Ok(CliOutcome::Success(Payload::Text(stdout.to_string())));
    }

    Ok(CliOutcome::Success(Payload::Empty))
}

fn looks_structured(text: &str) -> bool {
    text.starts_with('{') || text.starts_with('[')
}

fn parse_json(text: &str, stream: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| {
        VaultError::CliError(format!(
            "unparsable response from the credential store on {stream}: {e}"
        ))
    })
}

/// Apply the `{"success": .., "message": .., "data": ..}` envelope.
///
/// Documents without a `success` flag are plain data and count as success.
fn interpret_json(value: Value) -> Result<CliOutcome> {
    let Some(flag) = value.get("success") else {
        return Ok(CliOutcome::Success(Payload::Json(value)));
    };

    if flag.as_bool().unwrap_or(false) {
        let payload = match value.get("data") {
            None | Some(Value::Null) => Payload::Empty,
            Some(data) => Payload::Json(data.clone()),
        };
        return Ok(CliOutcome::Success(payload));
    }

    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("the credential store reported an unspecified error")
        .to_string();
    Ok(CliOutcome::StructuredFailure(message))
}
