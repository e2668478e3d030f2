//! Local HTTP backend for `bw serve`.
//!
//! Behind the `http-service` feature flag. Maps the Bitwarden CLI
//! argument vectors onto the REST API exposed by `bw serve` so the rest
//! of the crate can keep talking in argument vectors. Response bodies are
//! returned as stdout; they carry the same `success`/`message` envelope
//! as `bw --response`.

use serde_json::{json, Value};
use ureq::Agent;

use super::{redact_args, Invoker, RawOutput};
use crate::errors::{Result, VaultError};

/// Talks to a `bw serve` instance on a loopback address.
pub struct HttpInvoker {
    base_url: String,
    agent: Agent,
}

/// Argument vector split into the parts the REST mapping cares about.
#[derive(Debug, Default, PartialEq)]
struct ParsedArgs {
    positional: Vec<String>,
    search: Option<String>,
    check: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        let mut parsed = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--search" => parsed.search = iter.next().cloned(),
                // Flags with a value the service does not use.
                "--session" | "--code" | "--method" | "--passwordfile" => {
                    iter.next();
                }
                "--check" => parsed.check = true,
                flag if flag.starts_with("--") => {}
                _ => parsed.positional.push(arg.clone()),
            }
        }
        parsed
    }
}

impl HttpInvoker {
    pub fn new(base_url: impl Into<String>) -> Self {
        let config = Agent::config_builder().http_status_as_error(false).build();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent: Agent::new_with_config(config),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn get(&self, path: &str, search: Option<&str>) -> Result<String> {
        let mut request = self.agent.get(self.url(path));
        if let Some(q) = search {
            request = request.query("search", q);
        }
        let mut response = request.call().map_err(|e| self.transport_error(e))?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|e| self.transport_error(e))
    }

    fn post(&self, path: &str, body: Option<Value>) -> Result<String> {
        let request = self.agent.post(self.url(path));
        let mut response = match body {
            Some(body) => request.send_json(&body),
            None => request.send_empty(),
        }
        .map_err(|e| self.transport_error(e))?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, err: ureq::Error) -> VaultError {
        match err {
            ureq::Error::Io(_) | ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => {
                VaultError::ToolNotFound(self.base_url.clone())
            }
            other => VaultError::Transport(other.to_string()),
        }
    }

    /// Answer `login --check` / `unlock --check` from `GET /status`.
    fn status_check(&self, want_unlocked: bool) -> Result<String> {
        let body = self.get("status", None)?;
        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| VaultError::CliError(format!("unparsable status response: {e}")))?;
        let status = parsed
            .pointer("/data/template/status")
            .and_then(Value::as_str)
            .unwrap_or("unauthenticated");

        let ok = if want_unlocked {
            status == "unlocked"
        } else {
            status != "unauthenticated"
        };

        Ok(if ok {
            json!({ "success": true }).to_string()
        } else if want_unlocked {
            json!({ "success": false, "message": "Vault is locked." }).to_string()
        } else {
            json!({ "success": false, "message": "You are not logged in." }).to_string()
        })
    }
}

impl Invoker for HttpInvoker {
    fn invoke(&self, args: &[String], stdin: Option<&str>) -> Result<RawOutput> {
        tracing::debug!(
            url = %self.base_url,
            args = ?redact_args(args),
            "calling local vault service"
        );

        let parsed = ParsedArgs::parse(args);
        let positional: Vec<&str> = parsed.positional.iter().map(String::as_str).collect();

        let body = match positional.as_slice() {
            ["status"] => self.get("status", None)?,
            ["login"] if parsed.check => self.status_check(false)?,
            ["unlock"] if parsed.check => self.status_check(true)?,
            ["unlock"] => self.post(
                "unlock",
                Some(json!({ "password": stdin.unwrap_or_default() })),
            )?,
            ["lock"] => self.post("lock", None)?,
            ["sync"] => self.post("sync", None)?,
            ["list", "folders"] => self.get("list/object/folders", None)?,
            ["list", "items"] => self.get("list/object/items", parsed.search.as_deref())?,
            ["get", "item", id] => self.get(&format!("object/item/{id}"), None)?,
            ["get", "totp", id] => self.get(&format!("object/totp/{id}"), None)?,
            other => json!({
                "success": false,
                "message": format!(
                    "`{}` is not supported by the local vault service",
                    other.join(" ")
                ),
            })
            .to_string(),
        };

        Ok(RawOutput::stdout(body))
    }

    fn target(&self) -> String {
        self.base_url.clone()
    }
}
