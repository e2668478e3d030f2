//! Bitwarden CLI (`bw`) dialect.
//!
//! Every command asks for the JSON response envelope (`--response`) and
//! refuses interactive prompts (`--nointeraction`). Passphrases are read
//! from stdin through `--passwordfile /dev/stdin`; the session token is
//! appended by the session manager as `--session <token>`.

use std::collections::HashMap;

use serde_json::Value;

use super::StoreCommand;
use crate::errors::{Result, VaultError};
use crate::outcome::Payload;
use crate::vault::{CustomField, Entry, EntryDetails};

/// Bitwarden custom field type for hidden values.
const FIELD_TYPE_HIDDEN: u64 = 1;

/// Authenticator-app two-step method.
const MFA_METHOD_AUTHENTICATOR: &str = "0";

pub(super) fn argv(cmd: &StoreCommand<'_>) -> Option<Vec<String>> {
    let mut args: Vec<String> = match cmd {
        StoreCommand::LoginCheck => vec!["login".into(), "--check".into()],
        StoreCommand::UnlockCheck => vec!["unlock".into(), "--check".into()],
        StoreCommand::Login { account, mfa_code } => {
            let mut args = vec![
                "login".to_string(),
                (*account).to_string(),
                "--passwordfile".into(),
                "/dev/stdin".into(),
            ];
            if let Some(code) = mfa_code {
                args.extend([
                    "--method".to_string(),
                    MFA_METHOD_AUTHENTICATOR.to_string(),
                    "--code".to_string(),
                    (*code).to_string(),
                ]);
            }
            args
        }
        StoreCommand::Unlock => vec![
            "unlock".into(),
            "--passwordfile".into(),
            "/dev/stdin".into(),
        ],
        StoreCommand::Lock => vec!["lock".into()],
        StoreCommand::Logout => vec!["logout".into()],
        StoreCommand::Sync => vec!["sync".into()],
        StoreCommand::ListFolders => vec!["list".into(), "folders".into()],
        StoreCommand::Search { query } => vec![
            "list".into(),
            "items".into(),
            "--search".into(),
            (*query).to_string(),
        ],
        StoreCommand::GetItem { id } => vec!["get".into(), "item".into(), (*id).to_string()],
        StoreCommand::GetTotp { id } => vec!["get".into(), "totp".into(), (*id).to_string()],
        StoreCommand::ConfigServer { url } => {
            vec!["config".into(), "server".into(), (*url).to_string()]
        }
    };
    args.extend(["--response".to_string(), "--nointeraction".to_string()]);
    Some(args)
}

/// Items of a list payload: either `{"object": "list", "data": [..]}` or a bare array.
fn list_items(payload: &Payload) -> Result<&[Value]> {
    let value = match payload {
        Payload::Empty => return Ok(&[]),
        Payload::Json(v) => v,
        Payload::Text(_) => return Err(unexpected("a list")),
    };

    value
        .as_array()
        .or_else(|| value.get("data").and_then(Value::as_array))
        .map(Vec::as_slice)
        .ok_or_else(|| unexpected("a list"))
}

fn unexpected(what: &str) -> VaultError {
    VaultError::CliError(format!("unexpected response from bw: expected {what}"))
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Token from `login`/`unlock`: `data.raw` in the envelope, or raw text.
pub(super) fn session_token(payload: &Payload) -> Option<String> {
    match payload {
        Payload::Json(v) => str_field(v, "raw"),
        Payload::Text(t) => Some(t.trim().to_string()).filter(|t| !t.is_empty()),
        Payload::Empty => None,
    }
}

pub(super) fn parse_folders(payload: &Payload) -> Result<HashMap<String, String>> {
    Ok(list_items(payload)?
        .iter()
        // The implicit "No Folder" entry has a null id.
        .filter_map(|f| Some((str_field(f, "id")?, str_field(f, "name")?)))
        .collect())
}

pub(super) fn parse_entries(payload: &Payload) -> Result<Vec<Entry>> {
    list_items(payload)?
        .iter()
        .map(|item| {
            Ok(Entry {
                id: str_field(item, "id").ok_or_else(|| unexpected("items with an id"))?,
                name: str_field(item, "name").unwrap_or_default(),
                folder_id: str_field(item, "folderId"),
            })
        })
        .collect()
}

pub(super) fn parse_details(payload: &Payload) -> Result<(EntryDetails, bool)> {
    let item = payload.as_json().ok_or_else(|| unexpected("an item"))?;
    let login = item.get("login").filter(|l| l.is_object());

    let mut details = EntryDetails::default();
    let mut has_totp = false;

    if let Some(login) = login {
        details.username = str_field(login, "username");
        details.password = str_field(login, "password");
        details.uri = login
            .get("uris")
            .and_then(Value::as_array)
            .and_then(|uris| uris.first())
            .and_then(|u| str_field(u, "uri"));
        has_totp = str_field(login, "totp").is_some();
    }

    if let Some(fields) = item.get("fields").and_then(Value::as_array) {
        details.custom_fields = fields
            .iter()
            .map(|f| CustomField {
                name: str_field(f, "name").unwrap_or_default(),
                value: match f.get("value") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                },
                is_hidden: f.get("type").and_then(Value::as_u64) == Some(FIELD_TYPE_HIDDEN),
            })
            .collect();
    }

    Ok((details, has_totp))
}

/// TOTP code: `data.data` in the envelope (`{"object": "string"}`), or raw text.
pub(super) fn parse_totp(payload: &Payload) -> Option<String> {
    match payload {
        Payload::Json(v) => str_field(v, "data"),
        Payload::Text(t) => Some(t.trim().to_string()).filter(|t| !t.is_empty()),
        Payload::Empty => None,
    }
}
