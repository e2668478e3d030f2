//! KeePassXC CLI (`keepassxc-cli`) dialect.
//!
//! The database passphrase is the session secret: it is piped on stdin
//! for every call. `-q` suppresses the "Enter password" prompt so stderr
//! only carries real errors. Output is plain text.

use std::collections::HashMap;
use std::path::Path;

use super::StoreCommand;
use crate::outcome::Payload;
use crate::vault::{CustomField, Entry, EntryDetails};

/// Attributes mapped onto `EntryDetails` fields or deliberately dropped.
const STANDARD_ATTRIBUTES: &[&str] = &["Title", "UserName", "Password", "URL", "Notes", "Uuid", "Tags"];

pub(super) fn argv(cmd: &StoreCommand<'_>, db: &Path) -> Option<Vec<String>> {
    let db = db.display().to_string();
    let args: Vec<String> = match cmd {
        // Executing the binary at all is the closest thing to a login check.
        StoreCommand::LoginCheck => vec!["--version".into()],
        StoreCommand::UnlockCheck | StoreCommand::Unlock | StoreCommand::Login { .. } => {
            vec!["ls".into(), "-q".into(), db]
        }
        StoreCommand::ListFolders => vec!["ls".into(), "-q".into(), "-R".into(), "-f".into(), db],
        StoreCommand::Search { query } => {
            vec!["locate".into(), "-q".into(), db, (*query).to_string()]
        }
        StoreCommand::GetItem { id } => {
            vec!["show".into(), "-q".into(), "-s".into(), db, (*id).to_string()]
        }
        StoreCommand::GetTotp { id } => {
            vec!["show".into(), "-q".into(), "-t".into(), db, (*id).to_string()]
        }
        StoreCommand::Lock
        | StoreCommand::Logout
        | StoreCommand::Sync
        | StoreCommand::ConfigServer { .. } => return None,
    };
    Some(args)
}

fn lines(payload: &Payload) -> impl Iterator<Item = &str> {
    payload
        .as_text()
        .unwrap_or_default()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
}

/// Group path of an entry path: `/Work/Sub/GitHub` -> `Work/Sub`.
fn parent_group(path: &str) -> Option<String> {
    let trimmed = path.trim_matches('/');
    trimmed
        .rsplit_once('/')
        .map(|(parent, _)| parent.to_string())
        .filter(|p| !p.is_empty())
}

/// Groups from `ls -R -f`: lines ending in `/`. Id and name are the path.
pub(super) fn parse_folders(payload: &Payload) -> HashMap<String, String> {
    lines(payload)
        .filter(|l| l.ends_with('/'))
        .map(|l| l.trim_matches('/').to_string())
        .filter(|g| !g.is_empty())
        .map(|g| (g.clone(), g))
        .collect()
}

/// Entries from `locate`: one absolute entry path per line.
pub(super) fn parse_entries(payload: &Payload) -> Vec<Entry> {
    lines(payload)
        .map(|path| Entry {
            id: path.to_string(),
            name: path
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or(path)
                .to_string(),
            folder_id: parent_group(path),
        })
        .collect()
}

/// A `Key: value` header line; attribute names never contain spaces.
fn attribute_line(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    valid.then(|| (key, value.strip_prefix(' ').unwrap_or(value)))
}

/// Attributes from `show -s`. Lines that are not `Key: value` continue the
/// previous attribute (multi-line notes).
pub(super) fn parse_details(payload: &Payload) -> EntryDetails {
    let mut attributes: Vec<(String, String)> = Vec::new();
    for line in payload.as_text().unwrap_or_default().lines() {
        match attribute_line(line) {
            Some((key, value)) => attributes.push((key.to_string(), value.to_string())),
            None => {
                if let Some((_, value)) = attributes.last_mut() {
                    value.push('\n');
                    value.push_str(line);
                }
            }
        }
    }

    let take = |name: &str| {
        attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
            .filter(|v| !v.is_empty())
    };

    EntryDetails {
        username: take("UserName"),
        password: take("Password"),
        uri: take("URL"),
        totp: None,
        custom_fields: attributes
            .iter()
            .filter(|(k, _)| !STANDARD_ATTRIBUTES.contains(&k.as_str()))
            .map(|(k, v)| CustomField {
                name: k.clone(),
                value: v.clone(),
                is_hidden: false,
            })
            .collect(),
    }
}

/// TOTP from `show -t`: the code is the last line printed.
pub(super) fn parse_totp(payload: &Payload) -> Option<String> {
    lines(payload).last().map(str::to_string)
}
