//! Store dialects: how each supported credential store is driven.
//!
//! The session manager speaks in `StoreCommand`s; a `StoreKind` turns a
//! command into an argument vector for its CLI and knows how to read the
//! payloads that come back. A command with no counterpart in a store
//! (e.g. `lock` for a file database) maps to `None` and is handled
//! locally.

pub mod bitwarden;
pub mod keepassxc;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};
use crate::outcome::Payload;
use crate::vault::{Entry, EntryDetails};

/// Stderr text the stores print for an empty search.
pub const NO_RESULTS_MARKER: &str = "No results for that";

/// Failure text meaning the account session is gone.
pub const NOT_LOGGED_IN_MARKER: &str = "not logged in";

/// Failure text for a session-bearing call against a locked vault.
pub const VAULT_LOCKED_MARKER: &str = "vault is locked";

/// Failure texts asking for a second login factor.
pub const MFA_MARKERS: &[&str] = &["two-step", "code is required"];

/// Failure text for an entry without a TOTP seed.
pub const NO_TOTP_MARKER: &str = "no totp";

/// Supported credential stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Bitwarden CLI (`bw`): account login plus vault unlock.
    #[default]
    Bitwarden,
    /// KeePassXC CLI (`keepassxc-cli`): a local database file.
    Keepassxc,
}

/// Operations the session manager and query service need from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand<'a> {
    LoginCheck,
    UnlockCheck,
    Login {
        account: &'a str,
        mfa_code: Option<&'a str>,
    },
    Unlock,
    Lock,
    Logout,
    Sync,
    ListFolders,
    Search {
        query: &'a str,
    },
    GetItem {
        id: &'a str,
    },
    GetTotp {
        id: &'a str,
    },
    ConfigServer {
        url: &'a str,
    },
}

impl StoreKind {
    /// Binary used when the settings do not override it.
    pub fn default_binary(self) -> &'static str {
        match self {
            Self::Bitwarden => "bw",
            Self::Keepassxc => "keepassxc-cli",
        }
    }

    /// Whether the store has account-level login separate from unlock.
    pub fn has_accounts(self) -> bool {
        matches!(self, Self::Bitwarden)
    }

    /// Whether the session secret travels on stdin instead of `--session`.
    pub fn session_via_stdin(self) -> bool {
        matches!(self, Self::Keepassxc)
    }

    /// Whether the store is backed by a local database file.
    pub fn is_file_based(self) -> bool {
        matches!(self, Self::Keepassxc)
    }

    /// Build the argument vector for `cmd`, or `None` when the store has
    /// no such command.
    pub fn argv(self, cmd: &StoreCommand<'_>, database: Option<&Path>) -> Result<Option<Vec<String>>> {
        match self {
            Self::Bitwarden => Ok(bitwarden::argv(cmd)),
            Self::Keepassxc => {
                let db = database.ok_or_else(|| {
                    VaultError::ConfigError(
                        "database_path must be set when store = \"keepassxc\"".into(),
                    )
                })?;
                Ok(keepassxc::argv(cmd, db))
            }
        }
    }

    /// Session token carried in a successful login/unlock payload.
    ///
    /// File stores have no token; the caller keeps the passphrase instead.
    pub fn session_token(self, payload: &Payload) -> Option<String> {
        match self {
            Self::Bitwarden => bitwarden::session_token(payload),
            Self::Keepassxc => None,
        }
    }

    pub fn parse_folders(self, payload: &Payload) -> Result<HashMap<String, String>> {
        match self {
            Self::Bitwarden => bitwarden::parse_folders(payload),
            Self::Keepassxc => Ok(keepassxc::parse_folders(payload)),
        }
    }

    pub fn parse_entries(self, payload: &Payload) -> Result<Vec<Entry>> {
        match self {
            Self::Bitwarden => bitwarden::parse_entries(payload),
            Self::Keepassxc => Ok(keepassxc::parse_entries(payload)),
        }
    }

    /// Parse an item; the flag says whether a separate TOTP call is needed.
    pub fn parse_details(self, payload: &Payload) -> Result<(EntryDetails, bool)> {
        match self {
            Self::Bitwarden => bitwarden::parse_details(payload),
            Self::Keepassxc => Ok((keepassxc::parse_details(payload), true)),
        }
    }

    pub fn parse_totp(self, payload: &Payload) -> Option<String> {
        match self {
            Self::Bitwarden => bitwarden::parse_totp(payload),
            Self::Keepassxc => keepassxc::parse_totp(payload),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bitwarden => write!(f, "bitwarden"),
            Self::Keepassxc => write!(f, "keepassxc"),
        }
    }
}

impl FromStr for StoreKind {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bitwarden" | "bw" => Ok(Self::Bitwarden),
            "keepassxc" | "keepass" => Ok(Self::Keepassxc),
            other => Err(VaultError::ConfigError(format!(
                "unknown store '{other}' (supported: bitwarden, keepassxc)"
            ))),
        }
    }
}
