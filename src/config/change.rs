//! Runtime configuration changes and the session state they invalidate.
//!
//! `transition` is pure: it computes the new settings and the list of
//! invalidation actions, and `SessionManager::apply_config_change`
//! carries the actions out against the live session.

use std::fmt;
use std::str::FromStr;

use super::settings::{FolderRefresh, Settings, Transport};
use crate::errors::{Result, VaultError};

/// A settable configuration key, spelled in kebab-case on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    Store,
    Transport,
    Binary,
    ServiceUrl,
    DatabasePath,
    ServerUrl,
    AccountId,
    MfaEnabled,
    MaxResultItems,
    InactivityTimeout,
    SessionPersistCommand,
    FolderRefresh,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 12] = [
        Self::Store,
        Self::Transport,
        Self::Binary,
        Self::ServiceUrl,
        Self::DatabasePath,
        Self::ServerUrl,
        Self::AccountId,
        Self::MfaEnabled,
        Self::MaxResultItems,
        Self::InactivityTimeout,
        Self::SessionPersistCommand,
        Self::FolderRefresh,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Transport => "transport",
            Self::Binary => "binary",
            Self::ServiceUrl => "service-url",
            Self::DatabasePath => "database-path",
            Self::ServerUrl => "server-url",
            Self::AccountId => "account-id",
            Self::MfaEnabled => "mfa-enabled",
            Self::MaxResultItems => "max-result-items",
            Self::InactivityTimeout => "inactivity-timeout",
            Self::SessionPersistCommand => "session-persist-command",
            Self::FolderRefresh => "folder-refresh",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace('_', "-").to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                VaultError::ConfigError(format!(
                    "unknown config key '{s}' (known keys: {})",
                    known.join(", ")
                ))
            })
    }
}

/// Session state a configuration change invalidates, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    /// Log out with the previous settings before they are replaced.
    LogoutPrevious,
    /// Drop the token and the inactivity deadline.
    ClearSession,
    ClearFolders,
    /// Point the store at a new server (after the settings are replaced).
    ConfigureServer(String),
}

/// Result of applying one key change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigTransition {
    pub settings: Settings,
    pub actions: Vec<Invalidation>,
}

/// Compute the settings after `key = value` and what it invalidates.
///
/// Setting a key to the value it already has yields no actions.
pub fn transition(old: &Settings, key: ConfigKey, value: &str) -> Result<ConfigTransition> {
    let value = value.trim();
    let mut new = old.clone();

    match key {
        ConfigKey::Store => new.store = value.parse()?,
        ConfigKey::Transport => new.transport = parse_transport(value)?,
        ConfigKey::Binary => new.binary = optional(value),
        ConfigKey::ServiceUrl => new.service_url = value.to_string(),
        ConfigKey::DatabasePath => new.database_path = optional(value),
        ConfigKey::ServerUrl => new.server_url = value.to_string(),
        ConfigKey::AccountId => new.account_id = value.to_string(),
        ConfigKey::MfaEnabled => new.mfa_enabled = parse_bool(key, value)?,
        ConfigKey::MaxResultItems => new.max_result_items = parse_number(key, value)?,
        ConfigKey::InactivityTimeout => new.inactivity_timeout_secs = parse_number(key, value)?,
        ConfigKey::SessionPersistCommand => new.session_persist_command = optional(value),
        ConfigKey::FolderRefresh => new.folder_refresh = parse_folder_refresh(value)?,
    }

    if new == *old {
        return Ok(ConfigTransition {
            settings: new,
            actions: Vec::new(),
        });
    }

    let actions = match key {
        ConfigKey::ServerUrl => {
            let mut actions = vec![
                Invalidation::LogoutPrevious,
                Invalidation::ClearSession,
                Invalidation::ClearFolders,
            ];
            if !new.server_url.is_empty() {
                actions.push(Invalidation::ConfigureServer(new.server_url.clone()));
            }
            actions
        }
        ConfigKey::AccountId => vec![
            Invalidation::LogoutPrevious,
            Invalidation::ClearSession,
            Invalidation::ClearFolders,
        ],
        ConfigKey::InactivityTimeout => {
            vec![Invalidation::ClearSession, Invalidation::ClearFolders]
        }
        // A different database or tool means the current secret is meaningless.
        ConfigKey::DatabasePath
        | ConfigKey::Store
        | ConfigKey::Transport
        | ConfigKey::Binary
        | ConfigKey::ServiceUrl => vec![Invalidation::ClearSession, Invalidation::ClearFolders],
        ConfigKey::MfaEnabled
        | ConfigKey::MaxResultItems
        | ConfigKey::SessionPersistCommand
        | ConfigKey::FolderRefresh => Vec::new(),
    };

    Ok(ConfigTransition {
        settings: new,
        actions,
    })
}

fn optional(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_bool(key: ConfigKey, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(VaultError::ConfigError(format!(
            "{key} expects true or false, got '{value}'"
        ))),
    }
}

fn parse_number<T: FromStr>(key: ConfigKey, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        VaultError::ConfigError(format!(
            "{key} expects a non-negative number, got '{value}'"
        ))
    })
}

fn parse_transport(value: &str) -> Result<Transport> {
    match value.to_lowercase().as_str() {
        "process" => Ok(Transport::Process),
        "http" => Ok(Transport::Http),
        _ => Err(VaultError::ConfigError(format!(
            "transport must be 'process' or 'http', got '{value}'"
        ))),
    }
}

fn parse_folder_refresh(value: &str) -> Result<FolderRefresh> {
    match value.to_lowercase().as_str() {
        "on-unlock" => Ok(FolderRefresh::OnUnlock),
        "sync-only" => Ok(FolderRefresh::SyncOnly),
        _ => Err(VaultError::ConfigError(format!(
            "folder-refresh must be 'on-unlock' or 'sync-only', got '{value}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_parse_in_either_case_style() {
        assert_eq!(
            "server-url".parse::<ConfigKey>().unwrap(),
            ConfigKey::ServerUrl
        );
        assert_eq!(
            "inactivity_timeout".parse::<ConfigKey>().unwrap(),
            ConfigKey::InactivityTimeout
        );
        assert!("colour".parse::<ConfigKey>().is_err());
    }

    #[test]
    fn server_url_change_logs_out_then_reconfigures() {
        let old = Settings::default();
        let t = transition(&old, ConfigKey::ServerUrl, "https://vault.example.com").unwrap();
        assert_eq!(t.settings.server_url, "https://vault.example.com");
        assert_eq!(
            t.actions,
            vec![
                Invalidation::LogoutPrevious,
                Invalidation::ClearSession,
                Invalidation::ClearFolders,
                Invalidation::ConfigureServer("https://vault.example.com".into()),
            ]
        );
    }

    #[test]
    fn clearing_server_url_skips_reconfigure() {
        let old = Settings {
            server_url: "https://vault.example.com".into(),
            ..Settings::default()
        };
        let t = transition(&old, ConfigKey::ServerUrl, "").unwrap();
        assert!(!t
            .actions
            .iter()
            .any(|a| matches!(a, Invalidation::ConfigureServer(_))));
        assert_eq!(t.actions[0], Invalidation::LogoutPrevious);
    }

    #[test]
    fn account_change_logs_out() {
        let t = transition(&Settings::default(), ConfigKey::AccountId, "me@example.com").unwrap();
        assert_eq!(t.actions[0], Invalidation::LogoutPrevious);
        assert!(t.actions.contains(&Invalidation::ClearFolders));
    }

    #[test]
    fn timeout_change_clears_session_and_folders_without_logout() {
        let t = transition(&Settings::default(), ConfigKey::InactivityTimeout, "120").unwrap();
        assert_eq!(t.settings.inactivity_timeout_secs, 120);
        assert_eq!(
            t.actions,
            vec![Invalidation::ClearSession, Invalidation::ClearFolders]
        );
    }

    #[test]
    fn display_only_keys_have_no_effect_on_session() {
        let base = Settings::default();
        for (key, value) in [
            (ConfigKey::MfaEnabled, "true"),
            (ConfigKey::MaxResultItems, "3"),
            (ConfigKey::SessionPersistCommand, "cat"),
            (ConfigKey::FolderRefresh, "sync-only"),
        ] {
            let t = transition(&base, key, value).unwrap();
            assert!(t.actions.is_empty(), "{key} should not invalidate");
            assert_ne!(t.settings, base);
        }
    }

    #[test]
    fn same_value_is_a_no_op() {
        let old = Settings {
            account_id: "me@example.com".into(),
            ..Settings::default()
        };
        let t = transition(&old, ConfigKey::AccountId, "me@example.com").unwrap();
        assert!(t.actions.is_empty());
        assert_eq!(t.settings, old);
    }

    #[test]
    fn bad_values_are_config_errors() {
        let base = Settings::default();
        assert!(transition(&base, ConfigKey::MfaEnabled, "maybe").is_err());
        assert!(transition(&base, ConfigKey::InactivityTimeout, "-5").is_err());
        assert!(transition(&base, ConfigKey::FolderRefresh, "always").is_err());
    }

    #[test]
    fn empty_value_unsets_optional_fields() {
        let old = Settings {
            session_persist_command: Some("cat".into()),
            ..Settings::default()
        };
        let t = transition(&old, ConfigKey::SessionPersistCommand, "").unwrap();
        assert_eq!(t.settings.session_persist_command, None);
    }
}
