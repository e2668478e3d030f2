use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};
use crate::store::StoreKind;

/// How the credential store is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Spawn the store's CLI once per call.
    #[default]
    Process,
    /// Talk to a running `bw serve` on `service_url`.
    Http,
}

/// When the folder cache is rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FolderRefresh {
    /// After every successful login, unlock and sync.
    #[default]
    OnUnlock,
    /// Only after an explicit sync.
    SyncOnly,
}

/// User configuration, loaded from `~/.config/vaultsearch/config.toml`.
///
/// Every field has a default so VaultSearch runs against a stock `bw`
/// install without any config file at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Which credential store to drive.
    #[serde(default)]
    pub store: StoreKind,

    #[serde(default)]
    pub transport: Transport,

    /// Override for the store binary (default: `bw` / `keepassxc-cli`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,

    /// Base URL of the local vault service (`transport = "http"`).
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// Database file (`store = "keepassxc"`). A leading `~/` is expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,

    /// Self-hosted server address; empty means the store's default.
    #[serde(default)]
    pub server_url: String,

    /// Account e-mail used for login.
    #[serde(default)]
    pub account_id: String,

    #[serde(default)]
    pub mfa_enabled: bool,

    /// Maximum number of search results shown.
    #[serde(default = "default_max_result_items")]
    pub max_result_items: usize,

    /// Idle seconds before the session is dropped (0 = never).
    #[serde(default)]
    pub inactivity_timeout_secs: u64,

    /// Shell command that receives the session token on stdin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_persist_command: Option<String>,

    #[serde(default)]
    pub folder_refresh: FolderRefresh,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_service_url() -> String {
    "http://localhost:8087".to_string()
}

fn default_max_result_items() -> usize {
    10
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreKind::default(),
            transport: Transport::default(),
            binary: None,
            service_url: default_service_url(),
            database_path: None,
            server_url: String::new(),
            account_id: String::new(),
            mfa_enabled: false,
            max_result_items: default_max_result_items(),
            inactivity_timeout_secs: 0,
            session_persist_command: None,
            folder_refresh: FolderRefresh::default(),
        }
    }
}

impl Settings {
    /// Directory (under `$HOME`) and file name of the config file.
    const DIR: &'static str = ".config/vaultsearch";
    const FILE_NAME: &'static str = "config.toml";

    /// `$HOME/.config/vaultsearch/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let home = std::env::var_os("HOME")
            .ok_or_else(|| VaultError::ConfigError("HOME is not set".into()))?;
        Ok(PathBuf::from(home).join(Self::DIR).join(Self::FILE_NAME))
    }

    /// Load settings from `path`.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", path.display()))
        })?;

        Ok(settings)
    }

    /// Write settings to `path`, creating parent directories.
    ///
    /// The file is written next to its final location and renamed into
    /// place, so a crash never leaves a half-written config behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| VaultError::SerializationError(format!("config: {e}")))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Binary to execute for the configured store.
    pub fn binary(&self) -> &str {
        self.binary
            .as_deref()
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| self.store.default_binary())
    }

    /// Database path with `~/` expanded against `$HOME`.
    pub fn database_path(&self) -> Option<PathBuf> {
        let raw = self.database_path.as_deref().filter(|p| !p.is_empty())?;
        match (raw.strip_prefix("~/"), std::env::var_os("HOME")) {
            (Some(rest), Some(home)) => Some(PathBuf::from(home).join(rest)),
            _ => Some(PathBuf::from(raw)),
        }
    }

    /// Configured inactivity timeout, `None` when disabled.
    pub fn inactivity_timeout(&self) -> Option<Duration> {
        let secs = i64::try_from(self.inactivity_timeout_secs).ok()?;
        (secs > 0).then(|| Duration::seconds(secs))
    }
}

// ── Tests ────────────────────────────────────────────────────────────
