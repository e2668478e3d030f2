//! CLI module: Clap argument parser, credential prompt, output helpers,
//! and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;

use zeroize::Zeroizing;

use crate::config::{FolderRefresh, Settings, Transport};
use crate::errors::{Result, VaultError};
use crate::invoker::{Invoker, ProcessInvoker};
use crate::session::{AuthOutcome, SessionManager};
use crate::store::StoreKind;

/// Failed passphrase attempts before a command gives up.
const MAX_ATTEMPTS: usize = 3;

/// The session manager as the binary uses it: backend picked at runtime.
pub type Manager = SessionManager<Box<dyn Invoker>>;

/// VaultSearch CLI: search a password vault from the terminal.
#[derive(Parser)]
#[command(
    name = "vaultsearch",
    about = "Search and unlock your password vault from the terminal",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/vaultsearch/config.toml)
    #[arg(long, global = true, env = "VAULTSEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Reuse an existing session token instead of unlocking
    #[arg(long, global = true, env = "VAULTSEARCH_SESSION", hide_env_values = true)]
    pub session: Option<String>,

    /// More log output on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Show store, login and lock state
    Status,

    /// Log in to the configured account
    Login {
        /// Print only the session token (for `export VAULTSEARCH_SESSION=...`)
        #[arg(long)]
        raw: bool,
    },

    /// Unlock the vault with the master passphrase
    Unlock {
        /// Print only the session token (for `export VAULTSEARCH_SESSION=...`)
        #[arg(long)]
        raw: bool,
    },

    /// Lock the vault
    Lock,

    /// Log the account out
    Logout,

    /// Pull remote changes and refresh folders
    Sync,

    /// Search entries by name
    Search {
        /// Search text (at least 2 characters)
        query: String,
    },

    /// Show one entry's details
    Show {
        /// Entry id (as printed by `search`)
        id: String,

        /// Print secret values instead of masking them
        #[arg(long)]
        reveal: bool,

        /// Copy a field to the clipboard (username, password, uri, totp or a custom field)
        #[arg(long, value_name = "FIELD")]
        copy: Option<String>,
    },

    /// Interactive search loop that keeps the vault unlocked
    Shell,

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },
}

/// Config subcommands.
#[derive(clap::Subcommand)]
pub enum ConfigAction {
    /// Print the current configuration
    Show,

    /// Change one setting (e.g. `server-url`, `inactivity-timeout`)
    Set {
        /// Setting name in kebab-case
        key: String,
        /// New value; empty string unsets optional settings
        value: String,
    },
}

// ---------------------------------------------------------------------------
// Credential prompt
// ---------------------------------------------------------------------------

/// What the user typed at the credential prompt.
pub struct Credentials {
    pub passphrase: Zeroizing<String>,
    pub mfa_code: Option<String>,
}

/// Asks the user for a passphrase and, when needed, a second factor.
///
/// An empty passphrase means the user cancelled.
pub trait CredentialPrompt {
    fn prompt_credentials(&self, login_mode: bool, mfa_required: bool) -> Result<Credentials>;
}

/// Terminal prompt built on `dialoguer`.
///
/// `VAULTSEARCH_PASSWORD` and `VAULTSEARCH_MFA_CODE` are used instead of
/// prompting when set (scripts and CI).
pub struct TerminalPrompt;

impl CredentialPrompt for TerminalPrompt {
    fn prompt_credentials(&self, login_mode: bool, mfa_required: bool) -> Result<Credentials> {
        let passphrase = match std::env::var("VAULTSEARCH_PASSWORD") {
            Ok(pw) if !pw.is_empty() => Zeroizing::new(pw),
            _ => {
                let prompt = if login_mode {
                    "Master password (login)"
                } else {
                    "Master password"
                };
                let pw = dialoguer::Password::new()
                    .with_prompt(prompt)
                    .allow_empty_password(true)
                    .interact()
                    .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;
                Zeroizing::new(pw)
            }
        };

        if passphrase.is_empty() {
            return Err(VaultError::UserCancelled);
        }

        let mfa_code = if login_mode && mfa_required {
            match std::env::var("VAULTSEARCH_MFA_CODE") {
                Ok(code) if !code.is_empty() => Some(code),
                _ => {
                    let code: String = dialoguer::Input::new()
                        .with_prompt("Two-step login code")
                        .allow_empty(true)
                        .interact_text()
                        .map_err(|e| VaultError::CommandFailed(format!("code prompt: {e}")))?;
                    Some(code.trim().to_string()).filter(|c| !c.is_empty())
                }
            }
        } else {
            None
        };

        Ok(Credentials {
            passphrase,
            mfa_code,
        })
    }
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Path of the config file from `--config` or the default location.
pub fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Settings::default_path(),
    }
}

/// Load settings for this invocation.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    Settings::load(&config_path(cli)?)
}

/// Build a session manager for `settings`, adopting a token from
/// `--session` / `VAULTSEARCH_SESSION` (or `BW_SESSION` for Bitwarden).
pub fn build_manager(cli: &Cli, settings: Settings) -> Result<Manager> {
    let invoker: Box<dyn Invoker> = match settings.transport {
        Transport::Process => {
            let mut invoker = ProcessInvoker::new(settings.binary());
            if settings.store == StoreKind::Bitwarden {
                invoker = invoker.with_env("BW_NOINTERACTION", "true");
            }
            Box::new(invoker)
        }
        Transport::Http => http_invoker(&settings)?,
    };

    let token = cli.session.clone().or_else(|| match settings.store {
        StoreKind::Bitwarden => std::env::var("BW_SESSION").ok(),
        StoreKind::Keepassxc => None,
    });

    let mut manager = SessionManager::new(settings, invoker);
    if let Some(token) = token.filter(|_| !manager.store().session_via_stdin()) {
        manager.adopt_token(&token);
    }
    Ok(manager)
}

#[cfg(feature = "http-service")]
fn http_invoker(settings: &Settings) -> Result<Box<dyn Invoker>> {
    if settings.store != StoreKind::Bitwarden {
        return Err(VaultError::ConfigError(
            "transport = \"http\" is only available for store = \"bitwarden\"".into(),
        ));
    }
    Ok(Box::new(crate::invoker::HttpInvoker::new(
        settings.service_url.as_str(),
    )))
}

#[cfg(not(feature = "http-service"))]
fn http_invoker(_settings: &Settings) -> Result<Box<dyn Invoker>> {
    Err(VaultError::ConfigError(
        "transport = \"http\" needs a build with the `http-service` feature".into(),
    ))
}

/// Prompt until the vault is unlocked, the user cancels, or too many
/// attempts fail.
pub fn ensure_unlocked<I: Invoker>(
    manager: &mut SessionManager<I>,
    prompt: &dyn CredentialPrompt,
) -> Result<()> {
    let mut failures = 0;

    loop {
        let login_mode = manager.needs_login()?;
        let unlock_needed = login_mode
            || match manager.needs_unlock() {
                Ok(needed) => needed,
                Err(e) if e.is_locked() => true,
                Err(e) => return Err(e),
            };
        if !unlock_needed {
            return Ok(());
        }

        let mfa = login_mode && (manager.settings().mfa_enabled || manager.mfa_required());
        let creds = prompt.prompt_credentials(login_mode, mfa)?;

        let outcome = if login_mode {
            manager.login(&creds.passphrase, creds.mfa_code.as_deref())?
        } else {
            manager.unlock(&creds.passphrase)?
        };

        match outcome {
            AuthOutcome::Unlocked { persist_error } => {
                if let Some(e) = persist_error {
                    output::warning(&format!("Session was not persisted: {e}"));
                }
                return Ok(());
            }
            AuthOutcome::MfaRequired { .. } => {
                output::info("A two-step login code is required.");
            }
            AuthOutcome::Rejected { message } => output::error(&message),
        }

        failures += 1;
        if failures >= MAX_ATTEMPTS {
            return Err(VaultError::CommandFailed(format!(
                "giving up after {MAX_ATTEMPTS} failed attempts"
            )));
        }
    }
}

/// Fill the folder cache for a session adopted from the environment.
pub fn warm_folders<I: Invoker>(manager: &mut SessionManager<I>) {
    if manager.settings().folder_refresh == FolderRefresh::OnUnlock && manager.folders().is_empty() {
        if let Err(e) = manager.refresh_folders() {
            tracing::debug!(error = %e, "folder refresh skipped");
        }
    }
}
